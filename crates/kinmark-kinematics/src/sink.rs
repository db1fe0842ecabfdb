//! Marker sinks.

use crate::marker::Marker;

/// Receiver for emitted markers.
///
/// Sinks accumulate. Clearing between frames is the caller's job; the
/// projector only ever adds.
pub trait MarkerSink {
    /// Accept one marker.
    fn add_marker(&mut self, marker: Marker);
}

impl MarkerSink for Vec<Marker> {
    fn add_marker(&mut self, marker: Marker) {
        self.push(marker);
    }
}

/// Per-frame marker accumulator.
#[derive(Debug, Clone, Default)]
pub struct MarkerBuffer {
    markers: Vec<Marker>,
}

impl MarkerBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Markers added since the last clear, in emission order.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Number of buffered markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Drop every buffered marker.
    pub fn clear(&mut self) {
        self.markers.clear();
    }

    /// Take every buffered marker, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<Marker> {
        std::mem::take(&mut self.markers)
    }
}

impl MarkerSink for MarkerBuffer {
    fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }
}
