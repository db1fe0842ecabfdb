//! JSON marker records, the shape a renderer's marker call takes.

use kinmark_kinematics::Marker;
use kinmark_math::quat_to_wxyz;
use kinmark_model::GeomKind;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerRecord {
    pub kind: GeomKind,
    /// Engine geometry type code.
    #[serde(rename = "type")]
    pub type_code: i32,
    pub data_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<[f64; 3]>,
    pub pos: [f64; 3],
    /// Scalar-first.
    pub quat: [f64; 4],
    /// Row-major rotation matrix.
    pub mat: [[f64; 3]; 3],
    pub rgba: [f32; 4],
    pub label: String,
}

impl From<&Marker> for MarkerRecord {
    fn from(marker: &Marker) -> Self {
        let m = marker.rotation_matrix();
        let p = marker.pose.position;
        Self {
            kind: marker.kind,
            type_code: marker.kind.native_code(),
            data_id: marker.data_id(),
            size: marker.size().map(|s| [s.x, s.y, s.z]),
            pos: [p.x, p.y, p.z],
            quat: quat_to_wxyz(&marker.pose.orientation),
            mat: [
                [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
                [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
                [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
            ],
            rgba: marker.rgba,
            label: marker.label.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinmark_kinematics::{ShapeDescriptor, DEFAULT_RGBA};
    use kinmark_math::{quat_from_wxyz, Pose, Vec3};

    fn marker(kind: GeomKind, shape: ShapeDescriptor) -> Marker {
        Marker {
            kind,
            pose: Pose::new(
                Vec3::new(1.0, 2.0, 3.0),
                quat_from_wxyz([0.7071067811865476, 0.0, 0.0, 0.7071067811865476]),
            ),
            shape,
            rgba: DEFAULT_RGBA,
            label: "hand".to_string(),
        }
    }

    #[test]
    fn test_primitive_record() {
        let record = MarkerRecord::from(&marker(
            GeomKind::Cylinder,
            ShapeDescriptor::Primitive {
                size: Vec3::new(0.02, 0.02, 0.1),
            },
        ));
        assert_eq!(record.type_code, 5);
        assert_eq!(record.data_id, -1);
        assert_eq!(record.size, Some([0.02, 0.02, 0.1]));
        assert_eq!(record.pos, [1.0, 2.0, 3.0]);
        // 90 degrees about z: first row is (0, -1, 0).
        assert!((record.mat[0][1] + 1.0).abs() < 1e-12);
        assert!(record.mat[0][0].abs() < 1e-12);
        assert!((record.mat[2][2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mesh_record_json() {
        let record = MarkerRecord::from(&marker(GeomKind::Mesh, ShapeDescriptor::Mesh { data_id: 6 }));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], 7);
        assert_eq!(json["kind"], "mesh");
        assert_eq!(json["data_id"], 6);
        assert!(json.get("size").is_none());
        assert_eq!(json["label"], "hand");
    }
}
