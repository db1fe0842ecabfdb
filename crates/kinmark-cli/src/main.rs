//! kinmark CLI - project what-if overlays of a kinematic model as markers
//!
//! Loads a model snapshot, applies override poses from an overlay file or
//! from flags, and prints the resulting markers as JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kinmark_kinematics::{
    KinematicTree, Marker, MarkerBuffer, MarkerSink, NamedRequest, QuatOrder, SlideCompensation,
    SubtreeProjector,
};
use kinmark_model::Model;
use tracing::{debug, info};

mod config;
mod output;

use config::{Overlay, OverlayConfig};
use output::MarkerRecord;

#[derive(Parser)]
#[command(name = "kinmark")]
#[command(about = "Project override poses through a kinematic tree as debug markers", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the body tree of a model
    Info {
        /// Model JSON file
        model: PathBuf,
    },
    /// Project overlays and print the markers as JSON
    Project(ProjectArgs),
}

#[derive(Args)]
struct ProjectArgs {
    /// Model JSON file
    model: PathBuf,

    /// Overlay TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target body name
    #[arg(long, conflicts_with = "geom")]
    body: Option<String>,

    /// Target geom name
    #[arg(long)]
    geom: Option<String>,

    /// Root body name for upward propagation
    #[arg(long)]
    root: Option<String>,

    /// Override position x,y,z
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pos: Option<Vec<f64>>,

    /// Override quaternion, w,x,y,z (or x,y,z,w with --xyzw)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    quat: Option<Vec<f64>>,

    /// Read --quat as scalar-last
    #[arg(long)]
    xyzw: bool,

    /// Slide joint value, name=value (repeatable)
    #[arg(long = "joint", value_parser = parse_joint_value)]
    joints: Vec<(String, f64)>,

    /// Label for the inline overlay
    #[arg(long)]
    label: Option<String>,

    /// Subtract slide displacement on the way up as well
    #[arg(long)]
    symmetric: bool,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Info { model } => show_info(&model),
        Commands::Project(args) => project(&args),
    }
}

fn load_model(path: &Path) -> Result<Model> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading model {}", path.display()))?;
    let model =
        Model::from_json(&json).with_context(|| format!("loading model {}", path.display()))?;
    debug!(
        bodies = model.bodies.len(),
        geoms = model.geoms.len(),
        joints = model.joints.len(),
        "loaded model"
    );
    Ok(model)
}

fn show_info(path: &Path) -> Result<()> {
    let model = load_model(path)?;
    let tree = KinematicTree::from_model(&model)?;

    println!("kinmark model: {}", path.display());
    println!("  Version: {}", model.version);
    println!("  Bodies: {}", model.bodies.len());
    println!("  Geoms: {}", model.geoms.len());
    println!("  Joints: {}", model.joints.len());

    let roots = (0..tree.body_count()).filter(|&b| tree.parent_of(b).is_none());
    println!("\nTree:");
    for root in roots {
        for body in tree.breadth_first(root) {
            let depth = tree.depth(body).unwrap_or(0);
            let joints: Vec<String> = model.bodies[body]
                .joints
                .iter()
                .filter_map(|&j| model.joints.get(j))
                .map(|j| format!("{:?} {}", j.kind, j.name.as_deref().unwrap_or("unnamed")))
                .collect();
            println!(
                "  {}{} ({} geoms){}",
                "  ".repeat(depth),
                model.body_label(body),
                tree.geoms_of(body).len(),
                if joints.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", joints.join(", "))
                }
            );
        }
    }

    Ok(())
}

fn project(args: &ProjectArgs) -> Result<()> {
    let model = load_model(&args.model)?;
    let tree = KinematicTree::from_model(&model)?;

    let mut config = match &args.config {
        Some(path) => OverlayConfig::load(path)?,
        None => OverlayConfig::default(),
    };
    if args.symmetric {
        config.style.slide_compensation = SlideCompensation::Symmetric;
    }
    if let Some(overlay) = inline_overlay(args)? {
        config.overlays.push(overlay);
    }
    if config.overlays.is_empty() {
        anyhow::bail!("Nothing to project: pass --config or --body/--geom with --pos");
    }

    let markers = project_overlays(&model, &tree, &config)?;
    let records: Vec<MarkerRecord> = markers.iter().map(MarkerRecord::from).collect();
    let json = serde_json::to_string_pretty(&records)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json)?;
            println!("Wrote {} markers to {}", records.len(), path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Project every overlay in `config`, styled, in file order.
fn project_overlays(
    model: &Model,
    tree: &KinematicTree,
    config: &OverlayConfig,
) -> Result<Vec<Marker>> {
    let projector = SubtreeProjector::new(model, tree)?
        .with_slide_compensation(config.style.slide_compensation);

    let mut buffer = MarkerBuffer::new();
    for (i, overlay) in config.overlays.iter().enumerate() {
        let request = overlay
            .request
            .resolve(model)
            .with_context(|| format!("overlay {i}"))?;
        let mut styled = Styled {
            sink: &mut buffer,
            rgba: overlay.rgba(&config.style),
            label: overlay.label(),
        };
        let count = projector
            .project_into(&request, &mut styled)
            .with_context(|| format!("overlay {i}"))?;
        info!(overlay = i, markers = count, "projected overlay");
    }
    Ok(buffer.take())
}

/// Applies one overlay's color and label on the way into `sink`.
struct Styled<'a, S> {
    sink: &'a mut S,
    rgba: [f32; 4],
    label: &'a str,
}

impl<S: MarkerSink> MarkerSink for Styled<'_, S> {
    fn add_marker(&mut self, marker: Marker) {
        self.sink
            .add_marker(marker.with_rgba(self.rgba).with_label(self.label));
    }
}

/// Overlay built from inline flags, if a target was given.
fn inline_overlay(args: &ProjectArgs) -> Result<Option<Overlay>> {
    if args.body.is_none() && args.geom.is_none() {
        return Ok(None);
    }

    let position = match args.pos.as_deref() {
        Some(&[x, y, z]) => [x, y, z],
        Some(other) => anyhow::bail!("--pos takes 3 values, got {}", other.len()),
        None => anyhow::bail!("--pos is required with --body/--geom"),
    };
    let quat_order = if args.xyzw {
        QuatOrder::Xyzw
    } else {
        QuatOrder::Wxyz
    };
    let quat = match args.quat.as_deref() {
        Some(&[a, b, c, d]) => Some([a, b, c, d]),
        Some(other) => anyhow::bail!("--quat takes 4 values, got {}", other.len()),
        None => None,
    };
    let joint_values = if args.joints.is_empty() {
        None
    } else {
        Some(args.joints.iter().cloned().collect::<BTreeMap<_, _>>())
    };

    Ok(Some(Overlay {
        request: NamedRequest {
            target_body: args.body.clone(),
            target_geom: args.geom.clone(),
            root_body: args.root.clone(),
            position,
            quat,
            quat_order,
            joint_values,
        },
        rgba: None,
        label: args.label.clone(),
    }))
}

fn parse_joint_value(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{s}`"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad value for joint `{name}`: {e}"))?;
    Ok((name.trim().to_string(), value))
}
