//! PLCFlow command-line front end.
//!
//! Inspects, normalizes and lists PLC flowchart project files without a GUI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kurbo::Point;
use plcflow_core::catalog::{BLOCK_CONFIG_FILE, BlockCatalog};
use plcflow_core::port::PortName;
use plcflow_core::storage::{FileStorage, ProjectSession, load_from_path, save_to_path};
use plcflow_core::{Canvas, CanvasConfig, PortRole, TagLookup, TagRegistry};

#[derive(Parser)]
#[command(name = "plcflow", version, about = "PLC flowchart project tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a project file: blocks, port roles, wires and tags
    Inspect {
        /// Project file (.plc)
        file: PathBuf,
        /// Also print the tag configuration as JSON
        #[arg(long)]
        tags: bool,
    },
    /// Load a project and write it back in canonical form
    Normalize {
        /// Project file (.plc)
        file: PathBuf,
        /// Output file (default: overwrite the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the routed path between two points as SVG path data
    Route { x1: f64, y1: f64, x2: f64, y2: f64 },
    /// List the block palette and default sizes
    Palette {
        /// Block configuration file (default: block_config.json in the user data directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List projects in a storage directory
    List {
        /// Project directory (default: the user data directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    log::info!("Starting plcflow {}", env!("CARGO_PKG_VERSION"));

    match Cli::parse().command {
        Commands::Inspect { file, tags } => inspect(&file, tags),
        Commands::Normalize { file, output } => normalize(&file, output.as_deref()).map(|_| ()),
        Commands::Route { x1, y1, x2, y2 } => {
            println!("{}", plcflow_core::route(Point::new(x1, y1), Point::new(x2, y2)).to_svg());
            Ok(())
        }
        Commands::Palette { config } => palette(config),
        Commands::List { dir } => list(dir),
    }
}

fn role_summary(canvas: &Canvas, id: plcflow_core::BlockId) -> String {
    let Some(block) = canvas.block(id) else {
        return String::new();
    };
    PortName::ALL
        .iter()
        .filter_map(|&name| match block.ports().role(name) {
            PortRole::Input => Some(format!("{name}=in")),
            PortRole::Output => Some(format!("{name}=out")),
            PortRole::Unassigned => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn inspect(file: &Path, show_tags: bool) -> Result<()> {
    let mut canvas = Canvas::default();
    let mut tags = TagRegistry::new();
    let report = load_from_path(file, &mut canvas, &mut tags)
        .with_context(|| format!("Failed to load {}", file.display()))?;

    let grid = canvas.grid();
    println!("{}", file.display());
    println!("  grid: {} x {} cells of {}", grid.cols(), grid.rows(), grid.cell_size());
    println!("  blocks: {}", canvas.block_count());
    for block in canvas.blocks() {
        let position = block.position();
        let cell = grid.cell_name(position).unwrap_or_else(|| "-".to_string());
        println!(
            "    {:<16} {:>7.1},{:<7.1} [{cell}] {}",
            block.text,
            position.x,
            position.y,
            role_summary(&canvas, block.id())
        );
    }
    println!("  wires: {}", canvas.wire_count());
    for wire in canvas.wires() {
        let (from, to) = (wire.source(), wire.target());
        let name = |id| canvas.block(id).map(|b| b.text.as_str()).unwrap_or("?");
        println!("    {}.{} -> {}.{}", name(from.block), from.port, name(to.block), to.port);
    }
    println!("  tags: {} ({} bytes)", tags.len(), tags.memory_usage());
    for line in tag_lines(&tags) {
        println!("    {line}");
    }

    if !report.is_clean() {
        println!("  skipped: {}", report.skipped());
        for warning in &report.warnings {
            println!("    {warning}");
        }
    }

    if show_tags {
        println!("{}", serde_json::to_string_pretty(&tags.to_value())?);
    }
    Ok(())
}

fn tag_lines(tags: &dyn TagLookup) -> Vec<String> {
    tags.tag_names()
        .into_iter()
        .filter_map(|name| tags.tag(name))
        .map(|tag| format!("{:<16} {}", tag.name, tag.data_type))
        .collect()
}

/// Rewrite a project in canonical form. Returns the path written.
fn normalize(file: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let mut canvas = Canvas::new(CanvasConfig::default(), BlockCatalog::builtin());
    let mut tags = TagRegistry::new();
    let report = load_from_path(file, &mut canvas, &mut tags)
        .with_context(|| format!("Failed to load {}", file.display()))?;

    let target = output.unwrap_or(file);
    save_to_path(target, &canvas, &tags).with_context(|| format!("Failed to write {}", target.display()))?;

    println!(
        "Wrote {} blocks, {} wires to {}",
        canvas.block_count(),
        canvas.wire_count(),
        target.display()
    );
    if report.skipped() > 0 {
        println!("Dropped {} invalid records", report.skipped());
    }
    Ok(target.to_path_buf())
}

fn palette(config: Option<PathBuf>) -> Result<()> {
    let catalog = match config {
        Some(path) => BlockCatalog::load(&path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => match BlockCatalog::default_path() {
            Some(path) => BlockCatalog::load_or_builtin(path),
            None => BlockCatalog::builtin(),
        },
    };
    match catalog.source() {
        Some(path) if path.exists() => println!("Block types from {}", path.display()),
        _ => println!("Built-in block types ({BLOCK_CONFIG_FILE} not found)"),
    }
    for (name, size) in catalog.entries() {
        println!("  {name:<16} {:>5} x {:<5}", size.width, size.height);
    }
    Ok(())
}

fn list(dir: Option<PathBuf>) -> Result<()> {
    let storage = match dir {
        Some(dir) => FileStorage::new(dir)?,
        None => FileStorage::default_location()?,
    };
    let session = ProjectSession::new(Arc::new(storage));
    let ids = pollster::block_on(session.list_projects())?;
    if ids.is_empty() {
        println!("No projects in {}", session.storage().base_path().display());
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}
