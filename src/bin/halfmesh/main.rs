//! halfmesh CLI - mesh inspection and remeshing.
//!
//! Usage: halfmesh <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `halfmesh --help` for available commands. Set `RUST_LOG=debug` for
//! per-stage statistics.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::info;

use halfmesh::algo::remesh::{
    adaptive_remeshing_with_progress, uniform_remeshing_with_progress, AdaptiveRemeshOptions,
    UniformRemeshOptions,
};
use halfmesh::algo::Progress;
use halfmesh::io;
use halfmesh::mesh::HalfEdgeMesh;

#[derive(Parser)]
#[command(name = "halfmesh")]
#[command(author, version, about = "Half-edge mesh repair and remeshing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information and the repairs made while loading
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Remesh a triangle mesh
    Remesh {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Target edge length for uniform remeshing (default: mean edge length)
        #[arg(short = 'l', long, conflicts_with = "adaptive")]
        target_length: Option<f64>,

        /// Adapt edge lengths to curvature
        #[arg(long)]
        adaptive: bool,

        /// Shortest edge length for adaptive remeshing (default: 0.1 x mean edge length)
        #[arg(long, requires = "adaptive")]
        min: Option<f64>,

        /// Longest edge length for adaptive remeshing (default: 5 x mean edge length)
        #[arg(long, requires = "adaptive")]
        max: Option<f64>,

        /// Approximation error for adaptive remeshing (default: 0.01 x mean edge length)
        #[arg(long, requires = "adaptive")]
        error: Option<f64>,

        /// Number of iterations
        #[arg(short, long, default_value = "10")]
        iterations: usize,

        /// Do not project vertices back onto the input surface
        #[arg(long)]
        no_projection: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input } => {
            cmd_info(&input)?;
        }

        Commands::Remesh {
            input,
            output,
            target_length,
            adaptive,
            min,
            max,
            error,
            iterations,
            no_projection,
        } => {
            let sizing = if adaptive {
                Sizing::Adaptive { min, max, error }
            } else {
                Sizing::Uniform { target_length }
            };
            cmd_remesh(&input, &output, sizing, iterations, !no_projection)?;
        }
    }

    Ok(())
}

enum Sizing {
    Uniform {
        target_length: Option<f64>,
    },
    Adaptive {
        min: Option<f64>,
        max: Option<f64>,
        error: Option<f64>,
    },
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // only ever move forward
        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        if raw_percent <= previous && raw_percent != 100 {
            return;
        }

        let bar_width = 30;
        let filled = (raw_percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {}", bar, space, raw_percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn load(input: &Path) -> Result<HalfEdgeMesh, Box<dyn std::error::Error>> {
    let (mesh, report) = io::load(input)?;
    if report.is_clean() {
        info!("loaded {}: {} vertices, {} faces", input.display(), mesh.num_vertices(), mesh.num_faces());
    } else {
        info!("loaded {} with repairs:\n{}", input.display(), report);
    }
    Ok(mesh)
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (mesh, report) = io::load(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Edges: {}", mesh.num_edges());
    println!("Faces: {}", mesh.num_faces());
    println!("Half-edges: {}", mesh.num_halfedges());

    let euler = mesh.num_vertices() as i64 - mesh.num_edges() as i64 + mesh.num_faces() as i64;
    println!("Euler characteristic: {}", euler);
    println!("Surface area: {:.6}", mesh.surface_area());
    println!("Mean edge length: {:.6}", mesh.mean_edge_length());

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }

    if mesh.is_triangle_mesh() {
        println!("Mesh type: Triangle mesh");
    } else {
        println!("Mesh type: Polygon mesh");
    }

    let loops = mesh.boundary_loops();
    if loops.is_empty() {
        println!("Topology: Closed (no boundary)");
    } else {
        let lengths: Vec<usize> = loops.iter().map(|l| l.len()).collect();
        println!("Topology: Open ({} boundary loops, lengths {:?})", loops.len(), lengths);
    }

    let non_manifold = mesh.vertex_ids().filter(|&v| !mesh.is_manifold(v)).count();
    println!("Non-manifold vertices: {}", non_manifold);
    println!("Connectivity valid: {}", mesh.is_valid());

    println!("\nBuild report:");
    println!("{}", report);

    Ok(())
}

fn cmd_remesh(
    input: &Path,
    output: &Path,
    sizing: Sizing,
    iterations: usize,
    use_projection: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = load(input)?;
    let mean = mesh.mean_edge_length();
    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());
    println!("Mean edge length: {:.6}", mean);

    let progress = create_progress();
    let start = Instant::now();
    let stats = match sizing {
        Sizing::Uniform { target_length } => {
            let target = target_length.unwrap_or(mean);
            println!("Uniform remeshing to {:.6} ({} iterations)...", target, iterations);
            let options = UniformRemeshOptions::with_target_length(target)
                .with_iterations(iterations)
                .with_projection(use_projection);
            uniform_remeshing_with_progress(&mut mesh, &options, &progress)?
        }
        Sizing::Adaptive { min, max, error } => {
            let min = min.unwrap_or(0.1 * mean);
            let max = max.unwrap_or(5.0 * mean);
            let error = error.unwrap_or(0.01 * mean);
            println!(
                "Adaptive remeshing in [{:.6}, {:.6}], error {:.6} ({} iterations)...",
                min, max, error, iterations
            );
            let options = AdaptiveRemeshOptions::new(min, max, error)
                .with_iterations(iterations)
                .with_projection(use_projection);
            adaptive_remeshing_with_progress(&mut mesh, &options, &progress)?
        }
    };
    let elapsed = start.elapsed();

    println!(
        "Result: {} vertices, {} faces ({} splits, {} collapses, {} flips, {} caps removed)",
        stats.vertices, stats.faces, stats.splits, stats.collapses, stats.flips, stats.caps_removed
    );
    io::save(&mesh, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}
