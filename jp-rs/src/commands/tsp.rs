//! TSP level geometry command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use jp_tsp::{TspLevel, TspSectionKind, parse_tsp};

use crate::utils::{add_table_row, create_table, format_bytes};

const SECTIONS: [TspSectionKind; 6] = [
    TspSectionKind::Nodes,
    TspSectionKind::Faces,
    TspSectionKind::Vertices,
    TspSectionKind::DynamicBlocks,
    TspSectionKind::Colors,
    TspSectionKind::Collision,
];

#[derive(Subcommand)]
pub enum TspCommands {
    /// Display header, node tree and collision information
    Info {
        /// Path to the TSP file
        file: PathBuf,

        /// Position of the TSP block inside the file
        #[arg(long, default_value = "0")]
        offset: u64,
    },

    /// Query the floor height under a point
    Height {
        /// Path to the TSP file
        file: PathBuf,

        /// X coordinate
        #[arg(allow_negative_numbers = true)]
        x: i32,

        /// Z coordinate
        #[arg(allow_negative_numbers = true)]
        z: i32,

        /// Position of the TSP block inside the file
        #[arg(long, default_value = "0")]
        offset: u64,
    },

    /// Export the decoded level as JSON
    #[cfg(feature = "serde")]
    Export {
        /// Path to the TSP file
        file: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Position of the TSP block inside the file
        #[arg(long, default_value = "0")]
        offset: u64,
    },
}

pub fn execute(command: TspCommands) -> Result<()> {
    match command {
        TspCommands::Info { file, offset } => execute_info(&file, offset),
        TspCommands::Height { file, x, z, offset } => execute_height(&file, offset, x, z),
        #[cfg(feature = "serde")]
        TspCommands::Export {
            file,
            output,
            offset,
        } => execute_export(&file, offset, output.as_deref()),
    }
}

fn load(path: &Path, offset: u64) -> Result<TspLevel> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    parse_tsp(&mut reader, offset)
        .with_context(|| format!("Failed to parse TSP level: {}", path.display()))
}

fn execute_info(path: &Path, offset: u64) -> Result<()> {
    let level = load(path, offset)?;
    let size = std::fs::metadata(path)?.len();

    println!("\n{}", style("TSP Level Information").bold().underlined());
    println!("File: {}", style(path.display()).cyan());
    println!("Size: {}", format_bytes(size));
    println!(
        "Id: {}  Version: {}",
        style(level.header.id).yellow(),
        style(level.header.version).yellow()
    );
    println!(
        "Nodes: {} ({} leaves, {} leaf faces)",
        style(level.nodes.len()).green(),
        level.leaf_count(),
        level.leaf_face_count()
    );
    println!("Faces: {}", style(level.faces.len()).green());
    println!("Vertices: {}", style(level.vertices.len()).green());
    println!("Colors: {}", style(level.colors.len()).green());

    println!("\n{}", style("Sections").bold());
    let mut table = create_table(&["Section", "Count", "Offset"]);
    for kind in SECTIONS {
        let section = level.header.section(kind);
        add_table_row(
            &mut table,
            [
                kind.name().to_string(),
                section.count.to_string(),
                section.offset.to_string(),
            ],
        );
    }
    table.printstd();

    if !level.dynamic_blocks.is_empty() {
        println!("\n{}", style("Dynamic Blocks").bold());
        let mut table = create_table(&["Index", "Effect", "Faces", "Rows"]);
        for block in &level.dynamic_blocks {
            add_table_row(
                &mut table,
                [
                    block.dynamic_data_index.to_string(),
                    format!("{:?}", block.effect),
                    block.face_indices.len().to_string(),
                    block.table_size.to_string(),
                ],
            );
        }
        table.printstd();
    }

    match &level.collision {
        Some(collision) => {
            let header = &collision.header;
            println!("\n{}", style("Collision").bold());
            println!(
                "Bounds: x {}..{}  z {}..{}",
                header.min_x, header.max_x, header.min_z, header.max_z
            );
            println!(
                "KD Nodes: {}  Faces: {}  Vertices: {}  Normals: {}",
                collision.kd_nodes.len(),
                collision.faces.len(),
                collision.vertices.len(),
                collision.normals.len()
            );
        }
        None => println!("\nCollision: {}", style("none").dim()),
    }
    Ok(())
}

fn execute_height(path: &Path, offset: u64, x: i32, z: i32) -> Result<()> {
    let level = load(path, offset)?;
    match level.height_at(x, z) {
        Some(hit) => println!(
            "Height at ({x}, {z}): {} (property set {})",
            style(hit.y).green(),
            hit.property_set_file_index
        ),
        None => println!("Height at ({x}, {z}): {}", style("no floor").yellow()),
    }
    Ok(())
}

#[cfg(feature = "serde")]
fn execute_export(path: &Path, offset: u64, output: Option<&Path>) -> Result<()> {
    let level = load(path, offset)?;
    let json = serde_json::to_string_pretty(&level).context("Failed to serialize level")?;
    match output {
        Some(out) => std::fs::write(out, json)
            .with_context(|| format!("Failed to write {}", out.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
