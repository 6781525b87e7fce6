//! BSD scene descriptor command implementations

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use console::style;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use jp_bsd::{
    BoneTree, BsdLoader, Catalog, LoadReport, PoseOutcome, RecordLayout, RenderObject, SectionKind,
};

use crate::utils::{
    NodeType, TreeNode, TreeOptions, add_table_row, create_table, format_bytes, format_offset,
    format_point, render_tree,
};

/// Catalog layout selector on the command line
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LayoutArg {
    #[default]
    Standard,
    Extended,
}

impl From<LayoutArg> for RecordLayout {
    fn from(value: LayoutArg) -> Self {
        match value {
            LayoutArg::Standard => Self::Standard,
            LayoutArg::Extended => Self::Extended,
        }
    }
}

#[derive(Subcommand)]
pub enum BsdCommands {
    /// Display catalog and section information
    Info {
        /// Path to the BSD file
        file: PathBuf,

        /// Render object record layout
        #[arg(long, value_enum, default_value_t)]
        layout: LayoutArg,
    },

    /// List every render object with its geometry counts
    List {
        /// Path to the BSD file
        file: PathBuf,

        /// Render object record layout
        #[arg(long, value_enum, default_value_t)]
        layout: LayoutArg,
    },

    /// Show the structure of a BSD file as a tree
    Tree {
        /// Path to the BSD file
        file: PathBuf,

        /// Render object record layout
        #[arg(long, value_enum, default_value_t)]
        layout: LayoutArg,

        /// Maximum depth to display
        #[arg(long)]
        depth: Option<usize>,

        /// Hide referenced file names
        #[arg(long)]
        no_external_refs: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Show compact metadata inline
        #[arg(long)]
        compact: bool,
    },

    /// Pose an animated render object and print the result
    Pose {
        /// Path to the BSD file
        file: PathBuf,

        /// Render object id
        #[arg(long)]
        id: u32,

        /// Animation index
        #[arg(short, long, default_value = "0")]
        animation: usize,

        /// Frame index
        #[arg(short, long, default_value = "0")]
        frame: usize,

        /// Apply this frame first so the target pose blends from it
        #[arg(long)]
        from: Option<usize>,

        /// Print every posed vertex
        #[arg(long)]
        vertices: bool,

        /// Render object record layout
        #[arg(long, value_enum, default_value_t)]
        layout: LayoutArg,
    },

    /// Export decoded render objects as JSON
    #[cfg(feature = "serde")]
    Export {
        /// Path to the BSD file
        file: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Render object record layout
        #[arg(long, value_enum, default_value_t)]
        layout: LayoutArg,
    },
}

pub fn execute(command: BsdCommands) -> Result<()> {
    match command {
        BsdCommands::Info { file, layout } => execute_info(&file, layout.into()),
        BsdCommands::List { file, layout } => execute_list(&file, layout.into()),
        BsdCommands::Tree {
            file,
            layout,
            depth,
            no_external_refs,
            no_color,
            compact,
        } => execute_tree(
            &file,
            layout.into(),
            &TreeOptions {
                max_depth: depth,
                show_external_refs: !no_external_refs,
                no_color,
                show_metadata: true,
                compact,
            },
        ),
        BsdCommands::Pose {
            file,
            id,
            animation,
            frame,
            from,
            vertices,
            layout,
        } => execute_pose(&file, layout.into(), id, animation, frame, from, vertices),
        #[cfg(feature = "serde")]
        BsdCommands::Export {
            file,
            output,
            layout,
        } => execute_export(&file, layout.into(), output.as_deref()),
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn read_catalog(path: &Path, layout: RecordLayout) -> Result<Catalog> {
    BsdLoader::new()
        .with_layout(layout)
        .read_catalog(&mut open(path)?)
        .with_context(|| format!("Failed to read BSD catalog: {}", path.display()))
}

fn load(path: &Path, layout: RecordLayout) -> Result<LoadReport> {
    BsdLoader::new()
        .with_layout(layout)
        .load_all(&mut open(path)?)
        .with_context(|| format!("Failed to load BSD file: {}", path.display()))
}

fn execute_info(path: &Path, layout: RecordLayout) -> Result<()> {
    let catalog = read_catalog(path, layout)?;
    let size = std::fs::metadata(path)?.len();

    println!("\n{}", style("BSD File Information").bold().underlined());
    println!("File: {}", style(path.display()).cyan());
    println!("Size: {}", format_bytes(size));
    println!("Layout: {}", style(catalog.layout).yellow());
    println!("Render Objects: {}", style(catalog.len()).green());
    println!(
        "Animated Lights: {} ({} colour bytes)",
        style(catalog.lights.count).green(),
        catalog.lights.color_section_size()
    );
    let animated = catalog.records.iter().filter(|r| r.is_animated()).count();
    println!("Animated Objects: {}", style(animated).green());
    if let Some(world) = catalog.records.iter().find(|r| r.is_world()) {
        println!("World Level: {}", format_offset(world.tsp_offset));
    }

    println!("\n{}", style("Section Table").bold());
    let mut table = create_table(&["Section", "Offset", "Count"]);
    for kind in SectionKind::ALL {
        let entry = catalog.sections.entry(kind);
        add_table_row(
            &mut table,
            [
                kind.name().to_string(),
                entry.offset.to_string(),
                entry.count.to_string(),
            ],
        );
    }
    table.printstd();
    Ok(())
}

fn execute_list(path: &Path, layout: RecordLayout) -> Result<()> {
    let report = load(path, layout)?;

    let mut table = create_table(&[
        "Id", "Name", "Kind", "Vertices", "Faces", "Tables", "Bones", "Animations",
    ]);
    for object in &report.objects {
        let vertices = if object.is_animated() {
            object.vertex_tables.iter().map(|t| t.len()).sum::<usize>()
        } else {
            object.vertices.len()
        };
        add_table_row(
            &mut table,
            [
                object.id.to_string(),
                object.file_name.clone(),
                object_kind(object).to_string(),
                vertices.to_string(),
                object.face_count().to_string(),
                object.vertex_tables.len().to_string(),
                object.skeleton.as_ref().map_or(0, BoneTree::len).to_string(),
                object.animations.len().to_string(),
            ],
        );
    }
    table.printstd();

    if !report.failures.is_empty() {
        println!("\n{}", style("Failed Objects").bold().red());
        for failure in &report.failures {
            println!(
                "  #{} (id {}): {}",
                failure.index,
                failure.id,
                style(&failure.error).red()
            );
        }
    }
    println!(
        "\n{} loaded, {} failed",
        style(report.objects.len()).green(),
        style(report.failures.len()).red()
    );
    Ok(())
}

fn object_kind(object: &RenderObject) -> &'static str {
    if object.is_world() {
        "world"
    } else if object.is_animated() {
        "animated"
    } else {
        "static"
    }
}

fn execute_tree(path: &Path, layout: RecordLayout, options: &TreeOptions) -> Result<()> {
    let catalog = read_catalog(path, layout)?;
    let report = load(path, layout)?;
    let size = std::fs::metadata(path)?.len();

    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    let mut sections = TreeNode::new("Sections", NodeType::Table)
        .with_metadata("count", SectionKind::ALL.len());
    for kind in SectionKind::ALL {
        let entry = catalog.sections.entry(kind);
        sections = sections.add_child(
            TreeNode::new(kind.name(), NodeType::Header)
                .with_metadata("offset", entry.offset)
                .with_metadata("count", entry.count),
        );
    }

    let mut objects =
        TreeNode::new("Render Objects", NodeType::Table).with_metadata("count", catalog.len());
    for record in &catalog.records {
        let node = match report.objects.iter().find(|o| o.id == record.id) {
            Some(object) => object_tree(object),
            None => TreeNode::new(format!("Object {} (failed)", record.id), NodeType::Object)
                .with_metadata("id", record.id),
        };
        objects = objects.add_child(node.with_external_ref(&record.file_name));
    }

    let root = TreeNode::new(name, NodeType::Root)
        .with_size(size)
        .with_metadata("layout", catalog.layout)
        .add_child(sections)
        .add_child(objects);
    print!("{}", render_tree(&root, options));
    Ok(())
}

fn object_tree(object: &RenderObject) -> TreeNode {
    let mut node = TreeNode::new(format!("Object {}", object.id), NodeType::Object)
        .with_metadata("id", object.id)
        .with_metadata("kind", object_kind(object))
        .with_metadata("faces", object.face_count());

    if let Some(level) = &object.level {
        let mut level_node = TreeNode::new("Level", NodeType::Level)
            .with_metadata("nodes", level.nodes.len())
            .with_metadata("faces", level.faces.len())
            .with_metadata("dynamic blocks", level.dynamic_blocks.len());
        if let Some(collision) = &level.collision {
            level_node = level_node.add_child(
                TreeNode::new("Collision", NodeType::Header)
                    .with_metadata("count", collision.faces.len())
                    .with_metadata("kd nodes", collision.kd_nodes.len()),
            );
        }
        node = node.add_child(level_node);
    }

    if let Some(skeleton) = &object.skeleton
        && !skeleton.is_empty()
    {
        node = node.add_child(
            TreeNode::new("Skeleton", NodeType::Table)
                .with_metadata("count", skeleton.len())
                .with_metadata("depth", skeleton.depth())
                .add_child(bone_tree(skeleton, 0)),
        );
    }

    for (index, clip) in object.animations.iter().enumerate() {
        let mut clip_node = TreeNode::new(format!("Animation {index}"), NodeType::Animation)
            .with_metadata("count", clip.frames.len());
        let unresolved = clip.unresolved_frames();
        if unresolved > 0 {
            clip_node = clip_node.with_metadata("unresolved", unresolved);
        }
        node = node.add_child(clip_node);
    }
    node
}

fn bone_tree(skeleton: &BoneTree, index: usize) -> TreeNode {
    let bone = &skeleton.nodes[index];
    let position = bone.position.to_vec3();
    let mut node = TreeNode::new(format!("Bone {index}"), NodeType::Bone)
        .with_metadata("table", bone.table_index)
        .with_metadata("position", format_point(position.x, position.y, position.z));
    for child in bone.children() {
        node = node.add_child(bone_tree(skeleton, child));
    }
    node
}

fn execute_pose(
    path: &Path,
    layout: RecordLayout,
    id: u32,
    animation: usize,
    frame: usize,
    from: Option<usize>,
    show_vertices: bool,
) -> Result<()> {
    let mut report = load(path, layout)?;
    let object = report
        .objects
        .iter_mut()
        .find(|o| o.id == id)
        .with_context(|| format!("No render object with id {id}"))?;

    if let Some(start) = from {
        report_outcome(animation, start, object.set_animation_pose(animation, start, true));
    }
    let outcome = object.set_animation_pose(animation, frame, true);
    report_outcome(animation, frame, outcome);
    if !outcome.is_applied() {
        return Ok(());
    }

    let center = object.center();
    println!("Center: {}", format_point(center.x, center.y, center.z));
    if let Some(current) = object.current_frame() {
        let translation = current.translation_vec3();
        println!(
            "Root translation: {}",
            format_point(translation.x, translation.y, translation.z)
        );
    }

    let mut table = create_table(&["Table", "Vertices", "Min", "Max"]);
    for (index, vertex_table) in object.vertex_tables.iter().enumerate() {
        let (min, max) = vertex_table.current.iter().fold(
            ([i16::MAX; 3], [i16::MIN; 3]),
            |(mut min, mut max), v| {
                for (axis, value) in [v.x, v.y, v.z].into_iter().enumerate() {
                    min[axis] = min[axis].min(value);
                    max[axis] = max[axis].max(value);
                }
                (min, max)
            },
        );
        let bounds = if vertex_table.is_empty() {
            ("-".to_string(), "-".to_string())
        } else {
            (format!("{min:?}"), format!("{max:?}"))
        };
        add_table_row(
            &mut table,
            [
                index.to_string(),
                vertex_table.len().to_string(),
                bounds.0,
                bounds.1,
            ],
        );
    }
    table.printstd();

    if show_vertices {
        for (index, vertex_table) in object.vertex_tables.iter().enumerate() {
            for (i, v) in vertex_table.current.iter().enumerate() {
                println!("{index}.{i}: {} {} {}", v.x, v.y, v.z);
            }
        }
    }
    Ok(())
}

fn report_outcome(animation: usize, frame: usize, outcome: PoseOutcome) {
    match outcome {
        PoseOutcome::Applied => println!(
            "{} animation {} frame {}",
            style("Applied").green(),
            animation,
            frame
        ),
        PoseOutcome::NoOp(reason) => println!(
            "{} animation {} frame {}: {}",
            style("Skipped").yellow(),
            animation,
            frame,
            reason
        ),
    }
}

#[cfg(feature = "serde")]
fn execute_export(path: &Path, layout: RecordLayout, output: Option<&Path>) -> Result<()> {
    let report = load(path, layout)?;
    let json =
        serde_json::to_string_pretty(&report.objects).context("Failed to serialize objects")?;
    match output {
        Some(out) => std::fs::write(out, json)
            .with_context(|| format!("Failed to write {}", out.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
