//! Tree rendering for file structure views

use console::Style;

use super::format::format_bytes;

/// A node of a rendered tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub node_type: NodeType,
    pub size: Option<u64>,
    pub children: Vec<TreeNode>,
    /// Key/value pairs in insertion order
    pub metadata: Vec<(String, String)>,
    pub external_refs: Vec<ExternalRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Root,
    Header,
    Table,
    Object,
    Bone,
    Animation,
    Level,
}

/// A file name a record points at
#[derive(Debug, Clone)]
pub struct ExternalRef {
    pub path: String,
    pub ref_type: RefType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefType {
    Model,
    Level,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub max_depth: Option<usize>,
    pub show_external_refs: bool,
    pub no_color: bool,
    pub show_metadata: bool,
    /// Only the `count`, `id`, `kind` and `table` keys, inline
    pub compact: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            show_external_refs: true,
            no_color: false,
            show_metadata: true,
            compact: false,
        }
    }
}

impl TreeNode {
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            size: None,
            children: Vec::new(),
            metadata: Vec::new(),
            external_refs: Vec::new(),
        }
    }

    pub fn add_child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_external_ref(mut self, path: &str) -> Self {
        self.external_refs.push(ExternalRef {
            path: path.to_string(),
            ref_type: detect_ref_type(path),
        });
        self
    }
}

impl ExternalRef {
    pub fn icon(&self) -> &'static str {
        match self.ref_type {
            RefType::Model => "🏗️",
            RefType::Level => "🗺️",
            RefType::Unknown => "📁",
        }
    }
}

impl NodeType {
    pub fn icon(&self) -> &'static str {
        match self {
            NodeType::Root => "📁",
            NodeType::Header => "📋",
            NodeType::Table => "📊",
            NodeType::Object => "📦",
            NodeType::Bone => "🦴",
            NodeType::Animation => "📽️",
            NodeType::Level => "🗺️",
        }
    }

    pub fn style(&self, no_color: bool) -> Style {
        if no_color {
            return Style::new();
        }
        match self {
            NodeType::Root => Style::new().bold().cyan(),
            NodeType::Header => Style::new().bold().yellow(),
            NodeType::Table => Style::new().magenta(),
            NodeType::Object => Style::new().blue(),
            NodeType::Bone => Style::new().white(),
            NodeType::Animation => Style::new().green(),
            NodeType::Level => Style::new().cyan(),
        }
    }
}

/// Render a tree to a string, one node per line
pub fn render_tree(root: &TreeNode, options: &TreeOptions) -> String {
    let mut output = String::new();
    render_node(root, &mut output, "", true, 0, options);
    output
}

fn render_node(
    node: &TreeNode,
    output: &mut String,
    prefix: &str,
    is_last: bool,
    depth: usize,
    options: &TreeOptions,
) {
    if let Some(max_depth) = options.max_depth
        && depth > max_depth
    {
        return;
    }

    let style = node.node_type.style(options.no_color);
    let connector = match (depth, is_last) {
        (0, _) => "",
        (_, true) => "└── ",
        (_, false) => "├── ",
    };
    let mut line = format!(
        "{}{}{} {}",
        prefix,
        connector,
        node.node_type.icon(),
        style.apply_to(&node.name)
    );
    if let Some(size) = node.size {
        line.push_str(&format!(" ({})", format_bytes(size)));
    }
    if options.show_metadata && options.compact {
        let inline: Vec<_> = node
            .metadata
            .iter()
            .filter(|(key, _)| ["count", "id", "kind", "table"].contains(&key.as_str()))
            .map(|(key, value)| format!("{key}:{value}"))
            .collect();
        if !inline.is_empty() {
            line.push_str(&format!(" [{}]", inline.join(", ")));
        }
    }
    output.push_str(&line);
    output.push('\n');

    let child_prefix = match (depth, is_last) {
        (0, _) => String::new(),
        (_, true) => format!("{prefix}    "),
        (_, false) => format!("{prefix}│   "),
    };

    if options.show_metadata && !options.compact {
        let key_style = if options.no_color {
            Style::new()
        } else {
            Style::new().dim()
        };
        for (key, value) in &node.metadata {
            output.push_str(&format!(
                "{}    🏷️  {}: {}\n",
                child_prefix,
                key_style.apply_to(key),
                value
            ));
        }
    }

    if options.show_external_refs {
        let ref_style = if options.no_color {
            Style::new()
        } else {
            Style::new().yellow()
        };
        for ext_ref in &node.external_refs {
            output.push_str(&format!(
                "{}    └─→ {} {}\n",
                child_prefix,
                ext_ref.icon(),
                ref_style.apply_to(&ext_ref.path)
            ));
        }
    }

    for (i, child) in node.children.iter().enumerate() {
        render_node(
            child,
            output,
            &child_prefix,
            i + 1 == node.children.len(),
            depth + 1,
            options,
        );
    }
}

/// Guess what a referenced file holds from its extension
pub fn detect_ref_type(path: &str) -> RefType {
    let path_lower = path.to_lowercase();
    if path_lower.ends_with(".rsc") || path_lower.ends_with(".bsd") {
        RefType::Model
    } else if path_lower.ends_with(".tsp") {
        RefType::Level
    } else {
        RefType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TreeNode {
        TreeNode::new("scene.bsd", NodeType::Root)
            .with_size(1024)
            .with_metadata("count", 2)
            .add_child(TreeNode::new("Sections", NodeType::Table).with_metadata("count", 10))
            .add_child(
                TreeNode::new("Object 3", NodeType::Object)
                    .with_metadata("kind", 1)
                    .with_external_ref("SOLDIER.RSC")
                    .add_child(TreeNode::new("Bone 0", NodeType::Bone)),
            )
    }

    #[test]
    fn test_tree_rendering() {
        let options = TreeOptions {
            no_color: true,
            ..TreeOptions::default()
        };
        let output = render_tree(&sample(), &options);

        assert!(output.starts_with("📁 scene.bsd (1.02 kB)\n"));
        assert!(output.contains("├── 📊 Sections"));
        assert!(output.contains("└── 📦 Object 3"));
        assert!(output.contains("    └── 🦴 Bone 0"));
        assert!(output.contains("└─→ 🏗️ SOLDIER.RSC"));
        assert!(output.contains("kind: 1"));
    }

    #[test]
    fn test_compact_and_depth() {
        let options = TreeOptions {
            no_color: true,
            compact: true,
            max_depth: Some(1),
            ..TreeOptions::default()
        };
        let output = render_tree(&sample(), &options);

        assert!(output.contains("Sections [count:10]"));
        assert!(!output.contains("Bone 0"));
        assert!(!output.contains("🏷️"));
    }

    #[test]
    fn test_ref_type_detection() {
        assert_eq!(detect_ref_type("SOLDIER.RSC"), RefType::Model);
        assert_eq!(detect_ref_type("level.tsp"), RefType::Level);
        assert_eq!(detect_ref_type("readme"), RefType::Unknown);
    }
}
