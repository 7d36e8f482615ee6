//! The parsed Markdown tree.
//!
//! A [`SyntaxNode`] is produced once by [`crate::pipeline::parse`] and read
//! by the renderers. A node carries either literal text (`raw`), ordered
//! children, or neither; consumers must never assume both.

use serde::Serialize;

/// Tag identifying what a [`SyntaxNode`] represents.
///
/// The set is closed; anything the parser adapter does not map gets
/// [`NodeKind::Other`] and is handled by the renderer's fallback branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Heading,
    Paragraph,
    /// Inline content sitting directly inside a tight list item.
    BlockText,
    BlockCode,
    BlockQuote,
    ThematicBreak,
    List,
    ListItem,
    Table,
    TableHead,
    TableBody,
    TableRow,
    TableCell,
    Text,
    Strong,
    Emphasis,
    Strikethrough,
    Codespan,
    Link,
    Image,
    Softbreak,
    Linebreak,
    Html,
    Other(String),
}

/// Node-specific properties. Only the fields relevant to a node's kind are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeAttrs {
    /// Heading level, 1–6.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    /// Whether a list is numbered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordered: Option<bool>,
    /// First number of an ordered list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    /// Image source or link target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Image or link title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Code fence info string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

/// One node of the parsed Markdown tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "is_default_attrs")]
    pub attrs: NodeAttrs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<SyntaxNode>>,
}

fn is_default_attrs(attrs: &NodeAttrs) -> bool {
    *attrs == NodeAttrs::default()
}

impl SyntaxNode {
    /// A void node: no text, no children.
    pub fn void(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: NodeAttrs::default(),
            raw: None,
            children: None,
        }
    }

    /// A leaf carrying literal text.
    pub fn leaf(kind: NodeKind, raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
            ..Self::void(kind)
        }
    }

    /// A container with ordered children.
    pub fn container(kind: NodeKind, children: Vec<SyntaxNode>) -> Self {
        Self {
            children: Some(children),
            ..Self::void(kind)
        }
    }

    pub fn with_attrs(mut self, attrs: NodeAttrs) -> Self {
        self.attrs = attrs;
        self
    }

    /// Children, or an empty slice for leaves and void nodes.
    pub fn children(&self) -> &[SyntaxNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn is(&self, kind: &NodeKind) -> bool {
        &self.kind == kind
    }

    /// Flatten all descendant text, dropping inline styling.
    ///
    /// `raw` wins over children, matching how leaves are read elsewhere.
    /// Soft and hard breaks flatten to a single space.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if matches!(self.kind, NodeKind::Softbreak | NodeKind::Linebreak) {
            out.push(' ');
            return;
        }
        if let Some(raw) = &self.raw {
            out.push_str(raw);
            return;
        }
        for child in self.children() {
            child.collect_text(out);
        }
    }

    /// Depth-first search in document order.
    pub fn find_first<'a>(nodes: &'a [SyntaxNode], kind: &NodeKind) -> Option<&'a SyntaxNode> {
        for node in nodes {
            if node.is(kind) {
                return Some(node);
            }
            if let Some(found) = Self::find_first(node.children(), kind) {
                return Some(found);
            }
        }
        None
    }
}
