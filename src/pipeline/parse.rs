//! Markdown parsing: raw text → ordered [`SyntaxNode`] tree.
//!
//! pulldown-cmark hands us a flat stream of start/end events. We fold it into
//! an owned tree with a stack of open containers, normalising two things on
//! the way so the renderers see a stable shape:
//!
//! - inline content sitting directly in a tight list item is grouped into a
//!   `block_text` child, so list items always contain block-level children;
//! - body rows of a table are wrapped in a `table_body` node. The header is
//!   left as pulldown-cmark emits it: cells directly under `table_head`, with
//!   no row wrapper.

use crate::node::{NodeAttrs, NodeKind, SyntaxNode};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use tracing::debug;

/// Parse Markdown text into top-level nodes, in document order.
pub fn parse_markdown(text: &str) -> Vec<SyntaxNode> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut builder = TreeBuilder::default();
    for event in Parser::new_ext(text, options) {
        builder.event(event);
    }
    let nodes = builder.finish();
    debug!("Parsed {} top-level nodes", nodes.len());
    nodes
}

/// An open container waiting for its end event.
struct Frame {
    kind: NodeKind,
    attrs: NodeAttrs,
    raw: Option<String>,
    children: Vec<SyntaxNode>,
}

impl Frame {
    fn new(kind: NodeKind, attrs: NodeAttrs) -> Self {
        let raw = match kind {
            NodeKind::BlockCode | NodeKind::Html => Some(String::new()),
            _ => None,
        };
        Self {
            kind,
            attrs,
            raw,
            children: Vec::new(),
        }
    }

    fn into_node(self) -> SyntaxNode {
        let node = match self.kind {
            NodeKind::BlockCode | NodeKind::Html => {
                SyntaxNode::leaf(self.kind, self.raw.unwrap_or_default())
            }
            NodeKind::ListItem => {
                SyntaxNode::container(NodeKind::ListItem, group_inline(self.children))
            }
            NodeKind::Table => SyntaxNode::container(NodeKind::Table, wrap_body(self.children)),
            kind => SyntaxNode::container(kind, self.children),
        };
        node.with_attrs(self.attrs)
    }
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Frame>,
    roots: Vec<SyntaxNode>,
}

impl TreeBuilder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => {
                let (kind, attrs) = map_tag(tag);
                self.stack.push(Frame::new(kind, attrs));
            }
            Event::End(_) => {
                if let Some(frame) = self.stack.pop() {
                    self.push(frame.into_node());
                }
            }
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push(SyntaxNode::leaf(NodeKind::Codespan, code.to_string())),
            Event::Html(html) | Event::InlineHtml(html) => match self.stack.last_mut() {
                Some(frame) if frame.kind == NodeKind::Html => {
                    frame.raw.get_or_insert_with(String::new).push_str(&html);
                }
                _ => self.push(SyntaxNode::leaf(NodeKind::Html, html.to_string())),
            },
            Event::SoftBreak => self.push(SyntaxNode::void(NodeKind::Softbreak)),
            Event::HardBreak => self.push(SyntaxNode::void(NodeKind::Linebreak)),
            Event::Rule => self.push(SyntaxNode::void(NodeKind::ThematicBreak)),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(frame) = self.stack.last_mut() {
            if let Some(raw) = frame.raw.as_mut() {
                raw.push_str(text);
                return;
            }
            // pulldown-cmark splits text around escapes and entities; merge
            // the pieces back so each run of text is one leaf.
            if let Some(last) = frame.children.last_mut() {
                if last.kind == NodeKind::Text {
                    if let Some(raw) = last.raw.as_mut() {
                        raw.push_str(text);
                        return;
                    }
                }
            }
        }
        self.push(SyntaxNode::leaf(NodeKind::Text, text));
    }

    fn push(&mut self, node: SyntaxNode) {
        match self.stack.last_mut() {
            Some(frame) => frame.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn finish(mut self) -> Vec<SyntaxNode> {
        // Well-formed event streams leave nothing open; close whatever remains.
        while let Some(frame) = self.stack.pop() {
            self.push(frame.into_node());
        }
        self.roots
    }
}

fn map_tag(tag: Tag<'_>) -> (NodeKind, NodeAttrs) {
    let mut attrs = NodeAttrs::default();
    let kind = match tag {
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::Heading { level, .. } => {
            attrs.level = Some(heading_level(level));
            NodeKind::Heading
        }
        Tag::BlockQuote => NodeKind::BlockQuote,
        Tag::CodeBlock(kind) => {
            if let CodeBlockKind::Fenced(info) = kind {
                if !info.is_empty() {
                    attrs.info = Some(info.to_string());
                }
            }
            NodeKind::BlockCode
        }
        Tag::HtmlBlock => NodeKind::Html,
        Tag::List(start) => {
            attrs.ordered = Some(start.is_some());
            attrs.start = start;
            NodeKind::List
        }
        Tag::Item => NodeKind::ListItem,
        Tag::Table(_) => NodeKind::Table,
        Tag::TableHead => NodeKind::TableHead,
        Tag::TableRow => NodeKind::TableRow,
        Tag::TableCell => NodeKind::TableCell,
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Strikethrough => NodeKind::Strikethrough,
        Tag::Link {
            dest_url, title, ..
        } => {
            attrs.url = Some(dest_url.to_string());
            attrs.title = non_empty(&title);
            NodeKind::Link
        }
        Tag::Image {
            dest_url, title, ..
        } => {
            attrs.url = Some(dest_url.to_string());
            attrs.title = non_empty(&title);
            NodeKind::Image
        }
        other => NodeKind::Other(format!("{other:?}")),
    };
    (kind, attrs)
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn is_inline(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Text
            | NodeKind::Strong
            | NodeKind::Emphasis
            | NodeKind::Strikethrough
            | NodeKind::Codespan
            | NodeKind::Link
            | NodeKind::Image
            | NodeKind::Softbreak
            | NodeKind::Linebreak
            | NodeKind::Html
    )
}

/// Group runs of inline children into `block_text` nodes.
fn group_inline(children: Vec<SyntaxNode>) -> Vec<SyntaxNode> {
    let mut out = Vec::with_capacity(children.len());
    let mut pending: Vec<SyntaxNode> = Vec::new();
    for child in children {
        if is_inline(&child.kind) {
            pending.push(child);
            continue;
        }
        if !pending.is_empty() {
            out.push(SyntaxNode::container(
                NodeKind::BlockText,
                std::mem::take(&mut pending),
            ));
        }
        out.push(child);
    }
    if !pending.is_empty() {
        out.push(SyntaxNode::container(NodeKind::BlockText, pending));
    }
    out
}

/// Move the rows that follow the head into a `table_body` node.
fn wrap_body(children: Vec<SyntaxNode>) -> Vec<SyntaxNode> {
    let (rows, mut rest): (Vec<_>, Vec<_>) = children
        .into_iter()
        .partition(|c| c.kind == NodeKind::TableRow);
    if !rows.is_empty() {
        rest.push(SyntaxNode::container(NodeKind::TableBody, rows));
    }
    rest
}
