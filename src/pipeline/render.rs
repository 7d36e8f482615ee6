//! Document rendering: walk the [`SyntaxNode`] tree into a [`RenderedDocument`].
//!
//! Top-level nodes are dispatched on their [`NodeKind`] to one visitor each.
//! Kinds without a visitor fall back to visiting their children, so new or
//! unexpected node types degrade to their content instead of vanishing.
//!
//! Images are resolved while the tree is walked, one at a time and in
//! document order: each is either embedded or replaced by its placeholder
//! before the walk moves on. Decoding and re-encoding run in
//! `spawn_blocking` since they are CPU-bound.

use crate::config::ConversionConfig;
use crate::document::{
    Alignment, EmbeddedImage, FontFamily, ImageLayout, Inline, LineSpacing, ListMarker,
    Paragraph, ParagraphStyle, RenderedDocument, Run,
};
use crate::error::ImageFailure;
use crate::node::{NodeKind, SyntaxNode};
use crate::pipeline::encode::{self, ImageAsset};
use crate::pipeline::fetch::ImageFetcher;
use crate::pipeline::table;
use futures::future::BoxFuture;
use tracing::{debug, warn};

/// Inline formatting inherited from enclosing spans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
    pub monospace: bool,
}

impl SpanStyle {
    pub const BOLD: SpanStyle = SpanStyle {
        bold: true,
        italic: false,
        monospace: false,
    };

    fn with_bold(self) -> Self {
        Self { bold: true, ..self }
    }

    fn with_italic(self) -> Self {
        Self {
            italic: true,
            ..self
        }
    }

    fn with_monospace(self) -> Self {
        Self {
            monospace: true,
            ..self
        }
    }
}

/// Renders inline spans (text, strong, emphasis, codespan, ...) into runs.
#[derive(Debug, Clone, Copy)]
pub struct SpanRenderer<'c> {
    config: &'c ConversionConfig,
}

impl<'c> SpanRenderer<'c> {
    pub fn new(config: &'c ConversionConfig) -> Self {
        Self { config }
    }

    /// The Latin/East Asian font pair used for body text.
    pub fn body_font(&self) -> FontFamily {
        FontFamily {
            ascii: self.config.fonts.latin.clone(),
            east_asia: self.config.fonts.east_asian.clone(),
        }
    }

    fn mono_font(&self) -> FontFamily {
        FontFamily {
            ascii: self.config.fonts.monospace.clone(),
            east_asia: self.config.fonts.east_asian.clone(),
        }
    }

    /// A run carrying `style` and the matching font pair.
    pub fn run(&self, text: impl Into<String>, style: SpanStyle) -> Run {
        Run {
            text: text.into(),
            bold: style.bold,
            italic: style.italic,
            font: Some(if style.monospace {
                self.mono_font()
            } else {
                self.body_font()
            }),
            size_pt: None,
        }
    }

    /// Append `nodes` to `paragraph`, propagating `style` to every descendant.
    pub fn render(&self, paragraph: &mut Paragraph, nodes: &[SyntaxNode], style: SpanStyle) {
        for node in nodes {
            match node.kind {
                NodeKind::Text => {
                    if let Some(raw) = &node.raw {
                        paragraph.push_run(self.run(raw.as_str(), style));
                    }
                }
                NodeKind::Strong => self.render(paragraph, node.children(), style.with_bold()),
                NodeKind::Emphasis => self.render(paragraph, node.children(), style.with_italic()),
                NodeKind::Codespan => {
                    let text = node.raw.clone().unwrap_or_else(|| node.plain_text());
                    paragraph.push_run(self.run(text, style.with_monospace()));
                }
                NodeKind::Softbreak => paragraph.push_run(self.run(" ", style)),
                NodeKind::Linebreak => paragraph.content.push(Inline::LineBreak),
                NodeKind::Image => {
                    // Only an image that is alone in its paragraph gets embedded;
                    // here it shares the line, so leave a visible marker.
                    let alt = node.plain_text();
                    let marker = if alt.is_empty() {
                        "[图片]".to_string()
                    } else {
                        format!("[{alt}]")
                    };
                    paragraph.push_run(self.run(marker, style));
                }
                _ => {
                    if node.children.is_some() {
                        self.render(paragraph, node.children(), style);
                    }
                }
            }
        }
    }
}

/// Walks one parsed document. Construct a fresh renderer per request.
pub struct DocumentRenderer<'a, F: ImageFetcher> {
    config: &'a ConversionConfig,
    fetcher: &'a F,
    spans: SpanRenderer<'a>,
    doc: RenderedDocument,
    next_list_instance: u32,
}

impl<'a, F: ImageFetcher> DocumentRenderer<'a, F> {
    pub fn new(config: &'a ConversionConfig, fetcher: &'a F) -> Self {
        Self {
            config,
            fetcher,
            spans: SpanRenderer::new(config),
            doc: RenderedDocument::default(),
            next_list_instance: 1,
        }
    }

    /// Render top-level nodes in order, without reordering or deduplication.
    pub async fn render(&mut self, nodes: &[SyntaxNode]) {
        for node in nodes {
            self.dispatch(node).await;
        }
    }

    pub fn into_document(self) -> RenderedDocument {
        self.doc
    }

    fn dispatch<'s>(&'s mut self, node: &'s SyntaxNode) -> BoxFuture<'s, ()> {
        Box::pin(async move {
            debug!("Visiting {:?}", node.kind);
            match node.kind {
                NodeKind::Heading => self.visit_heading(node),
                NodeKind::Paragraph => self.visit_paragraph(node).await,
                NodeKind::BlockCode => self.visit_block_code(node),
                NodeKind::List => self.visit_list(node, 0),
                NodeKind::Table => self.visit_table(node),
                NodeKind::Image => self.visit_image(node).await,
                _ => {
                    for child in node.children() {
                        self.dispatch(child).await;
                    }
                }
            }
        })
    }

    fn visit_heading(&mut self, node: &SyntaxNode) {
        let level = node.attrs.level.unwrap_or(1).max(1);
        let mut p = Paragraph::new(ParagraphStyle::Heading(level));
        p.format.space_before_pt = Some(self.config.heading_space_before_pt);
        p.format.space_after_pt = Some(self.config.heading_space_after_pt);

        let mut run = self.spans.run(node.plain_text(), SpanStyle::BOLD);
        run.size_pt = Some(self.config.heading_size_pt(level));
        p.push_run(run);
        self.doc.push_paragraph(p);
    }

    async fn visit_paragraph(&mut self, node: &SyntaxNode) {
        if let [only] = node.children() {
            if only.kind == NodeKind::Image {
                self.visit_image(only).await;
                return;
            }
        }

        let mut p = Paragraph::new(ParagraphStyle::Normal);
        self.spans.render(&mut p, node.children(), SpanStyle::default());
        p.format.line_spacing = Some(LineSpacing::Exact(self.config.line_spacing_pt));
        p.format.first_line_indent_cm = Some(self.config.first_line_indent_cm);
        self.doc.push_paragraph(p);
    }

    fn visit_block_code(&mut self, node: &SyntaxNode) {
        let mut p = Paragraph::new(ParagraphStyle::NoSpacing);
        p.format.left_indent_cm = Some(self.config.code_indent_cm);
        self.push_code(&mut p, node.raw.as_deref().unwrap_or(""));
        self.doc.push_paragraph(p);
    }

    /// Append code text verbatim as monospace runs, one per line.
    fn push_code(&self, p: &mut Paragraph, code: &str) {
        let code = code.strip_suffix('\n').unwrap_or(code);
        for (i, line) in code.split('\n').enumerate() {
            if i > 0 {
                p.content.push(Inline::LineBreak);
            }
            let mut run = self.spans.run(line, SpanStyle::default().with_monospace());
            run.size_pt = Some(self.config.code_size_pt);
            p.push_run(run);
        }
    }

    fn visit_list(&mut self, node: &SyntaxNode, level: u8) {
        let marker = ListMarker {
            ordered: node.attrs.ordered.unwrap_or(false),
            level,
            instance: self.next_list_instance,
            start: node.attrs.start.unwrap_or(1),
        };
        self.next_list_instance += 1;
        for item in node.children() {
            self.visit_list_item(item, marker);
        }
    }

    fn visit_list_item(&mut self, node: &SyntaxNode, marker: ListMarker) {
        let style = if marker.ordered {
            ParagraphStyle::ListNumber
        } else {
            ParagraphStyle::ListBullet
        };
        let indent = self.config.first_line_indent_cm;
        let mut current = Some(Paragraph {
            list: Some(marker),
            ..Paragraph::new(style)
        });

        for child in node.children() {
            match child.kind {
                NodeKind::Paragraph | NodeKind::BlockText => {
                    let p = current.get_or_insert_with(|| continuation(style, marker, indent));
                    if !p.is_empty() {
                        p.content.push(Inline::LineBreak);
                    }
                    self.spans.render(p, child.children(), SpanStyle::default());
                }
                NodeKind::BlockCode => {
                    let mut p = current
                        .take()
                        .unwrap_or_else(|| continuation(style, marker, indent));
                    if !p.is_empty() {
                        p.content.push(Inline::LineBreak);
                    }
                    self.push_code(&mut p, child.raw.as_deref().unwrap_or(""));
                    current = Some(p);
                }
                NodeKind::List => {
                    if let Some(p) = current.take() {
                        self.doc.push_paragraph(p);
                    }
                    self.visit_list(child, marker.level.saturating_add(1));
                }
                _ if child.children.is_some() => {
                    let p = current.get_or_insert_with(|| continuation(style, marker, indent));
                    self.spans.render(p, child.children(), SpanStyle::default());
                }
                _ => {}
            }
        }

        if let Some(p) = current {
            self.doc.push_paragraph(p);
        }
    }

    fn visit_table(&mut self, node: &SyntaxNode) {
        match table::materialize_table(node, &self.spans) {
            Some(grid) => self.doc.push_table(grid),
            None => debug!("Skipping table without rows"),
        }
    }

    async fn visit_image(&mut self, node: &SyntaxNode) {
        let url = node.attrs.url.as_deref().unwrap_or("").trim();
        if url.is_empty() {
            debug!("Skipping image without a URL");
            return;
        }

        match self.resolve_image(url).await {
            Ok(asset) => {
                let (width_cm, height_cm) =
                    encode::display_size_cm(asset.width_px, asset.height_px, self.config);
                let mut p = Paragraph::new(ParagraphStyle::Normal);
                p.format.alignment = Some(Alignment::Center);
                p.format.line_spacing = Some(LineSpacing::Single);
                p.format.first_line_indent_cm = Some(0.0);
                p.content.push(Inline::Image(EmbeddedImage {
                    data: asset.jpeg,
                    width_cm,
                    height_cm,
                    description: node.plain_text(),
                    layout: ImageLayout::TopAndBottom,
                }));
                self.doc.push_paragraph(p);
            }
            Err(failure) => {
                warn!("Image replaced by placeholder: {:?}", failure);
                let mut p = Paragraph::new(ParagraphStyle::Normal);
                p.push_run(self.spans.run(failure.to_string(), SpanStyle::default()));
                self.doc.push_paragraph(p);
            }
        }
    }

    async fn resolve_image(&self, url: &str) -> Result<ImageAsset, ImageFailure> {
        let bytes = self.fetcher.fetch(url).await?;
        let owned_url = url.to_string();
        let quality = self.config.jpeg_quality;
        tokio::task::spawn_blocking(move || encode::normalize_image(&owned_url, &bytes, quality))
            .await
            .map_err(|e| ImageFailure::Encode {
                url: url.to_string(),
                reason: format!("image task panicked: {e}"),
            })?
    }
}

/// Paragraph for item content that follows a nested list: indented one
/// `indent_cm` step per nesting level, unmarked.
fn continuation(style: ParagraphStyle, marker: ListMarker, indent_cm: f32) -> Paragraph {
    let mut p = Paragraph::new(style);
    p.format.left_indent_cm = Some(indent_cm * (f32::from(marker.level) + 1.0));
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parse::parse_markdown;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Serves canned bytes or failures and records the order of requests.
    #[derive(Default)]
    struct StubFetcher {
        responses: HashMap<String, Result<Vec<u8>, ImageFailure>>,
        requested: Mutex<Vec<String>>,
    }

    impl ImageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageFailure> {
            self.requested.lock().unwrap().push(url.to_string());
            self.responses.get(url).cloned().unwrap_or(Err(ImageFailure::Http {
                url: url.to_string(),
                status: 404,
            }))
        }
    }

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([0, 0, 255, 128])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    async fn render_configured(
        md: &str,
        config: &ConversionConfig,
        fetcher: &StubFetcher,
    ) -> RenderedDocument {
        let mut renderer = DocumentRenderer::new(config, fetcher);
        renderer.render(&parse_markdown(md)).await;
        renderer.into_document()
    }

    async fn render_with(md: &str, fetcher: &StubFetcher) -> RenderedDocument {
        render_configured(md, &ConversionConfig::default(), fetcher).await
    }

    async fn render(md: &str) -> RenderedDocument {
        render_with(md, &StubFetcher::default()).await
    }

    #[tokio::test]
    async fn headings_keep_order_and_shrink_with_level() {
        let doc = render("# Alpha\n\n## Beta\n\n### Gamma\n").await;
        let paras: Vec<_> = doc.paragraphs().collect();
        assert_eq!(paras.len(), 3);
        let texts: Vec<_> = paras.iter().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["Alpha", "Beta", "Gamma"]);
        let sizes: Vec<f32> = paras
            .iter()
            .map(|p| p.runs().next().unwrap().size_pt.unwrap())
            .collect();
        assert!(sizes[0] > sizes[1] && sizes[1] > sizes[2], "{sizes:?}");
        assert!(paras.iter().all(|p| p.runs().all(|r| r.bold)));
        assert_eq!(paras[1].style, ParagraphStyle::Heading(2));
        assert_eq!(paras[0].format.space_before_pt, Some(22.0));
    }

    #[tokio::test]
    async fn paragraph_runs_carry_inline_styles() {
        let doc = render("plain **bold *both*** _it_ `code`\n").await;
        let p = doc.paragraphs().next().unwrap();
        let runs: Vec<_> = p.runs().collect();
        let find = |t: &str| runs.iter().find(|r| r.text == t).copied().unwrap();
        assert!(!find("plain ").bold);
        assert!(find("bold ").bold && !find("bold ").italic);
        assert!(find("both").bold && find("both").italic);
        assert!(find("it").italic && !find("it").bold);
        assert_eq!(
            find("code").font.as_ref().unwrap().ascii,
            "Courier New"
        );
        assert_eq!(find("plain ").font.as_ref().unwrap().east_asia, "宋体");
        assert_eq!(p.format.first_line_indent_cm, Some(0.74));
        assert_eq!(p.format.line_spacing, Some(LineSpacing::Exact(25.0)));
    }

    #[tokio::test]
    async fn soft_break_becomes_space_and_links_keep_text() {
        let doc = render("see [the docs](https://x.example)\nnext line\n").await;
        assert_eq!(doc.paragraphs().next().unwrap().text(), "see the docs next line");
    }

    #[tokio::test]
    async fn code_block_is_verbatim_monospace() {
        let doc = render("```\nfn main() {\n    println!(\"**not bold**\");\n}\n```\n").await;
        let p = doc.paragraphs().next().unwrap();
        assert_eq!(p.style, ParagraphStyle::NoSpacing);
        assert_eq!(p.format.left_indent_cm, Some(1.0));
        assert_eq!(p.text(), "fn main() {\n    println!(\"**not bold**\");\n}");
        assert!(p.runs().all(|r| !r.bold && r.size_pt == Some(10.0)));
    }

    #[tokio::test]
    async fn nested_lists_keep_their_own_ordering() {
        let doc = render("1. one\n   - inner a\n   - inner b\n2. two\n").await;
        let paras: Vec<_> = doc.paragraphs().collect();
        let summary: Vec<_> = paras
            .iter()
            .map(|p| {
                let m = p.list.unwrap();
                (p.text(), m.ordered, m.level)
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("one".to_string(), true, 0),
                ("inner a".to_string(), false, 1),
                ("inner b".to_string(), false, 1),
                ("two".to_string(), true, 0),
            ]
        );
        assert_eq!(paras[0].list.unwrap().instance, paras[3].list.unwrap().instance);
        assert_ne!(paras[0].list.unwrap().instance, paras[1].list.unwrap().instance);
    }

    #[tokio::test]
    async fn ordered_list_keeps_its_start_number() {
        let doc = render("3. three\n4. four\n\n- bullet\n").await;
        let markers: Vec<_> = doc.paragraphs().map(|p| p.list.unwrap()).collect();
        assert_eq!(markers.len(), 3);
        assert_eq!((markers[0].ordered, markers[0].start), (true, 3));
        assert_eq!(markers[0].instance, markers[1].instance);
        assert_eq!((markers[2].ordered, markers[2].start), (false, 1));
    }

    #[tokio::test]
    async fn text_after_nested_list_is_indented_by_configured_step() {
        let mut config = ConversionConfig::default();
        config.first_line_indent_cm = 0.5;
        let md = "- outer\n\n  - inner\n\n  tail\n";
        let doc = render_configured(md, &config, &StubFetcher::default()).await;
        let paras: Vec<_> = doc.paragraphs().collect();
        let tail = paras.last().unwrap();
        assert_eq!(tail.text(), "tail");
        assert!(tail.list.is_none());
        assert_eq!(tail.format.left_indent_cm, Some(0.5));
    }

    #[tokio::test]
    async fn setext_heading_keeps_word_boundary() {
        let doc = render("Quarterly\nreport\n===\n").await;
        let heading = doc.paragraphs().next().unwrap();
        assert_eq!(heading.style, ParagraphStyle::Heading(1));
        assert_eq!(heading.text(), "Quarterly report");
    }

    #[tokio::test]
    async fn code_inside_list_item_is_appended() {
        let doc = render("- run this:\n\n  ```\n  make\n  ```\n").await;
        let p = doc.paragraphs().next().unwrap();
        assert_eq!(p.text(), "run this:\nmake");
        assert_eq!(
            p.runs().last().unwrap().font.as_ref().unwrap().ascii,
            "Courier New"
        );
    }

    #[tokio::test]
    async fn unknown_nodes_fall_back_to_children() {
        let doc = render("> quoted paragraph\n\n---\n\n<div>raw</div>\n").await;
        let texts: Vec<_> = doc.paragraphs().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["quoted paragraph"]);
    }

    #[tokio::test]
    async fn lone_image_is_embedded_not_wrapped() {
        let mut fetcher = StubFetcher::default();
        fetcher
            .responses
            .insert("https://img.example/a.png".into(), Ok(png(40, 20)));
        let doc = render_with("![chart](https://img.example/a.png)\n", &fetcher).await;
        let images: Vec<_> = doc.images().collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].description, "chart");
        assert_eq!(images[0].layout, ImageLayout::TopAndBottom);
        assert!((images[0].width_cm - 13.5).abs() < 1e-9);
        assert_eq!(&images[0].data[..2], &[0xFF, 0xD8]);
        let p = doc.paragraphs().next().unwrap();
        assert_eq!(p.format.alignment, Some(Alignment::Center));
        assert_eq!(p.runs().count(), 0);
    }

    #[tokio::test]
    async fn failed_image_becomes_placeholder_with_url() {
        let doc = render("# T\n\n![x](https://img.example/missing.png)\n\nafter\n").await;
        let texts: Vec<_> = doc.paragraphs().map(|p| p.text()).collect();
        assert_eq!(texts.len(), 3);
        assert!(texts[1].contains("https://img.example/missing.png"));
        assert!(texts[1].contains("404"));
        assert_eq!(texts[2], "after");
        assert_eq!(doc.images().count(), 0);
    }

    #[tokio::test]
    async fn undecodable_image_gets_invalid_format_placeholder() {
        let mut fetcher = StubFetcher::default();
        fetcher
            .responses
            .insert("https://img.example/b.png".into(), Ok(b"not an image".to_vec()));
        let doc = render_with("![b](https://img.example/b.png)\n", &fetcher).await;
        let text = doc.paragraphs().next().unwrap().text();
        assert_eq!(text, "[图片格式无效: https://img.example/b.png]");
    }

    #[tokio::test]
    async fn images_resolve_in_document_order() {
        let mut fetcher = StubFetcher::default();
        fetcher.responses.insert(
            "https://img.example/2.png".into(),
            Err(ImageFailure::Timeout {
                url: "https://img.example/2.png".into(),
                secs: 10,
            }),
        );
        let md = "![](https://img.example/1.png)\n\n> ![](https://img.example/2.png)\n\n![](https://img.example/3.png)\n";
        let doc = render_with(md, &fetcher).await;
        assert_eq!(
            *fetcher.requested.lock().unwrap(),
            vec![
                "https://img.example/1.png",
                "https://img.example/2.png",
                "https://img.example/3.png"
            ]
        );
        let texts: Vec<_> = doc.paragraphs().map(|p| p.text()).collect();
        assert!(texts[1].starts_with("[图片下载超时"));
    }

    #[tokio::test]
    async fn inline_image_leaves_alt_marker() {
        let fetcher = StubFetcher::default();
        let doc = render_with("see ![diagram](https://img.example/d.png) here\n", &fetcher).await;
        assert_eq!(doc.paragraphs().next().unwrap().text(), "see [diagram] here");
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_without_url_is_skipped() {
        let fetcher = StubFetcher::default();
        let doc = render_with("![nothing]()\n", &fetcher).await;
        assert!(doc.blocks.is_empty());
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }
}
