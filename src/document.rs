//! In-memory model of the word-processing output.
//!
//! The renderer appends [`Block`]s in document order; [`crate::ooxml::docx`]
//! serialises the finished [`RenderedDocument`] into a `.docx` package.
//! Lengths are kept in the units people think in (points, centimetres) and
//! converted to OOXML units only at serialisation time.

/// Paragraph style names defined in the generated `styles.xml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    Normal,
    Heading(u8),
    NoSpacing,
    ListBullet,
    ListNumber,
}

impl ParagraphStyle {
    /// The `w:styleId` used in `document.xml`.
    pub fn style_id(&self) -> String {
        match self {
            ParagraphStyle::Normal => "Normal".to_string(),
            ParagraphStyle::Heading(level) => format!("Heading{}", (*level).clamp(1, 6)),
            ParagraphStyle::NoSpacing => "NoSpacing".to_string(),
            ParagraphStyle::ListBullet => "ListBullet".to_string(),
            ParagraphStyle::ListNumber => "ListNumber".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
}

/// Numbering attached to a list paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMarker {
    pub ordered: bool,
    /// Nesting depth, 0 for a top-level list.
    pub level: u8,
    /// Identifies one list, so numbering restarts for every ordered list.
    pub instance: u32,
    /// First number of an ordered list.
    pub start: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSpacing {
    /// Fixed line height in points; taller content is clipped.
    Exact(f32),
    /// Single spacing that grows with the content.
    Single,
}

/// Paragraph-level formatting. `None` inherits from the paragraph style.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphFormat {
    pub alignment: Option<Alignment>,
    pub line_spacing: Option<LineSpacing>,
    pub first_line_indent_cm: Option<f32>,
    pub left_indent_cm: Option<f32>,
    pub space_before_pt: Option<f32>,
    pub space_after_pt: Option<f32>,
}

/// Font family pair for a run: Latin text and East Asian text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFamily {
    pub ascii: String,
    pub east_asia: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub font: Option<FontFamily>,
    pub size_pt: Option<f32>,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
            font: None,
            size_pt: None,
        }
    }
}

/// How an image sits relative to the surrounding text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    /// Anchored and horizontally centred; text flows above and below, never beside.
    TopAndBottom,
}

/// A normalised picture ready to embed.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    /// Baseline JPEG bytes.
    pub data: Vec<u8>,
    pub width_cm: f64,
    pub height_cm: f64,
    pub description: String,
    pub layout: ImageLayout,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Run(Run),
    LineBreak,
    Image(EmbeddedImage),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub style: ParagraphStyle,
    pub format: ParagraphFormat,
    pub list: Option<ListMarker>,
    pub content: Vec<Inline>,
}

impl Paragraph {
    pub fn new(style: ParagraphStyle) -> Self {
        Self {
            style,
            format: ParagraphFormat::default(),
            list: None,
            content: Vec::new(),
        }
    }

    pub fn push_run(&mut self, run: Run) {
        self.content.push(Inline::Run(run));
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.content.iter().filter_map(|i| match i {
            Inline::Run(r) => Some(r),
            _ => None,
        })
    }

    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
        self.content.iter_mut().filter_map(|i| match i {
            Inline::Run(r) => Some(r),
            _ => None,
        })
    }

    /// Concatenated run text; line breaks read as `\n`.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for inline in &self.content {
            match inline {
                Inline::Run(r) => out.push_str(&r.text),
                Inline::LineBreak => out.push('\n'),
                Inline::Image(_) => {}
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// One grid cell. Always holds at least one paragraph once serialised.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableCell {
    pub paragraphs: Vec<Paragraph>,
}

/// A bordered `rows × cols` grid; every row has exactly `cols` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub cols: usize,
    pub rows: Vec<Vec<TableCell>>,
}

impl Table {
    /// An empty grid with every cell present.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            rows: (0..rows)
                .map(|_| (0..cols).map(|_| TableCell::default()).collect())
                .collect(),
        }
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        self.rows.get_mut(row)?.get_mut(col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

/// Ordered block content of one generated document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedDocument {
    pub blocks: Vec<Block>,
}

impl RenderedDocument {
    pub fn push_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }

    pub fn push_table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            Block::Table(_) => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            Block::Paragraph(_) => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &EmbeddedImage> {
        self.paragraphs()
            .flat_map(|p| p.content.iter())
            .filter_map(|i| match i {
                Inline::Image(img) => Some(img),
                _ => None,
            })
    }
}
