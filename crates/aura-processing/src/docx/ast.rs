//! Intermediate rich-text representation produced by the fallback reader.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text { text: String, style: TextStyle },
    Link { target: String, children: Vec<Inline> },
    /// Index into [`DocumentAst::images`].
    Image { slot: usize, alt: String },
    LineBreak,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, inlines: Vec<Inline> },
    Paragraph(Vec<Inline>),
    ListItem { ordered: bool, level: u8, inlines: Vec<Inline> },
    /// Rows of cells; each cell is the inline content of its paragraphs.
    Table(Vec<Vec<Vec<Inline>>>),
}

/// An embedded image part, in first-encounter order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePart {
    /// Package path, e.g. `word/media/image1.png`.
    pub part_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentAst {
    pub blocks: Vec<Block>,
    pub images: Vec<ImagePart>,
}
