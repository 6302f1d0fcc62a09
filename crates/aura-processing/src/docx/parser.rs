//! Walks the `rs_docx` document tree into [`DocumentAst`].

use super::ast::{Block, DocumentAst, ImagePart, Inline, TextStyle};
use super::package::{is_external_target, resolve_part, ExpansionLimits, Package};
use crate::types::ConversionError;
use bytes::Bytes;
use rs_docx::document::{
    BodyContent, BreakType, Drawing, Paragraph, ParagraphContent, Pict, Run, RunContent, Table,
    TableCellContent, TableRowContent,
};
use rs_docx::{Docx, DocxFile};
use std::collections::HashMap;
use std::io::Cursor;

/// Directory of the main document part; relationship targets resolve against it.
const DOCUMENT_DIR: &str = "word";

/// Read a `.docx` buffer into blocks plus its referenced images.
pub fn read_document(bytes: Bytes, limits: ExpansionLimits) -> Result<DocumentAst, ConversionError> {
    let mut package = Package::open(bytes.clone(), limits)?;
    package.check_expansion()?;

    let file = DocxFile::from_reader(Cursor::new(bytes))
        .map_err(|e| ConversionError::Content(format!("Failed to open .docx: {:?}", e)))?;
    let docx = file
        .parse()
        .map_err(|e| ConversionError::Content(format!("Failed to parse .docx: {:?}", e)))?;

    let rels = relationship_map(&docx);
    let lists = ListFormats::new(&docx);
    let mut walker = Walker {
        package: &mut package,
        rels: &rels,
        lists: &lists,
        image_slots: HashMap::new(),
        images: Vec::new(),
    };

    let mut blocks = Vec::new();
    for content in &docx.document.body.content {
        walker.body_content(content, &mut blocks)?;
    }

    Ok(DocumentAst {
        blocks,
        images: walker.images,
    })
}

fn relationship_map(docx: &Docx) -> HashMap<String, String> {
    let mut rels = HashMap::new();
    if let Some(doc_rels) = &docx.document_rels {
        for rel in &doc_rels.relationships {
            rels.insert(rel.id.to_string(), rel.target.to_string());
        }
    }
    rels
}

/// Number formats per list, from the numbering part.
#[derive(Debug, Default)]
struct ListFormats {
    abstract_for_num: HashMap<i32, i32>,
    formats: HashMap<(i32, i32), String>,
}

impl ListFormats {
    fn new(docx: &Docx) -> Self {
        let mut lists = ListFormats::default();
        let Some(numbering) = &docx.numbering else {
            return lists;
        };

        for abs_num in &numbering.abstract_numberings {
            let abs_id = abs_num.abstract_num_id.map(|id| id as i32).unwrap_or(0);
            for lvl in &abs_num.levels {
                let ilvl = lvl.i_level.map(|i| i as i32).unwrap_or(0);
                if let Some(format) = lvl.number_format.as_ref().map(|f| f.value.to_string()) {
                    lists.formats.insert((abs_id, ilvl), format);
                }
            }
        }
        for num in &numbering.numberings {
            if let (Some(num_id), Some(abs_ref)) = (num.num_id, &num.abstract_num_id) {
                if let Some(abs_id) = abs_ref.value {
                    lists.abstract_for_num.insert(num_id as i32, abs_id as i32);
                }
            }
        }
        lists
    }

    /// Whether items of `num_id` at `level` are numbered. Unknown lists are bullets.
    fn is_ordered(&self, num_id: i32, level: i32) -> bool {
        self.abstract_for_num
            .get(&num_id)
            .and_then(|abs_id| self.formats.get(&(*abs_id, level)))
            .map(|fmt| fmt != "bullet" && fmt != "none")
            .unwrap_or(false)
    }
}

struct Walker<'p> {
    package: &'p mut Package,
    rels: &'p HashMap<String, String>,
    lists: &'p ListFormats,
    image_slots: HashMap<String, usize>,
    images: Vec<ImagePart>,
}

fn heading_level(style_id: &str) -> Option<u8> {
    let normalized: String = style_id
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    if normalized == "title" {
        return Some(1);
    }
    normalized
        .strip_prefix("heading")
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=6).contains(n))
}

fn is_blank(inlines: &[Inline]) -> bool {
    inlines.iter().all(|inline| match inline {
        Inline::Text { text, .. } => text.trim().is_empty(),
        Inline::LineBreak => true,
        Inline::Link { children, .. } => is_blank(children),
        Inline::Image { .. } => false,
    })
}

fn push_text(out: &mut Vec<Inline>, text: &str, style: TextStyle) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text {
        text: last,
        style: last_style,
    }) = out.last_mut()
    {
        if *last_style == style {
            last.push_str(text);
            return;
        }
    }
    out.push(Inline::Text {
        text: text.to_string(),
        style,
    });
}

fn run_style(run: &Run<'_>) -> TextStyle {
    let Some(props) = &run.property else {
        return TextStyle::default();
    };
    TextStyle {
        bold: props
            .bold
            .as_ref()
            .map(|b| b.value.unwrap_or(true))
            .unwrap_or(false),
        italic: props
            .italics
            .as_ref()
            .map(|i| i.value.unwrap_or(true))
            .unwrap_or(false),
        strike: props
            .strike
            .as_ref()
            .map(|s| s.value.unwrap_or(true))
            .unwrap_or(false),
    }
}

/// Relationship ids of the pictures inside a DrawingML object.
fn drawing_embeds(drawing: &Drawing) -> Vec<String> {
    let mut embeds = Vec::new();
    let graphics = drawing
        .inline
        .iter()
        .filter_map(|inline| inline.graphic.as_ref())
        .chain(drawing.anchor.iter().filter_map(|anchor| anchor.graphic.as_ref()));
    for graphic in graphics {
        for pic in &graphic.data.children {
            let embed = pic.fill.blip.embed.to_string();
            if !embed.is_empty() {
                embeds.push(embed);
            }
        }
    }
    embeds
}

/// Relationship ids of VML `imagedata` in a legacy picture.
fn pict_ids(pict: &Pict) -> Vec<String> {
    let shape_id = pict
        .shape
        .as_ref()
        .and_then(|shape| shape.image_data.as_ref())
        .and_then(|data| data.id.as_ref())
        .map(|id| id.to_string());
    let rect_id = pict
        .rect
        .as_ref()
        .and_then(|rect| rect.image_data.as_ref())
        .and_then(|data| data.id.as_ref())
        .map(|id| id.to_string());
    shape_id.into_iter().chain(rect_id).collect()
}

impl Walker<'_> {
    fn body_content(
        &mut self,
        content: &BodyContent<'_>,
        out: &mut Vec<Block>,
    ) -> Result<(), ConversionError> {
        match content {
            BodyContent::Paragraph(para) => {
                if let Some(block) = self.paragraph(para)? {
                    out.push(block);
                }
            }
            BodyContent::Table(table) => {
                if let Some(block) = self.table(table)? {
                    out.push(block);
                }
            }
            BodyContent::Sdt(sdt) => {
                if let Some(sdt_content) = &sdt.content {
                    for child in &sdt_content.content {
                        self.body_content(child, out)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn paragraph(&mut self, para: &Paragraph<'_>) -> Result<Option<Block>, ConversionError> {
        let inlines = self.inlines(para)?;
        if is_blank(&inlines) {
            return Ok(None);
        }

        let style_id: Option<&str> = para
            .property
            .as_ref()
            .and_then(|p| p.style_id.as_ref())
            .map(|s| s.value.as_ref());
        if let Some(level) = style_id.and_then(heading_level) {
            return Ok(Some(Block::Heading { level, inlines }));
        }

        let numbering = para.property.as_ref().and_then(|p| p.numbering.as_ref());
        if let Some(num_pr) = numbering {
            let num_id = num_pr.id.as_ref().map(|id| id.value as i32);
            let level = num_pr.level.as_ref().map(|l| l.value as i32).unwrap_or(0);
            // numId 0 explicitly removes numbering.
            if let Some(num_id) = num_id.filter(|id| *id != 0) {
                return Ok(Some(Block::ListItem {
                    ordered: self.lists.is_ordered(num_id, level),
                    level: level.clamp(0, 8) as u8,
                    inlines,
                }));
            }
        }

        Ok(Some(Block::Paragraph(inlines)))
    }

    fn table(&mut self, table: &Table<'_>) -> Result<Option<Block>, ConversionError> {
        let mut rows = Vec::new();
        for row in &table.rows {
            let mut cells = Vec::new();
            for row_content in &row.cells {
                let TableRowContent::TableCell(cell) = row_content else {
                    continue;
                };
                let mut inlines: Vec<Inline> = Vec::new();
                for item in &cell.content {
                    let TableCellContent::Paragraph(para) = item else {
                        continue;
                    };
                    let para_inlines = self.inlines(para)?;
                    if is_blank(&para_inlines) {
                        continue;
                    }
                    if !inlines.is_empty() {
                        inlines.push(Inline::LineBreak);
                    }
                    inlines.extend(para_inlines);
                }
                cells.push(inlines);
            }
            if !cells.is_empty() {
                rows.push(cells);
            }
        }
        Ok(if rows.is_empty() {
            None
        } else {
            Some(Block::Table(rows))
        })
    }

    fn inlines(&mut self, para: &Paragraph<'_>) -> Result<Vec<Inline>, ConversionError> {
        let mut out = Vec::new();
        for content in &para.content {
            match content {
                ParagraphContent::Run(run) => self.run(run, &mut out)?,
                ParagraphContent::Link(hyperlink) => {
                    let mut children = Vec::new();
                    for run in &hyperlink.content {
                        self.run(run, &mut children)?;
                    }
                    let target = hyperlink
                        .id
                        .as_ref()
                        .and_then(|id| self.rels.get(&id.to_string()))
                        .filter(|target| is_external_target(target))
                        .cloned();
                    match target {
                        Some(target) if !is_blank(&children) => {
                            out.push(Inline::Link { target, children })
                        }
                        _ => out.extend(children),
                    }
                }
                ParagraphContent::Insertion(ins) => {
                    for run in &ins.runs {
                        self.run(run, &mut out)?;
                    }
                }
                ParagraphContent::SDT(sdt) => {
                    if let Some(sdt_content) = &sdt.content {
                        for child in &sdt_content.content {
                            if let BodyContent::Paragraph(inner) = child {
                                out.extend(self.inlines(inner)?);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(out)
    }

    fn run(&mut self, run: &Run<'_>, out: &mut Vec<Inline>) -> Result<(), ConversionError> {
        let style = run_style(run);
        for content in &run.content {
            match content {
                RunContent::Text(t) => push_text(out, &t.text, style),
                RunContent::Tab(_) => push_text(out, "\t", style),
                RunContent::Break(br) => {
                    if !matches!(br.ty, Some(BreakType::Page)) {
                        out.push(Inline::LineBreak);
                    }
                }
                RunContent::CarriageReturn(_) => out.push(Inline::LineBreak),
                RunContent::Drawing(drawing) => {
                    for rel_id in drawing_embeds(drawing) {
                        self.push_image(&rel_id, out)?;
                    }
                }
                RunContent::Pict(pict) => {
                    for rel_id in pict_ids(pict) {
                        self.push_image(&rel_id, out)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn push_image(&mut self, rel_id: &str, out: &mut Vec<Inline>) -> Result<(), ConversionError> {
        if let Some(slot) = self.image_slot(rel_id)? {
            out.push(Inline::Image {
                slot,
                alt: String::new(),
            });
        }
        Ok(())
    }

    /// Slot of the image behind relationship `rel_id`, loading the part on first use.
    /// The same part referenced again reuses its slot.
    fn image_slot(&mut self, rel_id: &str) -> Result<Option<usize>, ConversionError> {
        let Some(target) = self.rels.get(rel_id).filter(|t| !is_external_target(t)) else {
            tracing::debug!(rel_id, "Image relationship missing or external, skipping");
            return Ok(None);
        };
        let part_name = resolve_part(DOCUMENT_DIR, target);
        if let Some(slot) = self.image_slots.get(&part_name) {
            return Ok(Some(*slot));
        }
        let Some(bytes) = self.package.read_part(&part_name)? else {
            tracing::debug!(part = %part_name, "Image part missing from package, skipping");
            return Ok(None);
        };
        let slot = self.images.len();
        self.images.push(ImagePart {
            part_name: part_name.clone(),
            bytes,
        });
        self.image_slots.insert(part_name, slot);
        Ok(Some(slot))
    }
}
