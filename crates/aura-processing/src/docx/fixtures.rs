//! Minimal `.docx` writer for tests.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
const REL_NUMBERING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn put(zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, data: &[u8], options: FileOptions) {
    zip.start_file(name, options).expect("start zip entry");
    zip.write_all(data).expect("write zip entry");
}

fn run(text: &str, bold: bool, italic: bool) -> String {
    let mut props = String::new();
    if bold {
        props.push_str("<w:b/>");
    }
    if italic {
        props.push_str("<w:i/>");
    }
    let rpr = if props.is_empty() {
        String::new()
    } else {
        format!("<w:rPr>{}</w:rPr>", props)
    };
    format!(
        r#"<w:r>{}<w:t xml:space="preserve">{}</w:t></w:r>"#,
        rpr,
        escape(text)
    )
}

/// Builds a Word document body paragraph by paragraph.
#[derive(Default)]
pub struct DocxBuilder {
    body: String,
    rels: Vec<(String, String, String, bool)>,
    media: Vec<(String, Vec<u8>)>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_rel(&mut self, rel_type: &str, target: &str, external: bool) -> String {
        if let Some((id, _, _, _)) = self
            .rels
            .iter()
            .find(|(_, t, target_existing, _)| t == rel_type && target_existing == target)
        {
            return id.clone();
        }
        let id = format!("rId{}", self.rels.len() + 10);
        self.rels
            .push((id.clone(), rel_type.to_string(), target.to_string(), external));
        id
    }

    pub fn heading(mut self, level: u8, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading{}"/></w:pPr>{}</w:p>"#,
            level,
            run(text, false, false)
        ));
        self
    }

    pub fn paragraph(self, text: &str) -> Self {
        self.paragraph_runs(&[(text, false, false)])
    }

    /// Runs of `(text, bold, italic)`.
    pub fn paragraph_runs(mut self, runs: &[(&str, bool, bool)]) -> Self {
        let runs: String = runs.iter().map(|(t, b, i)| run(t, *b, *i)).collect();
        self.body.push_str(&format!("<w:p>{}</w:p>", runs));
        self
    }

    /// A paragraph holding one inline picture of `word/media/{name}`.
    pub fn image(mut self, name: &str, bytes: &[u8]) -> Self {
        let target = format!("media/{}", name);
        if !self.media.iter().any(|(n, _)| n == name) {
            self.media.push((name.to_string(), bytes.to_vec()));
        }
        let rel_id = self.add_rel(REL_IMAGE, &target, false);
        let picture_id = self.body.matches("<wp:docPr").count() + 1;
        self.body.push_str(&format!(
            concat!(
                r#"<w:p><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
                r#"<wp:extent cx="952500" cy="952500"/><wp:effectExtent l="0" t="0" r="0" b="0"/>"#,
                r#"<wp:docPr id="{id}" name="Picture {id}"/>"#,
                r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
                r#"<a:graphic><a:graphicData uri="{pic}"><pic:pic>"#,
                r#"<pic:nvPicPr><pic:cNvPr id="0" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
                r#"<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
                r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="952500" cy="952500"/></a:xfrm>"#,
                r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
                r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
            ),
            id = picture_id,
            pic = PIC_NS,
            name = escape(name),
            rel = rel_id
        ));
        self
    }

    pub fn bullet(mut self, text: &str) -> Self {
        self.add_rel(REL_NUMBERING, "numbering.xml", false);
        self.body.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="ListParagraph"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr>{}</w:p>"#,
            run(text, false, false)
        ));
        self
    }

    pub fn numbered(mut self, text: &str) -> Self {
        self.add_rel(REL_NUMBERING, "numbering.xml", false);
        self.body.push_str(&format!(
            r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="2"/></w:numPr></w:pPr>{}</w:p>"#,
            run(text, false, false)
        ));
        self
    }

    pub fn link(mut self, text: &str, url: &str) -> Self {
        let rel_id = self.add_rel(REL_HYPERLINK, url, true);
        self.body.push_str(&format!(
            r#"<w:p><w:hyperlink r:id="{}">{}</w:hyperlink></w:p>"#,
            rel_id,
            run(text, false, false)
        ));
        self
    }

    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        let columns = rows.iter().map(|r| r.len()).max().unwrap_or(1);
        let mut xml = String::from(
            r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid>"#,
        );
        xml.push_str(&r#"<w:gridCol w:w="4000"/>"#.repeat(columns));
        xml.push_str("</w:tblGrid>");
        for row in rows {
            xml.push_str("<w:tr>");
            for cell in row.iter() {
                xml.push_str(&format!(
                    r#"<w:tc><w:tcPr><w:tcW w:w="4000" w:type="dxa"/></w:tcPr><w:p>{}</w:p></w:tc>"#,
                    run(cell, false, false)
                ));
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl>");
        self.body.push_str(&xml);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        put(
            &mut zip,
            "[Content_Types].xml",
            br#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#,
            options,
        );
        put(
            &mut zip,
            "_rels/.rels",
            br#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#,
            options,
        );

        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="{}" xmlns:r="{}" xmlns:wp="{}" xmlns:a="{}" xmlns:pic="{}"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            W_NS, R_NS, WP_NS, A_NS, PIC_NS, self.body
        );
        put(&mut zip, "word/document.xml", document.as_bytes(), options);

        let rels: String = self
            .rels
            .iter()
            .map(|(id, rel_type, target, external)| {
                format!(
                    r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                    id,
                    rel_type,
                    escape(target),
                    if *external { r#" TargetMode="External""# } else { "" }
                )
            })
            .collect();
        let rels_xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            rels
        );
        put(&mut zip, "word/_rels/document.xml.rels", rels_xml.as_bytes(), options);

        if self.rels.iter().any(|(_, t, _, _)| t == REL_NUMBERING) {
            let numbering = format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<w:numbering xmlns:w="{}"><w:abstractNum w:abstractNumId="0"><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="-"/><w:lvlJc w:val="left"/></w:lvl></w:abstractNum><w:abstractNum w:abstractNumId="1"><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/><w:lvlJc w:val="left"/></w:lvl></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num><w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num></w:numbering>"#,
                W_NS
            );
            put(&mut zip, "word/numbering.xml", numbering.as_bytes(), options);
        }

        for (name, bytes) in &self.media {
            put(&mut zip, &format!("word/media/{}", name), bytes, options);
        }

        zip.finish().expect("finish zip").into_inner()
    }
}
