//! Markdown rendering of [`DocumentAst`] blocks.

use super::ast::{Block, Inline, TextStyle};

/// Escape characters that would otherwise start markdown syntax inside text.
pub fn escape_markdown_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '~' | '|' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn escape_markdown_link_destination(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            ' ' => escaped.push_str("%20"),
            '\\' | '(' | ')' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Keep a paragraph from being read as a heading, quote, list item or rule.
fn escape_line_start(line: String) -> String {
    let trimmed = line.trim_start();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    let needs_escape = trimmed.starts_with('#')
        || trimmed.starts_with("- ")
        || trimmed.starts_with("+ ")
        || trimmed.starts_with("---")
        || trimmed.starts_with("===")
        || (digits > 0 && trimmed[digits..].starts_with(". "));
    if !needs_escape {
        return line;
    }
    let indent = line.len() - trimmed.len();
    if digits > 0 {
        format!("{}{}\\{}", &line[..indent], &trimmed[..digits], &trimmed[digits..])
    } else {
        format!("{}\\{}", &line[..indent], trimmed)
    }
}

/// Wrap styled text in emphasis markers, keeping surrounding whitespace outside them.
fn styled(text: &str, style: TextStyle) -> String {
    let escaped = escape_markdown_text(text);
    if style == TextStyle::default() || escaped.trim().is_empty() {
        return escaped;
    }
    let core = escaped.trim();
    let lead = &escaped[..escaped.len() - escaped.trim_start().len()];
    let trail = &escaped[escaped.trim_end().len()..];

    let mut open = String::new();
    if style.bold {
        open.push_str("**");
    }
    if style.italic {
        open.push('*');
    }
    if style.strike {
        open.push_str("~~");
    }
    let close: String = open.chars().rev().collect();
    format!("{}{}{}{}{}", lead, open, core, close, trail)
}

struct Renderer<'u> {
    image_urls: &'u [String],
    /// Inside a table cell, where line breaks become `<br>`.
    in_cell: bool,
}

impl Renderer<'_> {
    fn inlines(&self, inlines: &[Inline]) -> String {
        let mut out = String::new();
        for inline in inlines {
            match inline {
                Inline::Text { text, style } => out.push_str(&styled(text, *style)),
                Inline::Link { target, children } => {
                    out.push('[');
                    out.push_str(self.inlines(children).trim());
                    out.push_str("](");
                    out.push_str(&escape_markdown_link_destination(target));
                    out.push(')');
                }
                Inline::Image { slot, alt } => {
                    if let Some(url) = self.image_urls.get(*slot) {
                        out.push_str("![");
                        out.push_str(&escape_markdown_text(alt));
                        out.push_str("](");
                        out.push_str(&escape_markdown_link_destination(url));
                        out.push(')');
                    }
                }
                Inline::LineBreak => {
                    if self.in_cell {
                        out.push_str("<br>");
                    } else {
                        out.push_str("\\\n");
                    }
                }
            }
        }
        out
    }

    fn table(&self, rows: &[Vec<Vec<Inline>>]) -> String {
        let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0).max(1);
        let cell_renderer = Renderer {
            image_urls: self.image_urls,
            in_cell: true,
        };
        let render_row = |row: &[Vec<Inline>]| -> String {
            let mut cells: Vec<String> = row
                .iter()
                .map(|cell| {
                    cell_renderer
                        .inlines(cell)
                        .replace('\n', " ")
                        .trim()
                        .to_string()
                })
                .collect();
            cells.resize(columns, String::new());
            format!("| {} |", cells.join(" | "))
        };

        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(render_row(rows[0].as_slice()));
        lines.push(format!("|{}", " --- |".repeat(columns)));
        for row in &rows[1..] {
            lines.push(render_row(row.as_slice()));
        }
        lines.join("\n")
    }
}

/// Render blocks to GitHub-flavored markdown. `image_urls[slot]` is the URL for each image.
pub fn render_markdown(blocks: &[Block], image_urls: &[String]) -> String {
    let renderer = Renderer {
        image_urls,
        in_cell: false,
    };
    let mut out = String::new();
    let mut previous_was_list = false;

    for block in blocks {
        let (rendered, is_list) = match block {
            Block::Heading { level, inlines } => (
                format!(
                    "{} {}",
                    "#".repeat(*level as usize),
                    renderer.inlines(inlines).trim()
                ),
                false,
            ),
            Block::Paragraph(inlines) => {
                (escape_line_start(renderer.inlines(inlines).trim().to_string()), false)
            }
            Block::ListItem {
                ordered,
                level,
                inlines,
            } => {
                let marker = if *ordered { "1." } else { "-" };
                (
                    format!(
                        "{}{} {}",
                        "   ".repeat(*level as usize),
                        marker,
                        renderer.inlines(inlines).trim()
                    ),
                    true,
                )
            }
            Block::Table(rows) if !rows.is_empty() => (renderer.table(rows), false),
            Block::Table(_) => continue,
        };

        if !out.is_empty() {
            // Consecutive list items form one tight list.
            out.push_str(if previous_was_list && is_list { "\n" } else { "\n\n" });
        }
        out.push_str(&rendered);
        previous_was_list = is_list;
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text {
            text: s.to_string(),
            style: TextStyle::default(),
        }
    }

    #[test]
    fn test_escape_markdown_text() {
        assert_eq!(escape_markdown_text("a*b_c[d]"), "a\\*b\\_c\\[d\\]");
    }

    #[test]
    fn test_escape_line_start() {
        assert_eq!(escape_line_start("# not a heading".to_string()), "\\# not a heading");
        assert_eq!(escape_line_start("1. not a list".to_string()), "1\\. not a list");
        assert_eq!(escape_line_start("plain".to_string()), "plain");
    }

    #[test]
    fn test_styled_keeps_whitespace_outside_markers() {
        let style = TextStyle {
            bold: true,
            italic: true,
            strike: false,
        };
        assert_eq!(styled(" hello ", style), " ***hello*** ");
        assert_eq!(styled("   ", style), "   ");
    }

    #[test]
    fn test_render_blocks() {
        let blocks = vec![
            Block::Heading {
                level: 2,
                inlines: vec![text("Summary")],
            },
            Block::Paragraph(vec![
                text("See "),
                Inline::Link {
                    target: "https://example.com/a b".to_string(),
                    children: vec![text("docs")],
                },
                Inline::LineBreak,
                Inline::Image {
                    slot: 0,
                    alt: "chart".to_string(),
                },
            ]),
            Block::ListItem {
                ordered: false,
                level: 0,
                inlines: vec![text("one")],
            },
            Block::ListItem {
                ordered: true,
                level: 1,
                inlines: vec![text("two")],
            },
        ];
        let urls = vec!["https://cdn.test/x.png".to_string()];
        let markdown = render_markdown(&blocks, &urls);
        assert_eq!(
            markdown,
            "## Summary\n\nSee [docs](https://example.com/a%20b)\\\n![chart](https://cdn.test/x.png)\n\n- one\n   1. two\n"
        );
    }

    #[test]
    fn test_render_table_pads_rows() {
        let blocks = vec![Block::Table(vec![
            vec![vec![text("A")], vec![text("B")]],
            vec![vec![text("1|2")]],
        ])];
        let markdown = render_markdown(&blocks, &[]);
        assert_eq!(markdown, "| A | B |\n| --- | --- |\n| 1\\|2 |  |\n");
    }
}
