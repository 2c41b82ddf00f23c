//! Markdown rendering of the bibliography document.

use regex::Regex;
use std::sync::OnceLock;

use crate::item::BibliographicItem;
use crate::normalize::attachment_file_name;

pub const DOCUMENT_TITLE: &str = "Bibliography";

/// The rendered bibliography, ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub text: String,
    pub entries: usize,
}

fn line_breaks() -> &'static Regex {
    static BREAKS: OnceLock<Regex> = OnceLock::new();
    BREAKS.get_or_init(|| Regex::new(r"[ \t]*[\r\n]+[ \t]*").expect("static regex"))
}

/// Escapes inline markdown and folds line breaks into single spaces so an
/// entry always stays on one line.
fn escape_markdown(text: &str) -> String {
    let single_line = line_breaks().replace_all(text, " ");
    let mut out = String::with_capacity(single_line.len());
    for c in single_line.chars() {
        if matches!(c, '\\' | '*' | '_' | '[' | ']' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Percent-encodes the characters that would end or corrupt a relative link.
fn link_target(file_name: &str) -> String {
    let mut out = String::with_capacity(file_name.len());
    for c in file_name.chars() {
        match c {
            '%' => out.push_str("%25"),
            '#' => out.push_str("%23"),
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            c => out.push(c),
        }
    }
    out
}

/// One list entry: `- Authors (Year). *Title*. Venue. Identifier [PDF](file)`.
pub fn render_entry(item: &BibliographicItem) -> String {
    let mut line = String::from("- ");

    if !item.authors.is_empty() {
        let authors = item
            .authors
            .iter()
            .map(|a| escape_markdown(&a.to_string()))
            .collect::<Vec<_>>()
            .join("; ");
        line.push_str(&authors);
        line.push(' ');
    }
    line.push_str(&format!("({}). ", item.year.as_deref().unwrap_or("n.d.")));

    let title = if item.title.is_empty() {
        "Untitled"
    } else {
        item.title.as_str()
    };
    line.push_str(&format!("*{}*.", escape_markdown(title)));

    if let Some(venue) = &item.venue {
        line.push_str(&format!(" {}.", escape_markdown(venue)));
    }
    if let Some(identifier) = &item.identifier {
        line.push_str(&format!(" {}", line_breaks().replace_all(&identifier.to_string(), " ")));
    }
    if item.pdf_attachment().is_some() {
        line.push_str(&format!(" [PDF]({})", link_target(&attachment_file_name(item))));
    }

    line
}

/// Renders all items in the given order. An empty list yields a
/// header-only document.
pub fn render_document(items: &[BibliographicItem]) -> ExportDocument {
    let mut text = format!("# {DOCUMENT_TITLE}\n");
    if !items.is_empty() {
        text.push('\n');
        for item in items {
            text.push_str(&render_entry(item));
            text.push('\n');
        }
    }
    ExportDocument {
        text,
        entries: items.len(),
    }
}
