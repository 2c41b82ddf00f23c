//! File-name normalization for mirrored attachments.

use regex::Regex;
use std::sync::OnceLock;

use crate::item::BibliographicItem;

const SEPARATORS: &[char] = &[
    '\n', '"', '\'', '.', ':', ';', '!', '?', '(', ')', ' ', '/', '\\',
];

fn dash_runs() -> &'static Regex {
    static DASHES: OnceLock<Regex> = OnceLock::new();
    DASHES.get_or_init(|| Regex::new(r"-+").expect("static regex"))
}

/// Turns free text into a lowercase ASCII slug: separators become `-`,
/// runs of `-` collapse, and one trailing `-` is dropped.
pub fn normalize(name: &str) -> String {
    let ascii = deunicode::deunicode(name).to_lowercase();
    let dashed: String = ascii
        .chars()
        .map(|c| if SEPARATORS.contains(&c) { '-' } else { c })
        .collect();
    let collapsed = dash_runs().replace_all(&dashed, "-");
    collapsed
        .strip_suffix('-')
        .unwrap_or(&collapsed)
        .to_string()
}

/// `<first author family name><yy>-<title>.pdf`, e.g. `vaswani17-attention-is-all-you-need.pdf`.
pub fn attachment_file_name(item: &BibliographicItem) -> String {
    let author = item
        .authors
        .first()
        .map(|a| a.family.as_str())
        .unwrap_or("noauthor");
    let year = item.year.as_deref().unwrap_or_default();
    let short_year = if year.chars().count() > 2 {
        let skip = year.chars().count() - 2;
        year.chars().skip(skip).collect::<String>()
    } else {
        year.to_string()
    };
    format!(
        "{}{}-{}.pdf",
        normalize(author),
        short_year,
        normalize(&item.title)
    )
}
