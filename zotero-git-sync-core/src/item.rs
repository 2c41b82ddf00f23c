//! Bibliographic items and their mapping from Zotero Web API JSON.

use serde::Deserialize;
use std::fmt;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// One author name, as Zotero stores it: either split into family/given
/// or as a single field (institutions, mononyms).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub family: String,
    pub given: Option<String>,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.given.as_deref() {
            Some(given) if !given.is_empty() => write!(f, "{}, {}", self.family, given),
            _ => f.write_str(&self.family),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Doi(String),
    Isbn(String),
    Url(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Doi(doi) => write!(f, "https://doi.org/{doi}"),
            Identifier::Isbn(isbn) => write!(f, "ISBN {isbn}"),
            Identifier::Url(url) => f.write_str(url),
        }
    }
}

/// The primary attachment Zotero links from a top-level item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub key: String,
    pub content_type: String,
}

impl Attachment {
    pub fn is_pdf(&self) -> bool {
        self.content_type == PDF_CONTENT_TYPE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibliographicItem {
    pub key: String,
    pub item_type: String,
    pub title: String,
    pub authors: Vec<Author>,
    pub year: Option<String>,
    pub venue: Option<String>,
    pub identifier: Option<Identifier>,
    pub attachment: Option<Attachment>,
}

impl BibliographicItem {
    /// The attachment, if it is a PDF.
    pub fn pdf_attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref().filter(|a| a.is_pdf())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ZoteroItem {
    pub key: String,
    #[serde(default)]
    pub links: ZoteroLinks,
    #[serde(default)]
    pub meta: ZoteroMeta,
    pub data: ZoteroData,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ZoteroLinks {
    pub attachment: Option<ZoteroAttachmentLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ZoteroAttachmentLink {
    pub href: String,
    #[serde(default)]
    pub attachment_type: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ZoteroMeta {
    pub parsed_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ZoteroData {
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub creators: Vec<ZoteroCreator>,
    #[serde(default)]
    pub publication_title: Option<String>,
    #[serde(default)]
    pub proceedings_title: Option<String>,
    #[serde(default)]
    pub book_title: Option<String>,
    #[serde(default)]
    pub conference_name: Option<String>,
    #[serde(default)]
    pub website_title: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default, rename = "DOI")]
    pub doi: Option<String>,
    #[serde(default, rename = "ISBN")]
    pub isbn: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ZoteroCreator {
    #[serde(default)]
    pub creator_type: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Year from Zotero's `parsedDate`, which may be `2020`, `2020-05`,
/// `2020-05-01` or, for some imports, `05/01/2020`.
pub fn year_from_parsed_date(date: &str) -> Option<String> {
    let year = if date.contains('/') {
        date.rsplit('/').next().unwrap_or_default()
    } else if date.contains('-') {
        date.split('-').next().unwrap_or_default()
    } else {
        date
    };
    let year = year.trim();
    (!year.is_empty()).then(|| year.to_string())
}

impl From<ZoteroItem> for BibliographicItem {
    fn from(item: ZoteroItem) -> Self {
        let data = item.data;

        let authors = data
            .creators
            .into_iter()
            .filter(|c| c.creator_type == "author")
            .filter_map(|c| match non_empty(c.last_name) {
                Some(family) => Some(Author {
                    family,
                    given: non_empty(c.first_name),
                }),
                None => non_empty(c.name).map(|family| Author {
                    family,
                    given: None,
                }),
            })
            .collect();

        let venue = [
            data.publication_title,
            data.proceedings_title,
            data.book_title,
            data.conference_name,
            data.website_title,
            data.publisher,
        ]
        .into_iter()
        .find_map(non_empty);

        let identifier = non_empty(data.doi)
            .map(Identifier::Doi)
            .or_else(|| non_empty(data.isbn).map(Identifier::Isbn))
            .or_else(|| non_empty(data.url).map(Identifier::Url));

        let attachment = item.links.attachment.and_then(|link| {
            let key = link
                .href
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string();
            (!key.is_empty()).then_some(Attachment {
                key,
                content_type: link.attachment_type,
            })
        });

        BibliographicItem {
            key: item.key,
            item_type: data.item_type,
            title: data.title.trim().to_string(),
            authors,
            year: item.meta.parsed_date.as_deref().and_then(year_from_parsed_date),
            venue,
            identifier,
            attachment,
        }
    }
}
