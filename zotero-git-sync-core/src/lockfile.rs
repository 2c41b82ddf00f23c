//! The `.zotero` lockfile: which attachment lives under which file name.
//!
//! One `<attachment key> <file name>` pair per line, in collection order.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Result, SyncError};

pub const LOCKFILE_NAME: &str = ".zotero";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEntry {
    pub attachment_key: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lockfile {
    entries: Vec<LockEntry>,
}

impl Lockfile {
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(file_name), None) => entries.push(LockEntry {
                    attachment_key: key.to_string(),
                    file_name: file_name.to_string(),
                }),
                _ => {
                    return Err(SyncError::Lockfile {
                        line: index + 1,
                        content: line.to_string(),
                    })
                }
            }
        }
        Ok(Self { entries })
    }

    /// Reads the lockfile; a missing file is an empty lockfile.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(SyncError::io(path, e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render()).map_err(|e| SyncError::io(path, e))
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{} {}\n", e.attachment_key, e.file_name))
            .collect()
    }

    /// Appends an entry, replacing an earlier one for the same key.
    pub fn insert(&mut self, attachment_key: impl Into<String>, file_name: impl Into<String>) {
        let attachment_key = attachment_key.into();
        self.entries.retain(|e| e.attachment_key != attachment_key);
        self.entries.push(LockEntry {
            attachment_key,
            file_name: file_name.into(),
        });
    }

    pub fn file_name(&self, attachment_key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.attachment_key == attachment_key)
            .map(|e| e.file_name.as_str())
    }

    pub fn entries(&self) -> &[LockEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_and_render_keep_order() {
        let text = "KEY2 b.pdf\n\nKEY1 a.pdf\n";
        let lock = Lockfile::parse(text).unwrap();
        assert_eq!(lock.file_name("KEY1"), Some("a.pdf"));
        assert_eq!(lock.file_name("KEY3"), None);
        assert_eq!(lock.render(), "KEY2 b.pdf\nKEY1 a.pdf\n");
    }

    #[test]
    fn malformed_line_is_reported_with_number() {
        let err = Lockfile::parse("KEY1 a.pdf\nbroken\n").unwrap_err();
        match err {
            SyncError::Lockfile { line, content } => {
                assert_eq!(line, 2);
                assert_eq!(content, "broken");
            }
            other => panic!("expected Lockfile error, got {other:?}"),
        }
        assert!(Lockfile::parse("A b.pdf extra\n").is_err());
    }

    #[test]
    fn insert_replaces_existing_key() {
        let mut lock = Lockfile::default();
        lock.insert("A", "old.pdf");
        lock.insert("B", "b.pdf");
        lock.insert("A", "new.pdf");
        assert_eq!(lock.render(), "B b.pdf\nA new.pdf\n");
    }

    #[test]
    fn missing_file_loads_empty_and_save_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LOCKFILE_NAME);
        assert!(Lockfile::load(&path).unwrap().is_empty());

        let mut lock = Lockfile::default();
        lock.insert("A", "a.pdf");
        lock.save(&path).unwrap();
        assert_eq!(Lockfile::load(&path).unwrap(), lock);
    }
}
