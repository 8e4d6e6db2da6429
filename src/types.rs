use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One scanned page assigned a 1-based sequence position.
///
/// Created by the Scanner from the ordering inference; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// File name within the source folder (no path components).
    pub file: String,
    /// 1-based position within the publication.
    pub number: u32,
}

/// The ordered pages of one source folder, as determined by the Scanner.
///
/// Invariant: `pages` is sorted strictly ascending by `number` and numbering
/// is contiguous starting at 1. The Analyzer reads it, never mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSet {
    /// Absolute path of the source folder.
    pub folder: PathBuf,
    pub pages: Vec<Page>,
}

impl PageSet {
    /// Absolute path of the page's source file.
    pub fn page_path(&self, page: &Page) -> PathBuf {
        self.folder.join(&page.file)
    }

    /// Look up a page by its sequence number.
    pub fn page_by_number(&self, number: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.number == number)
    }
}

/// Publication identity derived from the cover page.
///
/// `months` keeps the backend's insertion order; values outside 1..=12 are
/// tolerated here and dropped at folder-name resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationMetadata {
    pub title: String,
    pub number: u32,
    #[serde(default)]
    pub months: Vec<u8>,
    pub year: i32,
}

/// A PageSet enriched with cover metadata, ready for the Copier.
///
/// `pages` is the originating PageSet's sequence, never re-sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub metadata: PublicationMetadata,
    pub pages: Vec<Page>,
    /// Source folder the pages are copied from.
    pub folder: PathBuf,
}

/// Table-of-contents subset returned by the content-index inference.
///
/// A non-empty `error` or an empty `entries` list means the scanned page was
/// not a usable summary page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentIndex {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub entries: Vec<ContentIndexEntry>,
}

impl ContentIndex {
    /// A usable index has no error and at least one entry.
    pub fn is_usable(&self) -> bool {
        self.error.is_empty() && !self.entries.is_empty()
    }
}

/// One logical section of the content index with its page references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentIndexEntry {
    pub title: String,
    #[serde(rename = "pageNumbers", default)]
    pub page_numbers: Vec<u32>,
}

/// Per-section review metadata derived from a referenced page.
///
/// Currently a terminal artifact: the Analyzer logs decoded records at debug
/// severity and drops them. Kept public so a writer stage can consume them
/// later without touching the Analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub title: String,
    #[serde(rename = "console")]
    pub platform: String,
    pub score: i32,
    #[serde(rename = "outOf")]
    pub score_max: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_set_lookup() {
        let set = PageSet {
            folder: PathBuf::from("/scans/A1"),
            pages: vec![
                Page {
                    file: "p1.jpg".to_string(),
                    number: 1,
                },
                Page {
                    file: "p2.jpg".to_string(),
                    number: 2,
                },
            ],
        };
        assert_eq!(set.page_by_number(2).unwrap().file, "p2.jpg");
        assert!(set.page_by_number(3).is_none());
        assert_eq!(
            set.page_path(&set.pages[0]),
            PathBuf::from("/scans/A1/p1.jpg")
        );
    }

    #[test]
    fn test_metadata_decodes_backend_shape() {
        let meta: PublicationMetadata =
            serde_json::from_str(r#"{"title":"Tilt","months":[6],"year":1991,"number":42}"#)
                .unwrap();
        assert_eq!(meta.title, "Tilt");
        assert_eq!(meta.months, vec![6]);
        assert_eq!(meta.year, 1991);
        assert_eq!(meta.number, 42);
    }

    #[test]
    fn test_metadata_months_default_empty() {
        let meta: PublicationMetadata =
            serde_json::from_str(r#"{"title":"Tilt","year":1991,"number":42}"#).unwrap();
        assert!(meta.months.is_empty());
    }

    #[test]
    fn test_content_index_usability() {
        let empty = ContentIndex::default();
        assert!(!empty.is_usable());

        let errored: ContentIndex =
            serde_json::from_str(r#"{"error":"no summary found","entries":[]}"#).unwrap();
        assert!(!errored.is_usable());

        let usable: ContentIndex = serde_json::from_str(
            r#"{"error":"","entries":[{"title":"Tests","pageNumbers":[12,14]}]}"#,
        )
        .unwrap();
        assert!(usable.is_usable());
        assert_eq!(usable.entries[0].page_numbers, vec![12, 14]);
    }

    #[test]
    fn test_review_record_decodes_backend_keys() {
        let record: ReviewRecord = serde_json::from_str(
            r#"{"title":"Sonic","console":"Megadrive","score":17,"outOf":20}"#,
        )
        .unwrap();
        assert_eq!(record.platform, "Megadrive");
        assert_eq!(record.score_max, 20);
    }
}
