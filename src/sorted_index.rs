//! Merges per-worker batches into one byte-sorted CDXJ line set and one page
//! list, with insert-if-absent semantics so first writer wins on either.

use std::collections::BTreeSet;

use crate::{cdxj::CdxjEntry, page::PageRecord};

#[derive(Debug, Default)]
pub struct SortedIndex {
    lines: BTreeSet<CdxjLine>,
    pages: Vec<PageRecord>,
    seen_page_urls: std::collections::HashSet<String>,
}

/// Wraps a [`CdxjEntry`] so it orders by its `<surt> <timestamp>` key while
/// still carrying the full rendered line.
#[derive(Debug, Clone, Eq, PartialEq)]
struct CdxjLine {
    key: String,
    line: String,
}

impl Ord for CdxjLine {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

impl PartialOrd for CdxjLine {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl SortedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a CDXJ entry. If an entry with the same sort key is already
    /// present, this one is discarded — first writer wins.
    pub fn insert_entry(&mut self, entry: CdxjEntry) {
        let key = entry.sort_key();
        let candidate = CdxjLine {
            key: key.clone(),
            line: entry.line(),
        };
        if !self.lines.iter().any(|existing| existing.key == key) {
            self.lines.insert(candidate);
        }
    }

    /// Merges another index's already-sorted lines and pages into this one,
    /// preserving first-writer-wins semantics across workers.
    pub fn merge(&mut self, other: SortedIndex) {
        for line in other.lines {
            if !self.lines.iter().any(|existing| existing.key == line.key) {
                self.lines.insert(line);
            }
        }
        for page in other.pages {
            self.insert_page(page);
        }
    }

    pub fn insert_page(&mut self, page: PageRecord) {
        if self.seen_page_urls.insert(page.url.clone()) {
            self.pages.push(page);
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.line.as_str())
    }

    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<PageRecord> {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warc::{HeaderMap, WarcRecord};

    fn entry(url: &str, date: &str) -> CdxjEntry {
        let mut headers = HeaderMap::new();
        headers.insert("WARC-Target-URI", url);
        headers.insert("WARC-Date", date);
        let record = WarcRecord {
            warc_type: "response".to_owned(),
            headers,
            payload: b"x".to_vec(),
            offset: 0,
            length: 1,
            filename: "a.warc.gz".to_owned(),
            http_status: Some(200),
            http_content_type: Some("text/html".to_owned()),
            http_method: None,
        };
        CdxjEntry::from_record(&record).unwrap()
    }

    #[test]
    fn first_writer_wins_on_duplicate_key() {
        let mut index = SortedIndex::new();
        index.insert_entry(entry("http://example.com/", "2021-01-01T00:00:00Z"));
        index.insert_entry(entry("http://example.com/", "2021-01-01T00:00:00Z"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn merge_preserves_sort_order() {
        let mut a = SortedIndex::new();
        a.insert_entry(entry("http://b.com/", "2021-01-01T00:00:00Z"));
        let mut b = SortedIndex::new();
        b.insert_entry(entry("http://a.com/", "2021-01-01T00:00:00Z"));
        a.merge(b);
        let lines: Vec<&str> = a.lines().collect();
        assert!(lines[0].starts_with("com,a)"));
        assert!(lines[1].starts_with("com,b)"));
    }
}
