//! Page inference: builds the `pages.jsonl` entries, either by sniffing
//! HTML responses as they're indexed or by accepting a caller-supplied list.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::{clock::IdGenerator, warc::WarcRecord};

const TITLE_SCAN_LIMIT: usize = 128 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    pub id: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub ts: String,
}

/// Accumulates page entries across a run. Once a page is added manually,
/// automatic sniffing from response records stops: the caller has taken
/// ownership of the page list.
pub struct PageInferrer {
    id_generator: Arc<dyn IdGenerator>,
    auto_detect: bool,
    seen: HashSet<String>,
    pages: Vec<PageRecord>,
}

impl PageInferrer {
    pub fn new(id_generator: Arc<dyn IdGenerator>) -> Self {
        Self {
            id_generator,
            auto_detect: true,
            seen: HashSet::new(),
            pages: Vec::new(),
        }
    }

    /// Considers `record` for automatic page detection. No-op once a manual
    /// page has been added, or if `record` doesn't look like a page load.
    pub fn observe(&mut self, record: &WarcRecord) {
        if !self.auto_detect || !looks_like_page(record) {
            return;
        }
        let Some(url) = record.warc_target_uri() else {
            return;
        };
        if !self.seen.insert(url.to_owned()) {
            return;
        }

        let title = extract_title(&record.payload);
        self.pages.push(PageRecord {
            id: hex_id(self.id_generator.next_id()),
            url: url.to_owned(),
            title,
            ts: record.warc_date().unwrap_or_default().to_owned(),
        });
    }

    /// Disables automatic detection without adding a page, so a worker whose
    /// orchestrator supplied manual pages never races to auto-detect its own.
    pub fn disable_auto_detect(&mut self) {
        self.auto_detect = false;
    }

    /// Adds a caller-specified page, disabling further automatic detection.
    /// The first entry for a given URL wins; later duplicates are ignored.
    pub fn add_page(&mut self, url: impl Into<String>, title: Option<String>, ts: impl Into<String>) {
        self.auto_detect = false;
        let url = url.into();
        if !self.seen.insert(url.clone()) {
            return;
        }
        self.pages.push(PageRecord {
            id: hex_id(self.id_generator.next_id()),
            url,
            title,
            ts: ts.into(),
        });
    }

    pub fn into_pages(self) -> Vec<PageRecord> {
        self.pages
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn looks_like_page(record: &WarcRecord) -> bool {
    if !record.is_response_like() {
        return false;
    }
    let status_ok = matches!(record.http_status, Some(200..=299));
    let mime_ok = record
        .http_content_type
        .as_deref()
        .is_some_and(|mime| mime.starts_with("text/html"));
    let method_ok = matches!(record.http_method.as_deref(), None | Some("GET"));
    status_ok && mime_ok && method_ok
}

fn hex_id(bytes: [u8; 16]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Pulls the first `<title>` element out of the leading 128KiB of `payload`
/// and collapses its inner whitespace to single spaces.
fn extract_title(payload: &[u8]) -> Option<String> {
    let scan_len = payload.len().min(TITLE_SCAN_LIMIT);
    let text = String::from_utf8_lossy(&payload[..scan_len]);
    let lower = text.to_ascii_lowercase();

    let open = lower.find("<title")?;
    let open_end = lower[open..].find('>')? + open + 1;
    let close = lower[open_end..].find("</title>")? + open_end;

    let raw_title = &text[open_end..close];
    let collapsed = raw_title.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}
