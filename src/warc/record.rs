//! In-memory view over one WARC record.

/// Case-insensitive header multimap, preserving insertion order.
#[derive(Debug, Default, Clone)]
pub struct HeaderMap(Vec<(String, String)>);

impl HeaderMap {
    pub fn new() -> Self {
        Self(Vec::with_capacity(16))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Returns the first value for `name`, matched ASCII case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// A view over one WARC record: headers, payload, and the byte range of the
/// enclosing gzip member (or the raw record, for plain WARCs) within the
/// source file.
#[derive(Debug, Clone)]
pub struct WarcRecord {
    pub warc_type: String,
    pub headers: HeaderMap,
    pub payload: Vec<u8>,
    /// Byte offset of the enclosing gzip member (gzip-framed) or of the
    /// record itself (plain WARC) within the source file.
    pub offset: u64,
    /// Compressed length of the enclosing gzip member, or the length of the
    /// uncompressed record, matching `offset`'s frame of reference.
    pub length: u64,
    /// Basename of the file this record was read from.
    pub filename: String,
    /// HTTP status line code, when the payload is an HTTP response/revisit.
    pub http_status: Option<u16>,
    /// HTTP `Content-Type`, when the payload is an HTTP message.
    pub http_content_type: Option<String>,
    /// HTTP request method, when this record is itself a `request` record.
    pub http_method: Option<String>,
}

impl WarcRecord {
    pub fn warc_target_uri(&self) -> Option<&str> {
        self.headers.get("WARC-Target-URI")
    }

    pub fn warc_date(&self) -> Option<&str> {
        self.headers.get("WARC-Date")
    }

    pub fn warc_payload_digest(&self) -> Option<&str> {
        self.headers.get("WARC-Payload-Digest")
    }

    pub fn is_response_like(&self) -> bool {
        self.warc_type == "response" || self.warc_type == "revisit"
    }
}
