//! Builds one CDXJ line from an indexed WARC record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha1::{Digest, Sha1};

use crate::{cdxj::surt::to_surt, warc::WarcRecord};

/// One CDXJ line: `<surt> <14-digit timestamp> <json>`.
#[derive(Debug, Clone)]
pub struct CdxjEntry {
    pub surt: String,
    pub timestamp: String,
    pub metadata: CdxjMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct CdxjMetadata {
    pub url: String,
    pub mime: Option<String>,
    pub status: Option<u16>,
    pub digest: String,
    pub length: u64,
    pub offset: u64,
    pub filename: String,
}

impl CdxjEntry {
    /// Builds the CDXJ line for `record`, or `None` if it isn't a
    /// response-typed record, has no target URI, or has no (non-zero)
    /// status.
    pub fn from_record(record: &WarcRecord) -> Option<Self> {
        if !record.is_response_like() {
            return None;
        }
        let url = record.warc_target_uri()?.to_owned();
        let surt = to_surt(&url)?;
        let timestamp = fourteen_digit_timestamp(record.warc_date())?;
        match record.http_status {
            Some(0) | None => return None,
            Some(_) => {}
        }
        let digest = record
            .warc_payload_digest()
            .map(normalize_digest)
            .unwrap_or_else(|| sha1_digest(&record.payload));

        Some(Self {
            surt,
            timestamp,
            metadata: CdxjMetadata {
                url,
                mime: record.http_content_type.clone(),
                status: record.http_status,
                digest,
                length: record.length,
                offset: record.offset,
                filename: record.filename.clone(),
            },
        })
    }

    pub fn line(&self) -> String {
        let json = serde_json::to_string(&self.metadata).expect("CdxjMetadata is always serializable");
        format!("{} {} {}\n", self.surt, self.timestamp, json)
    }

    /// The sort key this line orders by: `<surt> <timestamp>`, matching the
    /// prefix every CDXJ consumer keys its binary search on.
    pub fn sort_key(&self) -> String {
        format!("{} {}", self.surt, self.timestamp)
    }
}

fn fourteen_digit_timestamp(warc_date: Option<&str>) -> Option<String> {
    let date: DateTime<Utc> = warc_date?.parse().ok()?;
    Some(date.format("%Y%m%d%H%M%S").to_string())
}

/// `WARC-Payload-Digest` arrives as `<algo>:<value>`; CDXJ wants the bare
/// value with the algorithm as a prefix we already control, so this keeps
/// only the part after the first colon when present.
fn normalize_digest(raw: &str) -> String {
    match raw.split_once(':') {
        Some((algo, value)) => format!("{algo}:{value}"),
        None => format!("sha256:{raw}"),
    }
}

fn sha1_digest(payload: &[u8]) -> String {
    let digest = Sha1::digest(payload);
    format!("sha1:{}", data_encoding::BASE32.encode(&digest[..]))
}
