//! ZipNum-sharded secondary index: slices sorted CDXJ lines into fixed-size
//! windows, gzips each window independently, and records one locator line
//! per shard in `index.idx`.

use std::io::Write;

use libflate::gzip::Encoder as GzEncoder;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::WaczError;

/// Number of CDXJ lines per shard. The upstream ZipNum reference implementation
/// slices with an exclusive-exclusive bound that drops the boundary line
/// between shards; this partitions `i..min(i + SHARD_LIMIT, len)` instead, so
/// every line is assigned to exactly one shard.
pub const SHARD_LIMIT: usize = 3000;

const CDX_FILENAME: &str = "index.cdx.gz";

#[derive(Debug, Serialize)]
struct ShardLocator<'a> {
    offset: u64,
    length: u64,
    digest: String,
    filename: &'a str,
}

pub struct ZipNumIndex {
    /// Concatenated gzip shards; written verbatim as `indexes/index.cdx.gz`.
    pub cdx_gz: Vec<u8>,
    /// One locator line per shard, prefixed by a `!meta` header line;
    /// written verbatim as `indexes/index.idx`.
    pub idx: String,
}

/// Builds the sharded index from CDXJ lines already in their final sort
/// order. Each line must already end in `\n`.
pub fn build(lines: &[String]) -> Result<ZipNumIndex, WaczError> {
    let mut cdx_gz = Vec::new();
    let mut idx = meta_header();

    let mut offset: u64 = 0;
    let mut start = 0;
    while start < lines.len() {
        let end = (start + SHARD_LIMIT).min(lines.len());
        let shard = &lines[start..end];

        let mut encoder = GzEncoder::new(Vec::new())
            .map_err(|error| WaczError::WriteFailed(error))?;
        for line in shard {
            encoder
                .write_all(line.as_bytes())
                .map_err(WaczError::WriteFailed)?;
        }
        let compressed = encoder
            .finish()
            .into_result()
            .map_err(WaczError::WriteFailed)?;

        let length = compressed.len() as u64;
        let digest = format!("sha256:{:x}", Sha256::digest(&compressed));
        let first_key = shard[0]
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_owned();

        let locator = ShardLocator {
            offset,
            length,
            digest,
            filename: CDX_FILENAME,
        };
        let locator_json = serde_json::to_string(&locator).expect("ShardLocator is always serializable");
        idx.push_str(&format!("{first_key} {locator_json}\n"));

        cdx_gz.extend(compressed);
        offset += length;
        start = end;
    }

    Ok(ZipNumIndex { cdx_gz, idx })
}

fn meta_header() -> String {
    format!("!meta 0 {{\"format\": \"cdxj-gzip-1.0\", \"filename\": \"{CDX_FILENAME}\"}}\n")
}
