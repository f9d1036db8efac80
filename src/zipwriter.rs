//! Streaming, STORE-only ZIP composition with per-entry SHA-256 hashing.
//!
//! Entries are appended in whatever order the orchestrator calls
//! [`StreamingZipWriter::add_entry`] in and hashed as they're written, so the
//! digest manifest can be built without a second read pass.

use std::collections::HashSet;
use std::io::{self, Read, Write};

use rawzip::{ZipArchiveWriter, ZipEntryOptions};
use sha2::{Digest, Sha256};

use crate::error::WaczError;

/// One entry's accounting, ready to become a `datapackage.json` resource.
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

pub struct StreamingZipWriter<W: Write> {
    archive: ZipArchiveWriter<W>,
    names_seen: HashSet<String>,
    resources: Vec<ResourceRecord>,
}

impl<W: Write> StreamingZipWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            archive: ZipArchiveWriter::new(sink),
            names_seen: HashSet::new(),
            resources: Vec::new(),
        }
    }

    /// Copies all of `content` into a new STORE-method entry named `path`,
    /// hashing it as it's written.
    pub fn add_entry(&mut self, path: &str, mut content: impl Read) -> Result<(), WaczError> {
        if !self.names_seen.insert(path.to_owned()) {
            return Err(WaczError::WriteFailed(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("duplicate ZIP entry name: {path}"),
            )));
        }

        let mut entry = self
            .archive
            .new_file(path, ZipEntryOptions::default().compression_method(rawzip::CompressionMethod::Store))
            .map_err(WaczError::WriteFailed)?;

        let mut hasher = Sha256::new();
        let mut size = 0u64;
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let read = content.read(&mut buffer).map_err(WaczError::WriteFailed)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
            entry.write_all(&buffer[..read]).map_err(WaczError::WriteFailed)?;
            size += read as u64;
        }
        entry.finish().map_err(WaczError::WriteFailed)?;

        self.resources.push(ResourceRecord {
            path: path.to_owned(),
            size,
            sha256: format!("{:x}", hasher.finalize()),
        });
        Ok(())
    }

    /// Returns the accounting for entries written so far, without touching
    /// the archive. Used to build the datapackage manifest before adding it
    /// (and its digest) as final entries.
    pub fn resources_so_far(&self) -> Vec<ResourceRecord> {
        self.resources.clone()
    }

    /// Writes the central directory and returns the underlying sink plus the
    /// per-entry accounting needed for the digest manifest.
    pub fn finish(self) -> Result<(W, Vec<ResourceRecord>), WaczError> {
        let sink = self.archive.finish().map_err(WaczError::WriteFailed)?;
        Ok((sink, self.resources))
    }
}
