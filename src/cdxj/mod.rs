//! CDXJ key derivation: SURT keys and per-record index lines.

pub mod entry;
pub mod surt;

pub use entry::{CdxjEntry, CdxjMetadata};
pub use surt::to_surt;
