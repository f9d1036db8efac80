//! Binary WARC record parsing.

pub mod reader;
pub mod record;

pub use reader::WarcReader;
pub use record::{HeaderMap, WarcRecord};

#[cfg(test)]
mod tests {
    use super::*;
    use libflate::gzip::Encoder as GzEncoder;
    use std::io::Write;

    fn gzip_member(record: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new()).unwrap();
        encoder.write_all(record.as_bytes()).unwrap();
        encoder.finish().into_result().unwrap()
    }

    fn write_warc(path: &std::path::Path, records: &[&str]) {
        let mut bytes = Vec::new();
        for record in records {
            bytes.extend(gzip_member(record));
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn reads_a_single_gzip_framed_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.warc.gz");
        let payload = "hello";
        let record = format!(
            "WARC/1.0\r\nWARC-Type: resource\r\nWARC-Target-URI: http://example.com/\r\nWARC-Date: 2021-01-01T00:00:00Z\r\nContent-Length: {}\r\n\r\n{}",
            payload.len(),
            payload
        );
        write_warc(&path, &[&record]);

        let mut reader = WarcReader::open(&path).unwrap();
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.warc_type, "resource");
        assert_eq!(record.payload, payload.as_bytes());
        assert_eq!(record.warc_target_uri(), Some("http://example.com/"));
        assert!(reader.next().is_none());
    }

    #[test]
    fn reads_multiple_members_with_distinct_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.warc.gz");
        let first = "WARC/1.0\r\nWARC-Type: resource\r\nContent-Length: 1\r\n\r\na";
        let second = "WARC/1.0\r\nWARC-Type: resource\r\nContent-Length: 1\r\n\r\nb";
        write_warc(&path, &[first, second]);

        let mut reader = WarcReader::open(&path).unwrap();
        let record_a = reader.next().unwrap().unwrap();
        let record_b = reader.next().unwrap().unwrap();
        assert_eq!(record_a.offset, 0);
        assert!(record_b.offset > 0);
        assert_ne!(record_a.offset, record_b.offset);
        assert!(reader.next().is_none());
    }

    #[test]
    fn rejects_truncated_content_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.warc.gz");
        let record = "WARC/1.0\r\nWARC-Type: resource\r\nContent-Length: 10\r\n\r\nshort";
        write_warc(&path, &[record]);

        let mut reader = WarcReader::open(&path).unwrap();
        assert!(reader.next().unwrap().is_err());
    }
}
