use std::io::Write;
use std::sync::Arc;

use libflate::gzip::Encoder as GzEncoder;
use pretty_assertions::assert_eq;
use waczcore::RunBuilder;

fn gzip_member(record: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new()).unwrap();
    encoder.write_all(record.as_bytes()).unwrap();
    encoder.finish().into_result().unwrap()
}

fn http_response_record(url: &str, index: usize) -> String {
    let body = format!("<html><head><title>Page {index}</title></head><body></body></html>");
    let http = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    format!(
        "WARC/1.0\r\nWARC-Type: response\r\nWARC-Target-URI: {url}\r\nWARC-Date: 2021-01-01T00:00:0{}Z\r\nContent-Type: application/http; msgtype=response\r\nContent-Length: {}\r\n\r\n{http}",
        index % 10,
        http.len()
    )
}

fn warcinfo_record() -> String {
    let body = "software: waczcore-tests";
    format!(
        "WARC/1.0\r\nWARC-Type: warcinfo\r\nWARC-Date: 2021-01-01T00:00:00Z\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
}

fn write_warc(path: &std::path::Path, records: &[String]) {
    let mut bytes = Vec::new();
    for record in records {
        bytes.extend(gzip_member(record));
    }
    std::fs::write(path, bytes).unwrap();
}

#[test]
fn an_input_with_no_page_like_records_still_produces_a_valid_archive() {
    let dir = tempfile::tempdir().unwrap();
    let warc_path = dir.path().join("empty.warc.gz");
    write_warc(&warc_path, &[warcinfo_record()]);

    let output_path = dir.path().join("out.wacz");
    let run = RunBuilder::new()
        .add_input(&warc_path)
        .output(&output_path)
        .build()
        .unwrap();
    let outcome = run.process().unwrap();

    assert_eq!(outcome.record_count, 0);
    assert_eq!(outcome.page_count, 0);
    assert!(output_path.exists());
    assert!(std::fs::metadata(&output_path).unwrap().len() > 0);
}

#[test]
fn a_single_html_response_is_indexed_and_detected_as_a_page() {
    let dir = tempfile::tempdir().unwrap();
    let warc_path = dir.path().join("sample.warc.gz");
    write_warc(&warc_path, &[http_response_record("http://example.com/", 0)]);

    let output_path = dir.path().join("out.wacz");
    let run = RunBuilder::new()
        .add_input(&warc_path)
        .output(&output_path)
        .build()
        .unwrap();
    let outcome = run.process().unwrap();

    assert_eq!(outcome.record_count, 1);
    assert_eq!(outcome.page_count, 1);
}

#[test]
fn a_manual_page_list_suppresses_automatic_detection() {
    let dir = tempfile::tempdir().unwrap();
    let warc_path = dir.path().join("sample.warc.gz");
    write_warc(&warc_path, &[http_response_record("http://example.com/", 0)]);

    let output_path = dir.path().join("out.wacz");
    let run = RunBuilder::new()
        .add_input(&warc_path)
        .output(&output_path)
        .add_page("http://example.com/manual", Some("Manual Page".to_owned()), None)
        .build()
        .unwrap();
    let outcome = run.process().unwrap();

    assert_eq!(outcome.record_count, 1);
    assert_eq!(outcome.page_count, 1);
}

#[test]
fn indexing_spans_the_zipnum_shard_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let warc_path = dir.path().join("many.warc.gz");
    let records: Vec<String> = (0..waczcore::zipnum::SHARD_LIMIT + 5)
        .map(|index| http_response_record(&format!("http://example.com/{index}"), index))
        .collect();
    write_warc(&warc_path, &records);

    let output_path = dir.path().join("out.wacz");
    let run = RunBuilder::new()
        .add_input(&warc_path)
        .output(&output_path)
        .build()
        .unwrap();
    let outcome = run.process().unwrap();

    assert_eq!(outcome.record_count, waczcore::zipnum::SHARD_LIMIT + 5);
}

#[test]
fn detect_pages_can_be_disabled_with_no_manual_pages_supplied() {
    let dir = tempfile::tempdir().unwrap();
    let warc_path = dir.path().join("sample.warc.gz");
    write_warc(&warc_path, &[http_response_record("http://example.com/", 0)]);

    let output_path = dir.path().join("out.wacz");
    let run = RunBuilder::new()
        .add_input(&warc_path)
        .output(&output_path)
        .detect_pages(false)
        .build()
        .unwrap();
    let outcome = run.process().unwrap();

    assert_eq!(outcome.record_count, 1);
    assert_eq!(outcome.page_count, 0);
}

#[test]
fn title_url_ts_and_extras_are_accepted_by_the_builder() {
    let dir = tempfile::tempdir().unwrap();
    let warc_path = dir.path().join("sample.warc.gz");
    write_warc(&warc_path, &[http_response_record("http://example.com/", 0)]);

    let mut extras = serde_json::Map::new();
    extras.insert("textIndex".to_owned(), serde_json::Value::String("indexes/text.idx".to_owned()));

    let output_path = dir.path().join("out.wacz");
    let run = RunBuilder::new()
        .add_input(&warc_path)
        .output(&output_path)
        .title("My Archive")
        .description("a description")
        .url("http://example.com/")
        .ts("2021-01-01T00:00:00Z")
        .datapackage_extras(extras)
        .build()
        .unwrap();
    let outcome = run.process().unwrap();

    assert_eq!(outcome.record_count, 1);
    assert!(output_path.exists());
}

#[test]
fn a_missing_output_path_is_rejected_before_any_indexing_runs() {
    let result = RunBuilder::new().add_input("irrelevant.warc.gz").build();
    assert!(result.is_err());
}

#[test]
fn a_cancelled_run_stops_without_writing_an_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let warc_path = dir.path().join("sample.warc.gz");
    write_warc(&warc_path, &[http_response_record("http://example.com/", 0)]);

    let output_path = dir.path().join("out.wacz");
    let run = RunBuilder::new()
        .add_input(&warc_path)
        .output(&output_path)
        .build()
        .unwrap();
    let cancel_handle = run.cancel_handle();
    cancel_handle.cancel();

    let result = run.process();
    assert!(result.is_err());
    assert!(!output_path.exists());
}

#[test]
fn multiple_input_files_merge_into_one_sorted_index() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.warc.gz");
    let second = dir.path().join("b.warc.gz");
    write_warc(&first, &[http_response_record("http://a.example.com/", 0)]);
    write_warc(&second, &[http_response_record("http://b.example.com/", 1)]);

    let output_path = dir.path().join("out.wacz");
    let run = RunBuilder::new()
        .add_input(&first)
        .add_input(&second)
        .output(&output_path)
        .build()
        .unwrap();
    let outcome = run.process().unwrap();

    assert_eq!(outcome.record_count, 2);
    assert_eq!(outcome.page_count, 2);
}

#[test]
fn signing_failure_propagates_and_removes_the_partial_output() {
    struct FailingSigner;
    impl waczcore::signer::Signer for FailingSigner {
        fn sign(
            &self,
            _hash: &str,
            _created: chrono::DateTime<chrono::Utc>,
        ) -> Result<waczcore::signer::SignedData, waczcore::WaczError> {
            Err(waczcore::WaczError::SigningFailed("signing service unreachable".to_owned()))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let warc_path = dir.path().join("sample.warc.gz");
    write_warc(&warc_path, &[http_response_record("http://example.com/", 0)]);

    let output_path = dir.path().join("out.wacz");
    let run = RunBuilder::new()
        .add_input(&warc_path)
        .output(&output_path)
        .signer(Arc::new(FailingSigner))
        .build()
        .unwrap();

    let result = run.process();
    assert!(result.is_err());
    assert!(!output_path.exists());
}
