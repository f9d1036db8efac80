//! Streams gzip-member-framed or plain WARC records from a file.
//!
//! Gzip framing is detected by magic bytes (`1F 8B`), not by file extension.
//! For a gzip-framed WARC the file is a concatenation of independent gzip
//! members, each enclosing exactly one WARC record; `offset`/`length` on the
//! yielded [`WarcRecord`] address that member. For a plain WARC they address
//! the uncompressed record itself.

use std::{
    fs::File,
    io::{BufRead, BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use libflate::gzip::Decoder as GzDecoder;

use crate::{error::WaczError, warc::record::{HeaderMap, WarcRecord}};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

pub struct WarcReader {
    reader: BufReader<File>,
    file_size: u64,
    offset: u64,
    filename: String,
    path: PathBuf,
    is_gzip: bool,
}

impl WarcReader {
    pub fn open(path: &Path) -> Result<Self, WaczError> {
        let file = File::open(path).map_err(|error| WaczError::MalformedWarc {
            file: path.display().to_string(),
            reason: format!("could not open file: {error}"),
        })?;
        let file_size = file
            .metadata()
            .map_err(|error| WaczError::MalformedWarc {
                file: path.display().to_string(),
                reason: format!("could not stat file: {error}"),
            })?
            .len();

        let mut reader = BufReader::new(file);
        let mut magic = [0u8; 2];
        let is_gzip = match reader.read_exact(&mut magic) {
            Ok(()) => magic == GZIP_MAGIC,
            Err(_) => false,
        };
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|error| WaczError::MalformedWarc {
                file: path.display().to_string(),
                reason: format!("could not rewind file: {error}"),
            })?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            reader,
            file_size,
            offset: 0,
            filename,
            path: path.to_owned(),
            is_gzip,
        })
    }

    fn fail(&self, reason: impl Into<String>) -> WaczError {
        WaczError::MalformedWarc {
            file: self.path.display().to_string(),
            reason: reason.into(),
        }
    }

    fn next_gzip_record(&mut self) -> Option<Result<WarcRecord, WaczError>> {
        let start = self.offset;
        if let Err(error) = self.reader.seek(SeekFrom::Start(start)) {
            return Some(Err(self.fail(format!("seek failed: {error}"))));
        }

        let mut decoder = match GzDecoder::new(&mut self.reader) {
            Ok(decoder) => decoder,
            Err(error) => return Some(Err(self.fail(format!("invalid gzip member: {error}")))),
        };

        let mut buffer = Vec::with_capacity(4096);
        if let Err(error) = decoder.read_to_end(&mut buffer) {
            return Some(Err(self.fail(format!("gzip decode failed: {error}"))));
        }
        // drop the decoder so its borrow of `self.reader` ends before we read
        // the reader's own stream position below.
        drop(decoder);

        let member_end = match self.reader.stream_position() {
            Ok(position) => position,
            Err(error) => return Some(Err(self.fail(format!("could not read position: {error}")))),
        };
        let length = member_end - start;
        self.offset = member_end;

        Some(parse_record(&buffer, &self.filename, start, length, &*self))
    }

    fn next_plain_record(&mut self) -> Option<Result<WarcRecord, WaczError>> {
        let start = self.offset;
        if start >= self.file_size {
            return None;
        }

        let header_block = match read_header_block(&mut self.reader) {
            Ok(Some(block)) => block,
            Ok(None) => return None,
            Err(error) => return Some(Err(self.fail(error))),
        };

        let (warc_type, headers) = match parse_warc_header_block(&header_block) {
            Ok(parsed) => parsed,
            Err(error) => return Some(Err(self.fail(error))),
        };

        let content_length: u64 = match headers
            .get("Content-Length")
            .ok_or_else(|| "missing Content-Length".to_owned())
            .and_then(|value| value.trim().parse().map_err(|_| "bad Content-Length".to_owned()))
        {
            Ok(value) => value,
            Err(error) => return Some(Err(self.fail(error))),
        };

        let mut block = vec![0u8; content_length as usize];
        if let Err(error) = self.reader.read_exact(&mut block) {
            return Some(Err(self.fail(format!("truncated payload: {error}"))));
        }

        let mut trailer = [0u8; 4];
        if let Err(error) = self.reader.read_exact(&mut trailer) {
            return Some(Err(self.fail(format!("missing record terminator: {error}"))));
        }
        if &trailer != b"\r\n\r\n" {
            return Some(Err(self.fail("missing CRLFCRLF record terminator")));
        }

        let end = start + header_block.len() as u64 + content_length + 4;
        self.offset = end;

        Some(finish_record(warc_type, headers, block, &self.filename, start, end - start))
    }
}

impl Iterator for WarcReader {
    type Item = Result<WarcRecord, WaczError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_gzip {
            if self.offset >= self.file_size {
                return None;
            }
            self.next_gzip_record()
        } else {
            self.next_plain_record()
        }
    }
}

fn read_header_block<R: BufRead>(reader: &mut R) -> Result<Option<Vec<u8>>, String> {
    let mut block = Vec::with_capacity(512);
    loop {
        let before = block.len();
        let read = reader.read_until(b'\n', &mut block).map_err(|error| error.to_string())?;
        if read == 0 {
            return if block.is_empty() {
                Ok(None)
            } else {
                Err("truncated header block".to_owned())
            };
        }
        if block[before..].ends_with(b"\r\n") && before >= 2 && &block[before - 2..before] == b"\r\n" {
            return Ok(Some(block));
        }
    }
}

fn parse_warc_header_block(block: &[u8]) -> Result<(String, HeaderMap), String> {
    let text = std::str::from_utf8(block).map_err(|_| "header block is not valid UTF-8".to_owned())?;
    let mut lines = text.split("\r\n");
    let first_line = lines.next().ok_or_else(|| "empty header block".to_owned())?;
    if !first_line.starts_with("WARC/") {
        return Err(format!("expected WARC version line, found {first_line:?}"));
    }

    let mut headers = HeaderMap::new();
    let mut warc_type = String::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("WARC-Type") {
            warc_type = value.to_owned();
        }
        headers.insert(name, value);
    }

    Ok((warc_type, headers))
}

/// Parses one decoded gzip member: a WARC header block, followed by the
/// declared payload, optionally wrapping an HTTP message.
fn parse_record(
    buffer: &[u8],
    filename: &str,
    offset: u64,
    length: u64,
    warc_reader: &WarcReader,
) -> Result<WarcRecord, WaczError> {
    let mut cursor = std::io::Cursor::new(buffer);
    let header_block = read_header_block(&mut cursor)
        .map_err(|reason| warc_reader.fail(reason))?
        .ok_or_else(|| warc_reader.fail("empty gzip member"))?;

    let (warc_type, headers) = parse_warc_header_block(&header_block).map_err(|reason| warc_reader.fail(reason))?;

    let content_length: u64 = headers
        .get("Content-Length")
        .ok_or_else(|| warc_reader.fail("missing Content-Length"))?
        .trim()
        .parse()
        .map_err(|_| warc_reader.fail("bad Content-Length"))?;

    let body_start = header_block.len();
    let body_end = body_start + content_length as usize;
    let block = buffer
        .get(body_start..body_end)
        .ok_or_else(|| warc_reader.fail("truncated payload"))?
        .to_vec();

    finish_record(warc_type, headers, block, filename, offset, length)
}

/// Splits the WARC block into an HTTP header section (if present) and the
/// true payload, and builds the final [`WarcRecord`].
fn finish_record(
    warc_type: String,
    headers: HeaderMap,
    block: Vec<u8>,
    filename: &str,
    offset: u64,
    length: u64,
) -> Result<WarcRecord, WaczError> {
    let is_http_wrapped = headers
        .get("Content-Type")
        .is_some_and(|content_type| content_type.starts_with("application/http"))
        && (warc_type == "response" || warc_type == "revisit" || warc_type == "request");

    let (payload, http_status, http_content_type, http_method) = if is_http_wrapped {
        split_http_message(&block, &warc_type, filename)?
    } else {
        (block, None, None, None)
    };

    Ok(WarcRecord {
        warc_type,
        headers,
        payload,
        offset,
        length,
        filename: filename.to_owned(),
        http_status,
        http_content_type,
        http_method,
    })
}

fn split_http_message(
    block: &[u8],
    warc_type: &str,
    filename: &str,
) -> Result<(Vec<u8>, Option<u16>, Option<String>, Option<String>), WaczError> {
    let fail = |reason: &str| WaczError::MalformedWarc {
        file: filename.to_owned(),
        reason: format!("embedded HTTP message: {reason}"),
    };

    if warc_type == "request" {
        let mut headers_buf = [httparse::EMPTY_HEADER; 64];
        let mut request = httparse::Request::new(&mut headers_buf);
        let status = request.parse(block).map_err(|error| fail(&error.to_string()))?;
        let httparse::Status::Complete(body_offset) = status else {
            return Err(fail("incomplete HTTP request"));
        };
        let method = request.method.map(str::to_owned);
        return Ok((block[body_offset..].to_vec(), None, None, method));
    }

    let mut headers_buf = [httparse::EMPTY_HEADER; 64];
    let mut response = httparse::Response::new(&mut headers_buf);
    let status = response.parse(block).map_err(|error| fail(&error.to_string()))?;
    let httparse::Status::Complete(body_offset) = status else {
        return Err(fail("incomplete HTTP response"));
    };

    let http_status = response.code;
    let content_type = response
        .headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case("Content-Type"))
        .map(|header| String::from_utf8_lossy(header.value).into_owned());

    Ok((block[body_offset..].to_vec(), http_status, content_type, None))
}
