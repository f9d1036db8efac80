//! Sort-friendly URI Reordering Transform.
//!
//! `http://www.example.com:80/a/b?q=2&p=1` becomes
//! `com,example)/a/b?p=1&q=2` — default ports are dropped, the host's labels
//! are reversed and comma-joined, and the query string is sorted by key so
//! that otherwise-identical URLs sort together regardless of parameter order.

use percent_encoding::percent_decode_str;
use url::Url;

/// Converts an absolute URL into its SURT form. Returns `None` if `raw` does
/// not parse as an absolute URL or has no host (e.g. `data:` URIs).
pub fn to_surt(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;

    let scheme = url.scheme().to_ascii_lowercase();
    let mut surt = String::with_capacity(raw.len() + 2);

    let labels: Vec<&str> = host.rsplit('.').collect();
    surt.push_str(&labels.join(","));

    if let Some(port) = url.port() {
        if Some(port) != default_port(&scheme) {
            surt.push(':');
            surt.push_str(&port.to_string());
        }
    }
    surt.push(')');

    let decoded_path = percent_decode_str(url.path()).decode_utf8_lossy();
    surt.push_str(&decoded_path);

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if !pairs.is_empty() {
        pairs.sort();
        surt.push('?');
        let encoded: Vec<String> = pairs
            .into_iter()
            .map(|(key, value)| if value.is_empty() { key } else { format!("{key}={value}") })
            .collect();
        surt.push_str(&encoded.join("&"));
    }

    Some(surt)
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}
