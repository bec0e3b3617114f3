/*!
Minimal HTTP request model for the API server: tolerant parsing of a single
request from a Read stream (CRLFCRLF and LFLF header termination, 64 KiB
header cap, Content-Length bodies with a caller-supplied cap) and a small
multipart/form-data parser for the upload endpoint.
*/

use crate::util::{find_header_end, url_decode};
use std::collections::HashMap;
use std::io::{self, Read};

/// Supported HTTP methods (minimal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
    Other(String),
}

/// Simple case-insensitive header map (keys lowercased)
pub type HeaderMap = HashMap<String, String>;

/// Parsed HTTP request. The path keeps its original case (cached file names
/// are case-sensitive); headers are normalized to lowercase keys.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

/// Parse a single HTTP request from a reader with a 64 KiB header cap.
/// The body is read up to Content-Length; a Content-Length above `body_cap`
/// is rejected before any body bytes are consumed.
pub fn read_http_request<R: Read>(reader: &mut R, body_cap: usize) -> io::Result<HttpRequest> {
    const HDR_CAP: usize = 64 * 1024;
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];
    let mut header_end: Option<usize> = None;

    while header_end.is_none() && buf.len() < HDR_CAP {
        let n = reader.read(&mut tmp)?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(end_idx) = find_header_end(&buf) {
            header_end = Some(end_idx);
        }
    }

    let Some(body_start) = header_end else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "incomplete HTTP request headers",
        ));
    };

    // Strip the terminator to get header bytes only.
    let header_bytes: &[u8] = if body_start >= 4 && &buf[body_start - 4..body_start] == b"\r\n\r\n" {
        &buf[..body_start - 4]
    } else {
        &buf[..body_start.saturating_sub(2)]
    };

    let header_str = String::from_utf8_lossy(header_bytes);
    let mut lines = header_str.lines();
    let request_line = lines.next().unwrap_or_default().trim().to_string();
    let (method, path, query) = parse_request_line(&request_line);
    let headers = parse_headers(lines);

    let content_len: usize = headers
        .get("content-length")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);
    if content_len > body_cap {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("request body of {content_len} bytes exceeds cap of {body_cap}"),
        ));
    }

    let mut body = buf[body_start..].to_vec();
    while body.len() < content_len {
        let n = reader.read(&mut tmp)?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&tmp[..n]);
    }
    body.truncate(content_len);

    Ok(HttpRequest {
        method,
        path,
        query,
        headers,
        body,
    })
}

fn parse_request_line(line: &str) -> (Method, String, Vec<(String, String)>) {
    let mut it = line.split_whitespace();
    let method = match it.next().unwrap_or_default() {
        "GET" => Method::Get,
        "POST" => Method::Post,
        "DELETE" => Method::Delete,
        other => Method::Other(other.to_string()),
    };
    let target = it.next().unwrap_or("/");
    let (path, query_str) = match target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (target, ""),
    };
    let mut query = Vec::new();
    for pair in query_str.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut kv = pair.splitn(2, '=');
        let k = kv.next().unwrap_or_default();
        let v = kv.next().unwrap_or_default();
        query.push((url_decode(k), url_decode(v)));
    }
    (method, url_decode(path), query)
}

fn parse_headers<'a, I: Iterator<Item = &'a str>>(lines: I) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_ascii_lowercase(), v.trim().to_string());
        }
    }
    headers
}

/// One decoded part of a multipart/form-data body.
#[derive(Debug, Clone)]
pub struct MultipartPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Extract the boundary token from a Content-Type header value.
pub fn multipart_boundary(content_type: &str) -> Option<String> {
    let lower = content_type.to_ascii_lowercase();
    if !lower.starts_with("multipart/form-data") {
        return None;
    }
    for param in content_type.split(';').skip(1) {
        let param = param.trim();
        if let Some(v) = param
            .strip_prefix("boundary=")
            .or_else(|| param.strip_prefix("BOUNDARY="))
        {
            let v = v.trim();
            let v = v.strip_prefix('"').unwrap_or(v);
            let v = v.strip_suffix('"').unwrap_or(v);
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }
    None
}

/// Split a multipart body into parts. Tolerates missing trailing CRLF on the
/// closing delimiter; parts without a Content-Disposition name are dropped.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Vec<MultipartPart> {
    let delim = format!("--{boundary}");
    let mut parts = Vec::new();

    for raw in split_on(body, delim.as_bytes()).into_iter().skip(1) {
        let raw = strip_leading_crlf(raw);
        if raw.is_empty() || raw.starts_with(b"--") {
            // closing delimiter
            continue;
        }
        let Some(hend) = find_header_end(raw) else {
            continue;
        };
        let header_str = String::from_utf8_lossy(&raw[..hend]);
        let headers = parse_headers(header_str.lines());

        let Some(disposition) = headers.get("content-disposition") else {
            continue;
        };
        let Some(name) = disposition_param(disposition, "name") else {
            continue;
        };
        let file_name = disposition_param(disposition, "filename");
        let content_type = headers.get("content-type").cloned();

        // Payload runs to the CRLF that precedes the next delimiter.
        let mut data = raw[hend..].to_vec();
        if data.ends_with(b"\r\n") {
            data.truncate(data.len() - 2);
        } else if data.ends_with(b"\n") {
            data.truncate(data.len() - 1);
        }

        parts.push(MultipartPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    parts
}

fn disposition_param(disposition: &str, key: &str) -> Option<String> {
    for param in disposition.split(';').skip(1) {
        let param = param.trim();
        if let Some(rest) = param.strip_prefix(key) {
            let rest = rest.trim_start();
            if let Some(v) = rest.strip_prefix('=') {
                let v = v.trim();
                let v = v.strip_prefix('"').unwrap_or(v);
                let v = v.strip_suffix('"').unwrap_or(v);
                return Some(v.to_string());
            }
        }
    }
    None
}

fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            out.push(&haystack[start..i]);
            i += needle.len();
            start = i;
        } else {
            i += 1;
        }
    }
    out.push(&haystack[start..]);
    out
}

fn strip_leading_crlf(buf: &[u8]) -> &[u8] {
    if buf.starts_with(b"\r\n") {
        &buf[2..]
    } else if buf.starts_with(b"\n") {
        &buf[1..]
    } else {
        buf
    }
}
