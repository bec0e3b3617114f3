#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// A serve child bound to an ephemeral port, killed on drop.
pub struct TestServer {
    child: Child,
    pub port: u16,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Spawn `ordforge serve --port 0` with docker probing disabled and the
/// cache pointed at `cache_dir`, plus any extra env pairs. Blocks until the
/// startup line reports the bound port.
pub fn spawn_server(cache_dir: &std::path::Path, extra_env: &[(&str, &str)]) -> TestServer {
    let bin = env!("CARGO_BIN_EXE_ordforge");
    let mut cmd = Command::new(bin);
    cmd.args(["serve", "--port", "0"])
        .env("ORDFORGE_TEST_DISABLE_DOCKER", "1")
        .env("ORDFORGE_BIND", "127.0.0.1")
        .env("ORDFORGE_CACHE_DIR", cache_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    for (k, v) in extra_env {
        cmd.env(k, v);
    }
    let mut child = cmd.spawn().expect("failed to spawn ordforge serve");

    let stdout = child.stdout.take().expect("child stdout");
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .expect("failed to read server startup line");
    let port: u16 = line
        .trim()
        .rsplit(':')
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(|| panic!("unexpected startup line: {line:?}"));

    TestServer { child, port }
}

/// Send one raw HTTP request and return (status line, full body bytes).
pub fn http_request(port: u16, raw: &[u8]) -> (String, Vec<u8>) {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).expect("connect to test server");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    stream.write_all(raw).expect("write request");
    let mut response = Vec::new();
    stream.read_to_end(&mut response).expect("read response");

    let header_end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| p + 4)
        .unwrap_or(response.len());
    let head = String::from_utf8_lossy(&response[..header_end]).to_string();
    let status_line = head.lines().next().unwrap_or_default().to_string();
    (status_line, response[header_end..].to_vec())
}

pub fn get(port: u16, path: &str) -> (String, Vec<u8>) {
    let raw = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    http_request(port, raw.as_bytes())
}

pub fn post_json(port: u16, path: &str, body: &str) -> (String, Vec<u8>) {
    let raw = format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    http_request(port, raw.as_bytes())
}

pub fn delete(port: u16, path: &str) -> (String, Vec<u8>) {
    let raw = format!("DELETE {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    http_request(port, raw.as_bytes())
}

/// Build a multipart/form-data upload body for one file plus fields.
pub fn multipart_upload(
    boundary: &str,
    file_name: &str,
    content_type: &str,
    data: &[u8],
    fields: &[(&str, &str)],
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

pub fn post_multipart(port: u16, path: &str, boundary: &str, body: &[u8]) -> (String, Vec<u8>) {
    let mut raw = format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: multipart/form-data; boundary={boundary}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    raw.extend_from_slice(body);
    http_request(port, &raw)
}
