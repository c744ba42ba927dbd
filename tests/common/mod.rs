#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use porter::http::request::{Request, RequestBuilder, RequestLine};
use porter::vhost::VirtualHosts;

/// A scratch document root under the system temp dir, removed on drop.
pub struct DocRoot {
    path: PathBuf,
}

impl DocRoot {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("porter-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn canonical(&self) -> PathBuf {
        fs::canonicalize(&self.path).unwrap()
    }

    pub fn file(&self, rel: &str, contents: &[u8]) -> PathBuf {
        let path = self.path.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn dir(&self, rel: &str) -> PathBuf {
        let path = self.path.join(rel);
        fs::create_dir_all(&path).unwrap();
        path
    }
}

impl Drop for DocRoot {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

pub fn hosts(entries: &[(&str, &Path)]) -> Arc<VirtualHosts> {
    Arc::new(VirtualHosts::validate(entries.iter().copied()).unwrap())
}

pub fn get(target: &str, host: &str) -> Request {
    RequestBuilder::new(RequestLine::parse(&format!("GET {target} HTTP/1.1")).unwrap())
        .header("Host", host)
        .build()
        .unwrap()
}

pub fn get_and_close(target: &str, host: &str) -> Request {
    RequestBuilder::new(RequestLine::parse(&format!("GET {target} HTTP/1.1")).unwrap())
        .header("Host", host)
        .header("Connection", "close")
        .build()
        .unwrap()
}

/// One response as seen on the wire.
#[derive(Debug)]
pub struct WireResponse {
    pub status_line: String,
    pub header_lines: Vec<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn status(&self) -> u16 {
        self.status_line.split(' ').nth(1).unwrap().parse().unwrap()
    }
}

/// Splits a byte stream into consecutive responses, using Content-Length
/// to find the end of each body.
pub fn split_responses(mut bytes: &[u8]) -> Vec<WireResponse> {
    let mut out = Vec::new();

    while !bytes.is_empty() {
        let head_end = bytes
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("incomplete response head");
        let head = std::str::from_utf8(&bytes[..head_end]).unwrap();
        let mut lines = head.split("\r\n");

        let status_line = lines.next().unwrap().to_string();
        let header_lines: Vec<String> = lines.map(str::to_string).collect();
        let headers: BTreeMap<String, String> = header_lines
            .iter()
            .map(|l| {
                let (k, v) = l.split_once(": ").unwrap();
                (k.to_string(), v.to_string())
            })
            .collect();

        let body_len = headers
            .get("Content-Length")
            .map(|v| v.parse::<usize>().unwrap())
            .unwrap_or(0);
        let body_start = head_end + 4;
        assert!(
            bytes.len() >= body_start + body_len,
            "truncated body: Content-Length {body_len}, {} bytes left",
            bytes.len() - body_start
        );
        let body = bytes[body_start..body_start + body_len].to_vec();
        bytes = &bytes[body_start + body_len..];

        out.push(WireResponse {
            status_line,
            header_lines,
            headers,
            body,
        });
    }

    out
}
