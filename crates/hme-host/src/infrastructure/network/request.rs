//! The minimal HTTP a receiver speaks before the HME stream starts.
//!
//! A receiver opens a connection with an ordinary `GET` request.  Only the
//! request line and the `Host` header matter; the rest of the head is read
//! and discarded.  Three request forms are recognised:
//!
//! ```text
//! GET /TiVoConnect?...     listing of hosted applications
//! GET /<name>/             start an HME session with application <name>
//! GET /<name>/<path>       a file from the application's resource directory
//! ```

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Largest request head accepted, in bytes.
pub const MAX_HEAD_SIZE: usize = 8192;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("I/O error reading request: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed before a complete request head")]
    Closed,

    #[error("request head exceeds {MAX_HEAD_SIZE} bytes")]
    TooLarge,

    #[error("malformed request line: {0:?}")]
    Malformed(String),
}

/// The parts of a request head the server uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub host: Option<String>,
}

/// Where a request target leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Listing,
    App(String),
    Resource { app: String, path: String },
    NotFound,
}

/// Parses `METHOD TARGET HTTP/x.y`.
///
/// # Errors
///
/// Returns [`RequestError::Malformed`] if the line does not have three parts
/// or the version is not HTTP.
pub fn parse_request_line(line: &str) -> Result<(String, String), RequestError> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(target), Some(version), None) if version.starts_with("HTTP/") => {
            Ok((method.to_string(), target.to_string()))
        }
        _ => Err(RequestError::Malformed(line.to_string())),
    }
}

/// Reads a request head up to and including the blank line.
///
/// Bytes after the head stay buffered in `reader`.
///
/// # Errors
///
/// [`RequestError::Closed`] if the stream ends early, [`RequestError::TooLarge`]
/// for an oversized head, or [`RequestError::Malformed`] for a bad request line.
pub async fn read_request_head<R>(reader: &mut R) -> Result<RequestHead, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut total = 0;
    let mut line = String::new();

    let request_line = loop {
        read_head_line(reader, &mut line, &mut total).await?;
        // Tolerate stray blank lines before the request line.
        if !line.trim().is_empty() {
            break line.trim().to_string();
        }
    };
    let (method, target) = parse_request_line(&request_line)?;

    let mut host = None;
    loop {
        read_head_line(reader, &mut line, &mut total).await?;
        let header = line.trim_end_matches(['\r', '\n']);
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("host") {
                host = Some(value.trim().to_string());
            }
        }
    }

    Ok(RequestHead { method, target, host })
}

async fn read_head_line<R>(reader: &mut R, line: &mut String, total: &mut usize) -> Result<(), RequestError>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let n = reader.read_line(line).await?;
    if n == 0 {
        return Err(RequestError::Closed);
    }
    *total += n;
    if *total > MAX_HEAD_SIZE {
        return Err(RequestError::TooLarge);
    }
    Ok(())
}

/// Maps a request target to a [`Route`]. The query string is ignored.
pub fn route(target: &str) -> Route {
    let path = target.split(['?', '#']).next().unwrap_or_default();
    if path.starts_with("/TiVoConnect") {
        return Route::Listing;
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Route::NotFound;
    };
    let (name, resource) = rest.split_once('/').unwrap_or((rest, ""));
    if name.is_empty() {
        return Route::NotFound;
    }
    let name = percent_decode(name);
    if resource.is_empty() {
        Route::App(name)
    } else {
        Route::Resource {
            app: name,
            path: percent_decode(resource),
        }
    }
}

/// Joins `relative` onto `root`, refusing anything that would leave `root`.
pub fn resolve_resource(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (resolved != root).then_some(resolved)
}

/// Content type sent with a served file.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("mp3") => "audio/mpeg",
        Some("ttf") => "font/ttf",
        Some("mpg" | "mpeg") => "video/mpeg",
        Some("xml") => "text/xml",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Decodes `%XX` escapes; malformed escapes are kept as written.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
