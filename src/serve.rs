//! Development server.
//!
//! Serves the output directory of the latest build with `tiny_http`. Files
//! are read at request time, so a request always sees whatever the last
//! published build left on disk.
//!
//! ```text
//! GET /blog/?page=2
//!      │
//!      ├── decode, drop query, reject `..`
//!      ├── <root>/blog          is a file?  ──► 200
//!      ├── <root>/blog/index.html          ──► 200
//!      └── <root>/404.html or built-in     ──► 404
//! ```

use std::{
    fs,
    net::{SocketAddr, ToSocketAddrs},
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use tiny_http::{Header, Request, Response, Server, StatusCode};

use crate::{debug, log};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

const NOT_FOUND_PAGE: &str = "<!DOCTYPE html>
<html>
<head><meta charset=\"utf-8\"><title>Not Found</title></head>
<body><h1>404</h1><p>Nothing was built at this address.</p></body>
</html>
";

/// A bound server plus the URL it ended up on.
pub struct DevServer {
    server: Arc<Server>,
    /// `http://host:port` as the user asked for it.
    pub url: String,
}

impl DevServer {
    pub fn bind(host: &str, port: u16) -> Result<Self> {
        let (server, addr) = try_bind_port(host, port, MAX_PORT_RETRIES)?;
        Ok(Self {
            server: Arc::new(server),
            url: format!("http://{host}:{}", addr.port()),
        })
    }

    /// Make Ctrl+C stop [`DevServer::run`].
    pub fn stop_on_ctrlc(&self) -> Result<()> {
        let server = Arc::clone(&self.server);
        ctrlc::set_handler(move || {
            log!("serve"; "shutting down...");
            server.unblock();
        })
        .context("Failed to set Ctrl+C handler")
    }

    /// Serve `root` until the server is unblocked.
    pub fn run(&self, root: &Path) {
        log!("serve"; "{}", self.url);
        for request in self.server.incoming_requests() {
            if let Err(e) = handle_request(request, root) {
                log!("serve"; "request error: {e}");
            }
        }
    }
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(host: &str, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = (host, port)
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve host: {host}"))?
            .next()
            .ok_or_else(|| anyhow!("No address found for host: {host}"))?;

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Request Handling
// ============================================================================

fn handle_request(request: Request, root: &Path) -> Result<()> {
    debug!("serve"; "{} {}", request.method(), request.url());

    match resolve(root, request.url()) {
        Some(path) => serve_file(request, &path, root),
        None => serve_not_found(request, root),
    }
}

/// Map a request URL to a file under `root`.
fn resolve(root: &Path, url: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(url).ok()?;
    let path = decoded.split(['?', '#']).next().unwrap_or_default();
    let request_path = Path::new(path.trim_start_matches('/'));

    if request_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let local_path = root.join(request_path);
    if local_path.is_file() {
        return Some(local_path);
    }

    let index_path = local_path.join("index.html");
    index_path.is_file().then_some(index_path)
}

fn content_type_header(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value)
        .map_err(|()| anyhow!("Invalid Content-Type header: {value}"))
}

fn serve_file(request: Request, path: &Path, root: &Path) -> Result<()> {
    // The file may vanish between resolution and read while a build publishes
    let Ok(content) = fs::read(path) else {
        return serve_not_found(request, root);
    };
    let response = Response::from_data(content)
        .with_header(content_type_header(guess_content_type(path))?);
    request.respond(response)?;
    Ok(())
}

fn serve_not_found(request: Request, root: &Path) -> Result<()> {
    let body = fs::read(root.join("404.html")).unwrap_or_else(|_| NOT_FOUND_PAGE.as_bytes().to_vec());
    let response = Response::from_data(body)
        .with_status_code(StatusCode(404))
        .with_header(content_type_header("text/html; charset=utf-8")?);
    request.respond(response)?;
    Ok(())
}

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
