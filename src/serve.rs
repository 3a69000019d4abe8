//! Preview server for the build output.
//!
//! A small `tiny_http` server with:
//!
//! - Static file serving from the build output directory
//! - Automatic `index.html` resolution for directories
//! - Generated directory listings
//! - Optional file watching and auto-rebuild (via `watch` module)
//! - Graceful shutdown on Ctrl+C
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Main Thread   │     │  Watcher Thread  │
//! │  (HTTP Server)  │     │  (full rebuild)  │
//! └────────┬────────┘     └────────┬─────────┘
//!          │ reads                 │ writes
//!          └──────────┬────────────┘
//!                     ▼
//!             config.build.output
//! ```

use crate::{config::SiteConfig, log, watch::watch_for_changes_blocking};
use anyhow::{Context, Result, anyhow};
use std::{
    fs,
    io::Cursor,
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

// ============================================================================
// Server Entry Point
// ============================================================================

/// Start the preview server, blocking until Ctrl+C.
///
/// Spawns the watcher thread when `[serve] watch` is enabled.
pub fn serve_site(config: &'static SiteConfig) -> Result<()> {
    let interface: IpAddr = config
        .serve
        .interface
        .parse()
        .with_context(|| format!("Invalid interface `{}`", config.serve.interface))?;

    let (server, addr) = try_bind_port(interface, config.serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://{}", addr);

    if config.serve.watch {
        std::thread::spawn(move || {
            if let Err(err) = watch_for_changes_blocking(config) {
                log!("watch"; "{err:#}");
            }
        });
    }

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &config.build.output) {
            log!("serve"; "request error: {e:#}");
        }
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

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

/// What a request URL maps to inside the output directory.
#[derive(Debug, PartialEq, Eq)]
enum Resolved {
    File(PathBuf),
    Listing(String),
    Forbidden,
    NotFound,
}

/// Map a raw request URL to a response.
///
/// Resolution order:
/// 1. Exact file match
/// 2. Directory with index.html
/// 3. Directory without index.html → generated listing
/// 4. Nothing found → 404
fn resolve_request(serve_root: &Path, url: &str) -> Resolved {
    let url_path = urlencoding::decode(url)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();

    // `?t=123` cache busters must not become part of the path
    let path_without_query = url_path.split('?').next().unwrap_or(&url_path);
    let request_path = path_without_query.trim_matches('/');

    if Path::new(request_path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Resolved::Forbidden;
    }

    let local_path = serve_root.join(request_path);
    if local_path.is_file() {
        return Resolved::File(local_path);
    }
    if local_path.is_dir() {
        let index_path = local_path.join("index.html");
        if index_path.is_file() {
            return Resolved::File(index_path);
        }
        if let Ok(listing) = generate_directory_listing(&local_path, request_path) {
            return Resolved::Listing(listing);
        }
    }

    Resolved::NotFound
}

fn handle_request(request: Request, serve_root: &Path) -> Result<()> {
    match resolve_request(serve_root, request.url()) {
        Resolved::File(path) => serve_file(request, &path),
        Resolved::Listing(html) => serve_html(request, html),
        Resolved::Forbidden => serve_status(request, 403, "403 Forbidden"),
        Resolved::NotFound => serve_status(request, 404, "404 Not Found"),
    }
}

// ============================================================================
// Response Helpers
// ============================================================================

fn content_type(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value).map_err(|()| anyhow!("Invalid content type `{value}`"))
}

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let response = Response::from_data(content).with_header(content_type(guess_content_type(path))?);
    request.respond(response)?;
    Ok(())
}

fn serve_html(request: Request, content: String) -> Result<()> {
    let response =
        Response::from_string(content).with_header(content_type("text/html; charset=utf-8")?);
    request.respond(response)?;
    Ok(())
}

fn serve_status(request: Request, code: u16, body: &str) -> Result<()> {
    let response = Response::new(
        StatusCode(code),
        vec![content_type("text/plain")?],
        Cursor::new(body.as_bytes().to_vec()),
        Some(body.len()),
        None,
    );
    request.respond(response)?;
    Ok(())
}

// ============================================================================
// Content Type Detection
// ============================================================================

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

        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",

        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",

        _ => "application/octet-stream",
    }
}

// ============================================================================
// Directory Listing
// ============================================================================

/// Generate an HTML listing of `dir_path`, directories first.
///
/// Hidden entries (leading `.`) are left out.
fn generate_directory_listing(dir_path: &Path, request_path: &str) -> std::io::Result<String> {
    let mut entries: Vec<(bool, String)> = fs::read_dir(dir_path)?
        .filter_map(Result::ok)
        .map(|entry| {
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            (is_dir, entry.file_name().to_string_lossy().into_owned())
        })
        .filter(|(_, name)| !name.starts_with('.'))
        .collect();
    entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let base = if request_path.is_empty() {
        String::new()
    } else {
        format!("/{request_path}")
    };

    let mut items = Vec::with_capacity(entries.len() + 1);
    if !request_path.is_empty() {
        let parent = Path::new(request_path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        items.push(format!(r#"<li><a href="/{parent}">..</a></li>"#));
    }
    for (is_dir, name) in &entries {
        let slash = if *is_dir { "/" } else { "" };
        items.push(format!(r#"<li><a href="{base}/{name}{slash}">{name}{slash}</a></li>"#));
    }

    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Index of /{request_path}</title></head>\n\
         <body>\n<h1>Index of /{request_path}</h1>\n<ul>\n{}\n</ul>\n</body>\n</html>\n",
        items.join("\n")
    ))
}
