//! TCP server that hands receiver connections to HME sessions.
//!
//! # Connection flow
//!
//! ```text
//! accept ─▶ read request head ─▶ route
//!             ├─ /TiVoConnect     → XML listing, close
//!             ├─ /<name>/         → "HTTP/1.0 200 OK" + HME content type,
//!             │                     then the socket becomes the session's
//!             │                     transport on a blocking thread
//!             ├─ /<name>/<path>   → file from the app's resource directory
//!             └─ anything else    → 404
//! ```
//!
//! Sessions use blocking I/O, so each one runs on Tokio's blocking pool via
//! `spawn_blocking`; the accept loop itself never blocks.

use std::io::{self, Cursor, Read};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use hme_core::{Duplex, Session, SessionOutcome};
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::application::registry::{AppEntry, AppRegistry};
use crate::infrastructure::network::request::{
    content_type_for, read_request_head, resolve_resource, route, RequestError, Route,
};
use crate::infrastructure::storage::config::ServerConfig;

/// How often the accept loop checks the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Time allowed for a receiver to send its request head.
const HEAD_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("timed out waiting for the request head")]
    HeadTimeout,

    #[error("session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Settings the server needs, resolved from [`ServerConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
    pub write_buffer_size: usize,
    pub read_timeout: Option<Duration>,
}

impl ServerSettings {
    /// # Errors
    ///
    /// Returns an error if `bind_address:port` is not a valid socket address.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let bind_addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
            .parse()
            .with_context(|| {
                format!(
                    "invalid bind address: '{}:{}'",
                    config.bind_address, config.port
                )
            })?;
        Ok(Self {
            bind_addr,
            write_buffer_size: config.write_buffer_size,
            read_timeout: config.read_timeout_secs.map(Duration::from_secs),
        })
    }
}

/// Binds the listener and serves until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(
    settings: ServerSettings,
    registry: Arc<AppRegistry>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind HME listener on {}", settings.bind_addr))?;
    info!("HME host listening on {}", settings.bind_addr);
    serve(listener, Arc::new(settings), registry, running).await;
    Ok(())
}

/// Accepts connections on `listener` until `running` is cleared.
pub async fn serve(
    listener: TcpListener,
    settings: Arc<ServerSettings>,
    registry: Arc<AppRegistry>,
    running: Arc<AtomicBool>,
) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("connection from {peer_addr}");
                let settings = Arc::clone(&settings);
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, &settings, &registry).await {
                        warn!("connection from {peer_addr} failed: {e}");
                    }
                });
            }
            Ok(Err(e)) => error!("accept error: {e}"),
            // No connection within the poll interval.
            Err(_) => {}
        }
    }
}

/// Serves one connection to completion.
///
/// # Errors
///
/// Returns the first I/O, request or session-task error encountered.
pub async fn handle_connection(
    stream: TcpStream,
    settings: &ServerSettings,
    registry: &AppRegistry,
) -> Result<(), ServerError> {
    let mut reader = BufReader::new(stream);
    let head = timeout(HEAD_TIMEOUT, read_request_head(&mut reader))
        .await
        .map_err(|_| ServerError::HeadTimeout)??;
    debug!(method = %head.method, target = %head.target, "request");

    if head.method != "GET" {
        return respond(reader.get_mut(), "405 Method Not Allowed", "text/plain", b"GET only").await;
    }

    match route(&head.target) {
        Route::Listing => {
            info!("listing requested");
            let body = listing_xml(registry, head.host.as_deref());
            respond(reader.get_mut(), "200 OK", "text/xml", body.as_bytes()).await
        }
        Route::App(name) => match registry.get(&name) {
            Some(entry) => {
                let outcome = hijack(reader, entry, settings).await?;
                info!(app = %name, ?outcome, "session ended");
                Ok(())
            }
            None => not_found(reader.get_mut(), &format!("No application found for {name}")).await,
        },
        Route::Resource { app, path } => {
            let Some(entry) = registry.get(&app) else {
                return not_found(reader.get_mut(), &format!("No application found for {app}")).await;
            };
            serve_resource(reader.get_mut(), &entry, &path).await
        }
        Route::NotFound => not_found(reader.get_mut(), "Not found").await,
    }
}

/// Answers the request, then runs a session over the same socket.
async fn hijack(
    reader: BufReader<TcpStream>,
    entry: Arc<AppEntry>,
    settings: &ServerSettings,
) -> Result<SessionOutcome, ServerError> {
    info!(app = %entry.name(), "running application");
    // The receiver may already have sent its handshake bytes.
    let early = reader.buffer().to_vec();
    let mut stream = reader.into_inner();
    let header = format!("HTTP/1.0 200 OK\r\nContent-Type: {}\r\n\r\n", entry.content_type);
    stream.write_all(header.as_bytes()).await?;
    stream.flush().await?;

    let stream = stream.into_std()?;
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(settings.read_timeout)?;
    stream.set_nodelay(true)?;
    let writer = stream.try_clone()?;
    let transport = Duplex::new(Cursor::new(early).chain(stream), writer);

    let write_buffer = settings.write_buffer_size;
    let outcome = tokio::task::spawn_blocking(move || -> io::Result<SessionOutcome> {
        let session = Session::with_write_buffer(transport, write_buffer)?;
        let mut app = entry.instantiate();
        Ok(session.run(app.as_mut()))
    })
    .await??;
    Ok(outcome)
}

async fn serve_resource(
    stream: &mut TcpStream,
    entry: &AppEntry,
    path: &str,
) -> Result<(), ServerError> {
    let Some(file) = entry
        .resource_dir
        .as_deref()
        .and_then(|dir| resolve_resource(dir, path))
    else {
        warn!(app = %entry.name(), path, "invalid resource path");
        return not_found(stream, &format!("Invalid resource path: {path}")).await;
    };

    match tokio::fs::read(&file).await {
        Ok(body) => {
            info!(app = %entry.name(), path, "serving resource");
            respond(stream, "200 OK", content_type_for(&file), &body).await
        }
        Err(e) => {
            debug!(path = %file.display(), error = %e, "resource unavailable");
            not_found(stream, &format!("No such resource: {path}")).await
        }
    }
}

async fn not_found(stream: &mut TcpStream, message: &str) -> Result<(), ServerError> {
    respond(stream, "404 Not Found", "text/plain", message.as_bytes()).await
}

async fn respond(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    body: &[u8],
) -> Result<(), ServerError> {
    let head = format!(
        "HTTP/1.0 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.flush().await?;
    stream.shutdown().await?;
    Ok(())
}

// ── Listing ───────────────────────────────────────────────────────────────────

/// The `TiVoConnect` container listing every hosted application.
///
/// Urls are absolute when the request carried a `Host` header.
pub fn listing_xml(registry: &AppRegistry, host: Option<&str>) -> String {
    let base = host.map(|h| format!("http://{h}")).unwrap_or_default();
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<TiVoContainer>\n");
    xml.push_str("  <Details>\n");
    xml.push_str("    <Title>HME Host</Title>\n");
    xml.push_str("    <ContentType>x-container/tivo-server</ContentType>\n");
    xml.push_str("    <SourceFormat>x-container/folder</SourceFormat>\n");
    xml.push_str(&format!("    <TotalItems>{}</TotalItems>\n", registry.len()));
    xml.push_str("  </Details>\n");
    for entry in registry.iter() {
        xml.push_str("  <Item>\n    <Details>\n");
        xml.push_str(&format!("      <Title>{}</Title>\n", escape_xml(entry.title())));
        xml.push_str(&format!(
            "      <ContentType>{}</ContentType>\n",
            escape_xml(&entry.content_type)
        ));
        xml.push_str("      <SourceFormat>x-container/folder</SourceFormat>\n");
        xml.push_str(&format!("      <Uuid>{}</Uuid>\n", entry.uuid));
        xml.push_str("    </Details>\n    <Links>\n");
        xml.push_str(&format!(
            "      <Content><Url>{}</Url></Content>\n",
            escape_xml(&format!("{base}{}", entry.url))
        ));
        xml.push_str(&format!(
            "      <CustomIcon><Url>{}</Url><ContentType>image/*</ContentType><AcceptsParams>No</AcceptsParams></CustomIcon>\n",
            escape_xml(&format!("{base}{}", entry.icon_url))
        ));
        xml.push_str("    </Links>\n  </Item>\n");
    }
    xml.push_str("  <ItemStart>0</ItemStart>\n");
    xml.push_str(&format!("  <ItemCount>{}</ItemCount>\n", registry.len()));
    xml.push_str("</TiVoContainer>\n");
    xml
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
