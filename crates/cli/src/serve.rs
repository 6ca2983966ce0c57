//! Minimal HTTP/1.x front end: one thread and one request per connection.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use stupidly_core::Response;
use stupidly_debug::Debugger;
use stupidly_view::{App, RequestOptions, ViewRequest};
use percent_encoding::percent_decode_str;
use url::Url;

/// Longest request or header line accepted before the connection is dropped.
const MAX_LINE: usize = 8 * 1024;

/// Headers read (and ignored) after the request line.
const MAX_HEADERS: usize = 100;

const READ_TIMEOUT: Duration = Duration::from_secs(10);
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a request target leads.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Route {
    View(ViewRequest),
    /// Rejected before reaching the resolver.
    NotFound,
}

/// Map a request target (`/a/b?x=1`) to a view request. `/` serves
/// `index_view`. Path segments are percent-decoded; a segment that decodes
/// to `..`, contains a separator or is not UTF-8 is refused.
pub(crate) fn route(target: &str, index_view: &str) -> Route {
    if !target.starts_with('/') {
        return Route::NotFound;
    }
    let raw_path = target.split(['?', '#']).next().unwrap_or_default();
    let Some(segments) = decode_segments(raw_path) else {
        return Route::NotFound;
    };
    // Url normalizes dot segments, so it only supplies the query.
    let Ok(url) = Url::parse(&format!("http://localhost{target}")) else {
        return Route::NotFound;
    };

    let name = if segments.is_empty() {
        index_view.to_string()
    } else {
        segments.join("/")
    };

    let data = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), serde_json::Value::String(v.into_owned())))
        .collect();

    Route::View(ViewRequest::new(name).with_data(data))
}

fn decode_segments(raw_path: &str) -> Option<Vec<String>> {
    let mut segments = Vec::new();
    for raw in raw_path.split('/') {
        let segment = percent_decode_str(raw).decode_utf8().ok()?.into_owned();
        if segment == ".." || segment.contains(['/', '\\', '\0']) {
            return None;
        }
        if !segment.is_empty() && segment != "." {
            segments.push(segment);
        }
    }
    Some(segments)
}

/// Split `GET /path HTTP/1.1` into method and target.
pub(crate) fn parse_request_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    Some((method, target))
}

/// Bind the listening socket.
pub(crate) fn bind(listen: &str) -> io::Result<TcpListener> {
    let listener = TcpListener::bind(listen)?;
    log::info!("Listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Connections served at once. Each holds one thread; further
/// connections are closed unanswered until a slot frees up.
const MAX_CONNECTIONS: usize = 64;

/// Counts connections in flight against a fixed cap.
#[derive(Debug, Clone)]
struct ConnectionSlots {
    active: Arc<AtomicUsize>,
    limit: usize,
}

impl ConnectionSlots {
    fn new(limit: usize) -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            limit,
        }
    }

    /// Take a slot, or `None` when all are in use. The slot is released
    /// when the returned guard drops.
    fn try_acquire(&self) -> Option<SlotGuard> {
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < self.limit).then_some(n + 1))
            .ok()?;
        Some(SlotGuard {
            active: Arc::clone(&self.active),
        })
    }

    fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

struct SlotGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Accept connections until the listener fails.
pub(crate) fn run(listener: TcpListener, app: Arc<App>) -> io::Result<()> {
    let slots = ConnectionSlots::new(MAX_CONNECTIONS);
    loop {
        let (stream, addr) = listener.accept()?;
        let origin = Instant::now();

        let Some(slot) = slots.try_acquire() else {
            log::warn!(
                "Connection refused from {}: limit of {} reached",
                addr,
                MAX_CONNECTIONS
            );
            drop(stream);
            continue;
        };
        log::debug!("Accepted connection from {} ({} active)", addr, slots.active());

        let app = Arc::clone(&app);
        thread::spawn(move || {
            let _slot = slot;
            if let Err(e) = handle_connection(stream, addr, &app, origin) {
                log::warn!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Read one request, answer it, close.
fn handle_connection(stream: TcpStream, addr: SocketAddr, app: &App, origin: Instant) -> io::Result<()> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;

    let mut reader = BufReader::new(stream.try_clone()?);
    let Some(request_line) = read_line(&mut reader)? else {
        return Ok(());
    };
    for _ in 0..MAX_HEADERS {
        match read_line(&mut reader)? {
            Some(line) if !line.is_empty() => continue,
            _ => break,
        }
    }

    let response = match parse_request_line(&request_line) {
        Some((method, target)) => {
            log::debug!("{} {} {}", addr, method, target);
            respond(app, target, origin)
        }
        None => {
            log::debug!("Malformed request line from {}: {:?}", addr, request_line);
            not_found(app, origin)
        }
    };

    let mut stream = stream;
    stream.write_all(response.to_http().as_bytes())?;
    stream.flush()
}

fn respond(app: &App, target: &str, origin: Instant) -> Response {
    match route(target, &app.settings().views.index_view) {
        Route::View(request) => app.handle(&request, RequestOptions::default(), origin).response,
        Route::NotFound => {
            log::info!("Refusing request target {:?}", target);
            not_found(app, origin)
        }
    }
}

fn not_found(app: &App, origin: Instant) -> Response {
    let mut response = Response::new(app.protocol());
    Debugger::new(app.debug_enabled(), origin).report(&mut response, 404, true);
    response
}

/// One CRLF- or LF-terminated line, `None` at EOF.
fn read_line(reader: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    let read = reader.take(MAX_LINE as u64 + 1).read_until(b'\n', &mut buf)?;
    if read == 0 {
        return Ok(None);
    }
    if buf.len() > MAX_LINE {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "request line too long"));
    }
    let line = String::from_utf8_lossy(&buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}
