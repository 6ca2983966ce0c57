//! The response stream a request writes into.
//!
//! A response is buffered: status and body are collected here and serialized
//! once the request is finished. Halting a response is terminal. After
//! `halt()` no status change and no further output is accepted.

use std::fmt;

/// An HTTP status code with its reason phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub code: u16,
    pub reason: &'static str,
}

impl Status {
    pub const OK: Status = Status { code: 200, reason: "OK" };
    pub const NOT_FOUND: Status = Status { code: 404, reason: "Not Found" };
    pub const INTERNAL_SERVER_ERROR: Status = Status {
        code: 500,
        reason: "Internal Server Error",
    };

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}

/// Buffered response for a single request.
#[derive(Debug, Clone)]
pub struct Response {
    protocol: String,
    status: Status,
    body: String,
    halted: bool,
}

impl Response {
    /// Create an empty `200 OK` response for the given protocol string
    /// (e.g. `HTTP/1.1`).
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            status: Status::OK,
            body: String::new(),
            halted: false,
        }
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Set the status. Returns false (and changes nothing) once halted.
    pub fn set_status(&mut self, status: Status) -> bool {
        if self.halted {
            log::debug!("status {} dropped: response already halted", status);
            return false;
        }
        self.status = status;
        true
    }

    /// Append output. Returns false (and writes nothing) once halted.
    pub fn write(&mut self, text: &str) -> bool {
        if self.halted {
            log::debug!("{} bytes dropped: response already halted", text.len());
            return false;
        }
        self.body.push_str(text);
        true
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Stop the response. Nothing written afterwards reaches the client.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// `<protocol> <code> <reason>`
    pub fn status_line(&self) -> String {
        format!("{} {}", self.protocol, self.status)
    }

    /// Serialize as a complete HTTP/1.x message with `Connection: close`.
    pub fn to_http(&self) -> String {
        format!(
            "{}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status_line(),
            self.body.len(),
            self.body
        )
    }
}
