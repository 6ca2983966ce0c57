//! The Debugger
//!
//! Reports HTTP errors and displays runtime faults for one request.
//!
//! Display tier depends on the debug flag:
//!
//! - off: every fault shows "Something went wrong" on the simple page
//! - on: faults show their raw payload on the full page, unescaped
//!
//! The process-wide part is [`Debugger::start`], which installs a panic hook
//! (once) that records panics as faults. Everything else is per request: each
//! request owns a `Debugger`, and with it a [`Profiler`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;
use std::time::Instant;

use stupidly_core::{fault, Fault, Response, Severity, Status};
use stupidly_render::Renderer;

use crate::errorpage::{DisplayTier, ErrorPage};
use crate::profiler::Profiler;
use crate::timing::elapsed_since;

/// Shown whenever the debug flag is off.
pub const GENERIC_MESSAGE: &str = "Something went wrong";

/// Shown for reported 404s.
pub const NOT_FOUND_MESSAGE: &str = "404 Not Found";

static REGISTER: Once = Once::new();
static REGISTERED: AtomicBool = AtomicBool::new(false);

/// What a reported code turns into.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub status: Status,
    pub tier: DisplayTier,
    /// `None` means status line only, no page.
    pub message: Option<String>,
}

impl ErrorReport {
    /// Map a reported code to its status and page.
    pub fn for_code(code: u16) -> Self {
        match code {
            404 => Self {
                status: Status::NOT_FOUND,
                tier: DisplayTier::Simple,
                message: Some(NOT_FOUND_MESSAGE.to_string()),
            },
            500 => Self {
                status: Status::INTERNAL_SERVER_ERROR,
                tier: DisplayTier::Simple,
                message: Some(GENERIC_MESSAGE.to_string()),
            },
            _ => Self {
                status: Status::INTERNAL_SERVER_ERROR,
                tier: DisplayTier::Simple,
                message: None,
            },
        }
    }
}

pub struct Debugger {
    debug: bool,
    origin: Instant,
    renderer: Renderer,
    profiler: Profiler,
}

impl Debugger {
    /// Create a request debugger. `origin` is when the request (or process)
    /// started; it anchors the profiler and `exec_time`.
    pub fn new(debug: bool, origin: Instant) -> Self {
        Self {
            debug,
            origin,
            renderer: Renderer::new(),
            profiler: Profiler::new(origin),
        }
    }

    /// Register the process-wide panic hook. Only the first call installs
    /// it; returns true for that call.
    pub fn start() -> bool {
        let mut installed = false;
        REGISTER.call_once(|| {
            panic::set_hook(Box::new(|info| {
                let message = panic_message(info.payload());
                let mut fault = Fault::new(Severity::Panic, message);
                if let Some(loc) = info.location() {
                    fault = fault.at(loc.file(), Some(loc.line()));
                }
                log::error!("{}", fault);
                fault::record(fault);
            }));
            REGISTERED.store(true, Ordering::SeqCst);
            installed = true;
        });
        installed
    }

    /// Whether `start()` has run in this process.
    pub fn is_registered() -> bool {
        REGISTERED.load(Ordering::SeqCst)
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn profiler_mut(&mut self) -> &mut Profiler {
        &mut self.profiler
    }

    /// Emit the status for `code`, render its page, and halt the response
    /// when `terminate` is set.
    pub fn report(&self, response: &mut Response, code: u16, terminate: bool) {
        let report = ErrorReport::for_code(code);
        log::warn!("reporting {} as {}", code, report.status);

        response.set_status(report.status);
        if let Some(message) = report.message {
            self.render_page(response, &ErrorPage::simple(message));
        }

        if terminate {
            response.halt();
        }
    }

    /// Display the most recent fault recorded on this thread, if any.
    /// Returns true when a fault was displayed.
    pub fn error_handler(&self, response: &mut Response) -> bool {
        let Some(fault) = fault::take_last() else {
            return false;
        };
        log::error!("unhandled {}", fault);

        let page = if self.debug {
            ErrorPage::Full(fault)
        } else {
            ErrorPage::simple(GENERIC_MESSAGE)
        };
        self.display(response, &page);
        true
    }

    /// Set `500` and render `page`.
    pub fn display(&self, response: &mut Response, page: &ErrorPage) {
        response.set_status(Status::INTERNAL_SERVER_ERROR);
        self.render_page(response, page);
    }

    /// Run request work with fault interception. A returned fault or a panic
    /// is recorded, then `error_handler` runs unconditionally, the same way
    /// a shutdown handler would. Returns true when a fault was displayed.
    pub fn guard<F>(&mut self, response: &mut Response, work: F) -> bool
    where
        F: FnOnce(&mut Debugger, &mut Response) -> Result<(), Fault>,
    {
        fault::clear();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(&mut *self, &mut *response)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(fault)) => fault::record(fault),
            Err(payload) => {
                let hooked = matches!(fault::last(), Some(ref f) if f.severity == Severity::Panic);
                if !hooked {
                    fault::record(Fault::new(Severity::Panic, panic_message(payload.as_ref())));
                }
            }
        }

        self.error_handler(response)
    }

    /// Append the request execution time.
    pub fn exec_time(&self, response: &mut Response) {
        let ms = elapsed_since(self.origin).as_millis();
        response.write(&format!(
            "<span style=\"display: table; margin: 0 auto;\">Request takes {ms} milliseconds</span>"
        ));
    }

    /// Render an error page into the response. On failure the status line
    /// stands alone.
    fn render_page(&self, response: &mut Response, page: &ErrorPage) {
        self.render_page_from(response, page, page.source());
    }

    fn render_page_from(&self, response: &mut Response, page: &ErrorPage, source: &str) {
        match page.render_with(&self.renderer, source) {
            Ok(html) => {
                response.write(&html);
            }
            Err(e) => {
                log::error!("{} error page failed to render: {}", page.tier(), e);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
