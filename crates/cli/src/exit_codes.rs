//! CLI Exit Code Registry
//!
//! Single source of truth for `stupidly` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Success (`render` produced a 200)              |
//! | 1    | General error (unspecified)                    |
//! | 2    | Usage error (bad `--var`, unreadable `--data`) |
//! | 3    | View not found (`render` produced a 404)       |
//! | 4    | Runtime fault (`render` produced a 500)        |
//! | 5    | Configuration error                            |
//! | 6    | Server error (bind / accept failure)           |

use stupidly_core::Status;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing or malformed input files.
pub const EXIT_USAGE: u8 = 2;

/// The rendered view did not exist or was reserved.
pub const EXIT_NOT_FOUND: u8 = 3;

/// The render hit a runtime fault and an error page was displayed.
pub const EXIT_FAULT: u8 = 4;

/// Settings file could not be read, parsed or written.
pub const EXIT_CONFIG: u8 = 5;

/// The HTTP server could not bind or stopped accepting.
pub const EXIT_SERVER: u8 = 6;

/// Map a response status to the `render` exit code.
pub fn status_exit_code(status: Status) -> u8 {
    match status.code {
        _ if status.is_success() => EXIT_SUCCESS,
        404 => EXIT_NOT_FOUND,
        500..=599 => EXIT_FAULT,
        _ => EXIT_ERROR,
    }
}
