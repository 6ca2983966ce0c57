//! `stupidly-debug`: error reporting, error pages and request profiling.
//!
//! - [`Debugger`] turns not-found reports and runtime faults into a status
//!   line plus an error page
//! - [`Profiler`] records named checkpoint intervals for one request
//! - [`timing`] holds the fixed-point time-difference primitive both use

pub mod debugger;
pub mod errorpage;
pub mod profiler;
pub mod timing;

pub use debugger::{Debugger, ErrorReport};
pub use errorpage::{DisplayTier, ErrorPage};
pub use profiler::{ProfileEntry, ProfileReport, Profiler};
pub use timing::Elapsed;
