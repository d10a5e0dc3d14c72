//! # Logging Module
//!
//! edheader writes to two channels:
//!
//! - **Progress lines** about individual files. [`info_log!`] prints them to
//!   stdout unless [`set_quiet`] was called; [`verbose_log!`] prints extra
//!   detail to stderr once [`set_verbose`] was called. The summaries and
//!   file lists in `output` are printed directly and consult the same mode.
//! - **Diagnostics** from the scanner, the property providers and the worker
//!   pool are `tracing` events on stderr. [`init_tracing`] installs an
//!   `EnvFilter` subscriber scoped to the `edheader` target: `warn` by
//!   default, `info`/`debug`/`trace` for `-v`/`-vv`/`-vvv`, `error` under
//!   `--quiet`. A `RUST_LOG` value replaces the flag-derived filter.
//!
//! [`ColorMode`] decides whether progress lines are highlighted.
//!
//! ```rust
//! use edheader::logging::{ColorMode, set_verbose};
//! use edheader::{info_log, verbose_log};
//!
//! ColorMode::Never.apply();
//! set_verbose();
//!
//! verbose_log!("Scanning {}", "src/lib.rs");
//! info_log!("Header inserted: {}", "src/lib.rs");
//! ```

mod modes;

pub use modes::{ColorMode, init_tracing, is_quiet, is_verbose, set_quiet, set_verbose};
use owo_colors::{OwoColorize, Stream};

/// Per-file detail shown only after [`set_verbose`]; printed to stderr.
#[macro_export]
macro_rules! verbose_log {
    ($($arg:tt)*) => {
        if $crate::logging::is_verbose() {
            eprintln!($($arg)*);
        }
    };
}

/// Per-file progress line on stdout, dropped after [`set_quiet`].
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        if !$crate::logging::is_quiet() {
            $crate::logging::print_info_log(&format!($($arg)*));
        }
    };
}

#[doc(hidden)]
pub fn print_info_log(message: &str) {
  println!("{}", message.if_supports_color(Stream::Stdout, |m| m.yellow()));
}
