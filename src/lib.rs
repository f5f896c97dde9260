//! Read/write splitting over one primary and a set of read replicas.
//!
//! Reads are spread round-robin across replicas and fail over to the
//! next replica when one can't serve them. Writes, transactions and
//! non-`SELECT` statements always go to the primary.

pub mod backend;
pub mod config;
pub mod frontend;

pub use backend::pool::Error;
pub use backend::{Context, Target, TransactionOptions};
pub use frontend::router::{Database, Router};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use std::io::IsTerminal;

/// Setup the logger, so `info!`, `debug!`
/// and other macros actually output something.
///
/// Using try_init and ignoring errors to allow
/// for use in tests (setting up multiple times).
pub fn logger() {
    let format = fmt::layer()
        .with_ansi(std::io::stderr().is_terminal())
        .with_file(false);
    #[cfg(not(debug_assertions))]
    let format = format.with_target(false);

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(format)
        .with(filter)
        .try_init();
}
