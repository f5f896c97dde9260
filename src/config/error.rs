//! Configuration errors.

use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}, line {1}")]
    Syntax(String, usize),
}

impl Error {
    /// Attach the line number the parser stopped at.
    pub fn config(source: &str, err: toml::de::Error) -> Self {
        let message = err.message().to_string();

        let line = match err.span() {
            Some(span) => {
                let end = span.start.min(source.len());
                source
                    .get(..end)
                    .map(|before| before.matches('\n').count() + 1)
                    .unwrap_or(0)
            }
            None => 0,
        };

        Self::Syntax(message, line)
    }
}
