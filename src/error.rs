use std::path::PathBuf;

use thiserror::Error;

/// Errors from the fallible edges of the widget.
///
/// `GaugeWidget::update` itself never returns an error: bad data degrades
/// into degenerate arcs instead. These cover loading fonts, parsing colors
/// and reading data views from JSON.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid color {0:?}, expected #rgb or #rrggbb")]
    InvalidColor(String),

    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not a usable TrueType/OpenType font")]
    InvalidFont(PathBuf),

    #[error("invalid data view: {0}")]
    DataView(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
