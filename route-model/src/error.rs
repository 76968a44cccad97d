//! Module for the error management
use thiserror::Error;

/// An error that can occur when loading a route.
#[derive(Error, Debug)]
pub enum Error {
    /// The route has no step at all
    #[error("a route needs at least one step")]
    EmptyRoute,
    /// Generic Input/Output error while reading a file
    #[error("impossible to read route file")]
    IO(#[from] std::io::Error),
    /// The route is not valid JSON or does not have the expected shape
    #[error("impossible to parse route: {0}")]
    Json(#[from] serde_json::Error),
}
