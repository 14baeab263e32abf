use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid publication identifier: {0:?}")]
    #[diagnostic(help("use an OpenAlex work id (W...), an openalex.org URL, or a DOI (10.xxxx/...)"))]
    InvalidIdentifier(String),

    #[error("seed publication could not be fetched: {0}")]
    SeedUnavailable(String),

    #[error("OpenAlex request failed: {0}")]
    OpenAlexHttp(String),

    #[error("OpenAlex returned status {status}: {message}")]
    OpenAlexStatus { status: u16, message: String },

    #[error("failed to decode OpenAlex response: {0}")]
    OpenAlexDecode(String),

    #[error("config file not found: {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    ConfigValue(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
