use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid movie reference: {0}")]
    InvalidReference(String),

    #[error(transparent)]
    Network(#[from] HttpError),

    #[error("could not find mediaviewer: {0}")]
    MediaViewerNotFound(String),

    #[error("could not find any posters: {0}")]
    NoPostersFound(String),

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("could not create target directory {path:?}: {source}")]
    TargetDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("task join error: {0}")]
    Join(String),
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request to {url} failed: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("could not read body of {url}: {source}")]
    BodyUnreadable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
