use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArborError>;

#[derive(Error, Debug)]
pub enum ArborError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Storage node {node} failed: {message}")]
    Storage { node: String, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),
}

impl ArborError {
    /// Exception name carried in `exception_type` on the wire.
    pub fn exception_type(&self) -> &'static str {
        match self {
            ArborError::NotFound(_) => "FileNotFoundException",
            ArborError::InvalidArgument(_) => "IllegalArgumentException",
            ArborError::IllegalState(_) => "IllegalStateException",
            ArborError::NotADirectory(_) => "NotADirectoryException",
            ArborError::Storage { .. } => "StorageException",
            ArborError::Config(_) | ArborError::Io(_) | ArborError::Json(_) => {
                "InternalServerError"
            }
        }
    }
}

impl From<serde_json::Error> for ArborError {
    fn from(err: serde_json::Error) -> Self {
        ArborError::Json(err.to_string())
    }
}

impl From<std::io::Error> for ArborError {
    fn from(err: std::io::Error) -> Self {
        ArborError::Io(err)
    }
}

impl From<reqwest::Error> for ArborError {
    fn from(err: reqwest::Error) -> Self {
        let node = err
            .url()
            .and_then(|url| url.host_str().map(|host| (host.to_string(), url.port())))
            .map(|(host, port)| match port {
                Some(port) => format!("{}:{}", host, port),
                None => host,
            })
            .unwrap_or_else(|| "unknown".to_string());
        ArborError::Storage {
            node,
            message: err.to_string(),
        }
    }
}
