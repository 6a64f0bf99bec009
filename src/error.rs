use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    /// No flow source exists at the given path
    MissingInput(PathBuf),
    /// The input could not be parsed or does not have the expected shape
    MalformedInput(String),
    ArtifactNotFound(String),
    SerializationError(String),
}

impl Error {
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedInput(message.into())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::MissingInput(path) => {
                write!(f, "No flow source found at {}", path.display())
            }
            Error::MalformedInput(msg) => write!(f, "Malformed input: {}", msg),
            Error::ArtifactNotFound(name) => write!(f, "Artifact not found: {}", name),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML: {}", err))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::MalformedInput(format!("invalid URL: {}", err))
    }
}
