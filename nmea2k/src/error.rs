use std::fmt;

/// Errors raised while extracting a single field from a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The catalog asked for a byte width the wire format doesn't define.
    UnsupportedWidth { num_bytes: usize },
    /// `ASCII string starting with length byte` has no decoder yet.
    Unimplemented { type_name: String },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::UnsupportedWidth { num_bytes } => {
                write!(f, "unexpected field width of {num_bytes} bytes")
            }
            ExtractError::Unimplemented { type_name } => {
                write!(f, "decoder for field type '{type_name}' is not implemented")
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// Errors raised while loading and normalizing the PGN catalog.
#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Json(serde_json::Error),
    MissingPgns,
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Io(e) => write!(f, "failed to read PGN catalog: {e}"),
            CatalogError::Json(e) => write!(f, "failed to parse PGN catalog: {e}"),
            CatalogError::MissingPgns => write!(f, "PGN catalog is missing the top-level 'PGNs' key"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io(e) => Some(e),
            CatalogError::Json(e) => Some(e),
            CatalogError::MissingPgns => None,
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        CatalogError::Io(e)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Json(e)
    }
}

/// An individual consumer's failure to process one record.
/// Logged by the fan-out; never propagated past it.
#[derive(Debug)]
pub struct ConsumerError(pub String);

impl fmt::Display for ConsumerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConsumerError {}

impl From<String> for ConsumerError {
    fn from(s: String) -> Self {
        ConsumerError(s)
    }
}

impl From<&str> for ConsumerError {
    fn from(s: &str) -> Self {
        ConsumerError(s.to_string())
    }
}
