use std::{
    error,
    fmt::{self, Display},
};

#[derive(Debug)]
pub enum Error {
    /// The input document is not valid JSON
    Document(serde_json::Error),
    /// The JSONPath expression cannot be parsed
    Path(String),
    /// A resolved location cannot be turned into a JSON Pointer
    InvalidLocation(String),
    /// The raw patch value is not valid JSON
    ValueDecode(serde_json::Error),
    /// The patch executor refused an operation
    PatchApply(String),
    /// The operation name is not one of the six JSON Patch operations
    UnknownOperation(String),
    /// The command-line arguments are invalid
    Usage(String),
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::Path(format!("invalid regex: {e}"))
    }
}

impl From<clap::Error> for Error {
    fn from(e: clap::Error) -> Self {
        Error::Usage(e.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Document(e) => write!(f, "Error during parsing json: {e}"),
            Error::Path(msg) => write!(f, "Error during parsing jpath: {msg}"),
            Error::InvalidLocation(msg) => write!(f, "Invalid location: {msg}"),
            Error::ValueDecode(e) => write!(f, "Error during unmarshaling value: {e}"),
            Error::PatchApply(msg) => write!(f, "Error during patch apply: {msg}"),
            Error::UnknownOperation(op) => write!(
                f,
                "Unknown operation `{op}`: expected one of add, remove, replace, move, copy, test"
            ),
            Error::Usage(msg) => write!(f, "Usage error: {msg}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Document(e) | Error::ValueDecode(e) => Some(e),
            _ => None,
        }
    }
}
