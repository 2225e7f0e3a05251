//! Error type used within crate with From for commonly used crate errors
use std::error;
use std::{fmt, io};

/// Result type used within crate
pub type Result<T> = std::result::Result<T, Error>;

/// Contained with [`ErrorKind`] to provide more context
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ErrorArg<E, G>
where
    E: fmt::Debug,
    G: fmt::Debug,
{
    expected: E,
    got: G,
}

impl fmt::Display for ErrorArg<usize, usize> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Expected: {}, Got: {}", self.expected, self.got)
    }
}

impl<E, G> ErrorArg<E, G>
where
    E: fmt::Debug,
    G: fmt::Debug,
{
    /// New ErrorArg
    pub fn new(expected: E, got: G) -> ErrorArg<E, G> {
        ErrorArg { expected, got }
    }

    /// The expected value
    pub fn expected(&self) -> &E {
        &self.expected
    }

    /// The actual value
    pub fn got(&self) -> &G {
        &self.got
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
/// Kind of error produced
pub enum ErrorKind {
    /// A record claims more bytes than the buffer or the declared total length can satisfy
    Truncated(ErrorArg<usize, usize>),
    /// Zero-length record, wrong descriptor type or a field value that cannot be decoded
    Malformed,
    /// Query target interface, alternate setting, unit ID or index does not exist in the model
    NotFound,
    /// Protocol version, descriptor subtype or operation not modelled; MIDI streaming for example
    Unsupported,
    /// Invalid arg for method or cli
    InvalidArg,
    /// Error parsing config file
    Config,
    /// [`std::io::Error`] probably not found when reading file to parse
    Io,
    /// Error parsing a string into a value - hex descriptor dumps and json
    Parsing,
    /// Error From other crate without enum variant
    Other(&'static str),
}

#[derive(Debug, PartialEq, Eq, Clone)]
/// Crate error which impl [`std::error`]
pub struct Error {
    /// The [`ErrorKind`]
    pub kind: ErrorKind,
    /// String description
    pub message: String,
}

impl Error {
    /// New error helper
    pub fn new(kind: ErrorKind, message: &str) -> Error {
        Error {
            kind,
            message: message.to_string(),
        }
    }

    /// New error helper for a record that does not fit in the available bytes
    pub fn new_truncated(name: &str, expected: usize, got: usize) -> Error {
        let error_arg = ErrorArg::new(expected, got);
        Error {
            kind: ErrorKind::Truncated(error_arg),
            message: format!(
                "Truncated {} descriptor. Expected: {}, Got {}",
                name, expected, got
            ),
        }
    }

    /// New [`ErrorKind::NotFound`] helper
    pub fn not_found(message: &str) -> Error {
        Error::new(ErrorKind::NotFound, message)
    }

    /// The [`ErrorKind`]
    pub fn kind(&self) -> ErrorKind {
        self.kind.to_owned()
    }

    /// The description
    pub fn message(&self) -> &String {
        &self.message
    }

    /// Whether the error is a [`ErrorKind::NotFound`]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{:?} Error: {}", self.kind, self.message)
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Parsing,
            message: error.to_string(),
        }
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(error: std::num::ParseIntError) -> Self {
        Error {
            kind: ErrorKind::Parsing,
            message: error.to_string(),
        }
    }
}

impl From<Error> for io::Error {
    fn from(val: Error) -> Self {
        io::Error::new(io::ErrorKind::Other, val.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_carries_lengths() {
        let e = Error::new_truncated("Format Type", 11, 6);
        match e.kind() {
            ErrorKind::Truncated(arg) => {
                assert_eq!(*arg.expected(), 11);
                assert_eq!(*arg.got(), 6);
            }
            k => panic!("unexpected kind {:?}", k),
        }
        assert_eq!(format!("{:#}", e), "Truncated Format Type descriptor. Expected: 11, Got 6");
    }

    #[test]
    fn test_display_includes_kind() {
        let e = Error::not_found("no unit 4");
        assert!(e.is_not_found());
        assert_eq!(format!("{}", e), "NotFound Error: no unit 4");
    }
}
