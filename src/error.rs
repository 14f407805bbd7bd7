use std::fmt;

/// The kinds of failure the core can report, per the error-handling design:
/// functions return a `Result` rather than aborting, and the caller matches on
/// the kind to decide whether to retry (only `BufferOverflow` is retryable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A caller-supplied pointer/slice/length/code point is invalid in a
    /// context where that is disallowed.
    InvalidArgument,
    /// The output buffer is too small; the required length is carried
    /// alongside on `Error::BufferOverflow`.
    BufferOverflow,
    /// A loaded data image has the wrong magic, wrong format version, or
    /// internally inconsistent lengths.
    InvalidFormat,
    /// A trie build exceeded its configured size limits, or a serialized
    /// image addresses outside itself.
    IndexOutOfBounds,
    /// An allocation failed while building a trie.
    MemoryAllocation,
    /// A requested resource (case-folding string, closure string, ...) is not
    /// present in the loaded data.
    MissingResource,
    /// The operation used the ASCII fallback table because no data has been
    /// loaded. Non-fatal; the result is still returned.
    UsingDefault,
}

/// The crate's single error type. Carries `ErrorKind::BufferOverflow`'s
/// required length inline since callers are expected to retry with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub required_length: Option<usize>,
    message: &'static str,
}

impl Error {
    pub fn new(kind: ErrorKind, message: &'static str) -> Self {
        Error {
            kind,
            required_length: None,
            message,
        }
    }

    pub fn buffer_overflow(required_length: usize) -> Self {
        Error {
            kind: ErrorKind::BufferOverflow,
            required_length: Some(required_length),
            message: "output buffer too small",
        }
    }

    pub fn invalid_argument(message: &'static str) -> Self {
        Error::new(ErrorKind::InvalidArgument, message)
    }

    pub fn invalid_format(message: &'static str) -> Self {
        Error::new(ErrorKind::InvalidFormat, message)
    }

    pub fn index_out_of_bounds(message: &'static str) -> Self {
        Error::new(ErrorKind::IndexOutOfBounds, message)
    }

    pub fn memory_allocation(message: &'static str) -> Self {
        Error::new(ErrorKind::MemoryAllocation, message)
    }

    pub fn missing_resource(message: &'static str) -> Self {
        Error::new(ErrorKind::MissingResource, message)
    }

    pub fn using_default(message: &'static str) -> Self {
        Error::new(ErrorKind::UsingDefault, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.required_length {
            Some(len) => write!(f, "{:?}: {} (required length {})", self.kind, self.message, len),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
