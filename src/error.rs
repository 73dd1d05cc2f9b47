//! Error types for the minipb runtime

/// Errors that can occur while decoding or mutating messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Input ended before a key, value or length was fully readable
    Truncated,
    /// Input violates the wire format (over-long varint, mismatched group end,
    /// length overrunning its enclosing region, invalid wire type)
    Malformed,
    /// Nested submessages or groups exceed the configured depth bound
    MaxDepthExceeded,
    /// A value's in-memory kind does not match the field it is written to
    TypeMismatch,
}

impl Error {
    /// Returns a human-readable description of the error
    pub const fn description(&self) -> &'static str {
        match self {
            Error::Truncated => "input truncated before end of field",
            Error::Malformed => "malformed protobuf wire data",
            Error::MaxDepthExceeded => "maximum nesting depth exceeded",
            Error::TypeMismatch => "value type does not match field type",
        }
    }

    /// Whether this error comes from the input bytes rather than from a
    /// misuse of the storage API
    pub const fn is_wire_error(&self) -> bool {
        !matches!(self, Error::TypeMismatch)
    }
}

#[cfg(feature = "std")]
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias for minipb operations
pub type Result<T> = core::result::Result<T, Error>;
