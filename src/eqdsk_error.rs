//! Errors reading or writing G-EQDSK equilibrium files
use std::fmt::Display;
use std::error::Error;
use pest::RuleType;

/// Type alias for a `Result` with [`EError`] as the error type.
pub type EResult<T> = Result<T, EError>;

/// Errors that can occur while parsing or serializing an equilibrium file.
///
/// Every variant aborts the whole read or write; no partial record is ever returned.
#[derive(Debug)]
pub enum EError {
    /// Indicates that the first line of the input could not be read (the input was empty).
    EmptyInput,

    /// Indicates that the first line did not end in three integers (`idum`, `nw`, `nh`).
    MalformedHeader{ line: String, reason: String },

    /// Indicates that the numeric data ended before a fixed or declared count of values was read.
    TokenExhaustion{ field: &'static str, expected: usize, found: usize },

    /// Indicates a problem opening, reading, or writing the underlying file or stream.
    IoError(std::io::Error),

    /// Indicates that an array in a record does not have the length its dimensions require.
    ShapeMismatch{ field: &'static str, expected: usize, found: usize },

    /// Indicates that an infinite value was given to the writer, which has no encoding for it.
    NonFiniteValue{ value: f64 },

    /// Indicates that a data line or number token could not be parsed.
    ParsingError{ s: String, reason: String },
}

impl Display for EError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "The input was empty, could not read the header line"),
            Self::MalformedHeader { line, reason } => write!(f, "Malformed header line '{}': {reason}", line.trim_end()),
            Self::TokenExhaustion { field, expected, found } => {
                write!(f, "The input ended while reading '{field}': expected {expected} values, found {found}")
            },
            Self::IoError(e) => write!(f, "I/O error: {e}"),
            Self::ShapeMismatch { field, expected, found } => {
                write!(f, "The array '{field}' has {found} values, but the record dimensions require {expected}")
            },
            Self::NonFiniteValue { value } => write!(f, "Cannot write the non-finite value {value}"),
            Self::ParsingError { s, reason } => write!(f, "Could not parse '{}': {reason}", s.trim_end()),
        }
    }
}

impl Error for EError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IoError(e) => Some(e),
            _ => None
        }
    }
}

impl From<std::io::Error> for EError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

impl EError {
    pub fn from_pest<R: RuleType>(e: pest::error::Error<R>, s: &str) -> Self {
        Self::ParsingError { s: s.to_string(), reason: e.to_string() }
    }

    /// `true` if this error means the input was structurally too short.
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, Self::TokenExhaustion { .. } | Self::EmptyInput)
    }
}
