//! Decode error type for the bounded JSON document

/// An error produced while decoding a JSON body.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The stream ended before any JSON value started.
    EmptyInput,
    /// The stream ended in the middle of a value.
    IncompleteInput,
    /// The input is not valid JSON.
    InvalidInput,
    /// The decoded document did not fit the caller's byte budget.
    NoMemory,
    /// The input nests deeper than the supported limit.
    TooDeep,
    /// The underlying transport reported a read error.
    Read,
}

impl Error {
    /// A short, static description of the failure, suitable for a log line.
    pub fn description(&self) -> &'static str {
        match self {
            Error::EmptyInput => "empty input",
            Error::IncompleteInput => "incomplete input",
            Error::InvalidInput => "invalid input",
            Error::NoMemory => "document exceeds byte budget",
            Error::TooDeep => "nesting too deep",
            Error::Read => "transport read failed",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.description());
    }
}
