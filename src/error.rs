use crate::word::Word;

/// Failure mode of a single host read, as reported by the embedding debugger.
///
/// This is deliberately opaque: the host owns the reason a read failed
/// (unmapped page, dead process, truncated core file, ...); we only need to
/// carry it far enough to log and report it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(msg: impl Into<String>) -> HostError {
        HostError(msg.into())
    }
}

/// Everything that can go wrong while decoding V8 heap state.
///
/// Variant 6 of the error taxonomy ("two-byte string encountered") is
/// deliberately absent here: that case is an informational label written to
/// the output sink, not a failure, so it never constructs an `Error`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("V8 metadata not present in target (no v8dbg_SmiTag symbol)")]
    ConfigurationAbsent,

    #[error("V8 configuration incomplete: {0}")]
    ConfigurationIncomplete(String),

    #[error("failed to read target memory at {addr:?}: {source}")]
    TargetRead { addr: Word, source: HostError },

    #[error("expected {expected} at {addr:?}, found a different representation")]
    TypeViolation { addr: Word, expected: &'static str },

    #[error("Map at {0:?} is not itself a HeapObject")]
    ProtocolViolation(Word),

    #[error("string decoding recursion limit exceeded ({0} levels)")]
    StringDecodingLimitExceeded(usize),

    #[error("malformed command invocation: {0}")]
    Usage(String),
}

impl Error {
    pub fn target_read(addr: Word, source: HostError) -> Error {
        Error::TargetRead { addr, source }
    }

    pub fn type_violation(addr: Word, expected: &'static str) -> Error {
        Error::TypeViolation { addr, expected }
    }
}

pub type V8Result<T> = Result<T, Error>;

/// The three exit codes a host-level command can report: OK, ERR, USAGE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::EnumIter)]
pub enum ExitStatus {
    Ok,
    Err,
    Usage,
}

impl From<&Error> for ExitStatus {
    fn from(e: &Error) -> ExitStatus {
        match e {
            Error::Usage(_) => ExitStatus::Usage,
            _ => ExitStatus::Err,
        }
    }
}

pub fn exit_status<T>(result: &V8Result<T>) -> ExitStatus {
    match result {
        Ok(_) => ExitStatus::Ok,
        Err(e) => ExitStatus::from(e),
    }
}
