use std::io;

use thiserror::Error;

use crate::calls::CallType;

pub type Result<T> = std::result::Result<T, TraceError>;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("io error: {0}")]
    Io(#[source] io::Error),

    #[error("truncated input")]
    TruncatedInput,

    #[error("out of memory allocating {len} bytes")]
    OutOfMemory { len: usize },

    #[error("invalid lead-in magic")]
    InvalidMagic,

    #[error("corrupt record: {0}")]
    CorruptRecord(&'static str),

    #[error("unknown call type {0}")]
    UnknownCallType(u16),

    #[error("unrecognized trailer layout")]
    UnrecognizedTrailerLayout,

    #[error("trailer terminator mismatch (found {found:#018x})")]
    MagicMismatch { found: u64 },

    #[error("arguments do not match the registered shape of {call}: {reason}")]
    ArgumentMismatch {
        call: CallType,
        reason: &'static str,
    },

    #[error("string is not valid utf-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

impl From<io::Error> for TraceError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            TraceError::TruncatedInput
        } else {
            TraceError::Io(err)
        }
    }
}
