//! Reader and writer for DUMPI-style binary call traces.
//!
//! One file holds the profiled calls of one process:
//!
//! ```text
//! lead-in magic (8 bytes)
//! cpu time bias: u32, wall time bias: u32
//! call records ... END_OF_STREAM
//! header, footer, [perfcounter labels], [function names], keyval
//! trailing index (5, 6 or 7 words, see `trailer`)
//! ```
//!
//! All integers are big-endian.

mod calls;
mod error;
mod format;
pub mod handles;
mod io;
mod reader;
mod record;
mod sections;
mod trailer;
mod writer;

pub use crate::calls::{ArgKind, ArgSpec, CallShape, CallType};
pub use crate::error::{Result, TraceError};
pub use crate::format::{
    FieldMask, TimeBias, FOOTER_MAGIC, FORMAT_VERSION, LEAD_IN_MAGIC, LEAD_IN_MAGIC_WORD,
    NONE_SENTINEL,
};
pub use crate::reader::{CallIter, TraceReader};
pub use crate::record::{ArgValue, CallRecord, Clock, PerfSample, StatusBundle, TimeSpan};
pub use crate::sections::{Footer, FunctionName, Header, MeshDescriptor};
pub use crate::trailer::{TraceIndex, TrailerLayout};
pub use crate::writer::{TraceMetadata, TraceWriter, TrailerPolicy, WriteOptions};
