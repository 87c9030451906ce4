//! Profiled-call records.
//!
//! Wire layout of one record:
//!
//! ```text
//! call: u16                       (END_OF_STREAM terminates the body; nothing follows it)
//! mask: u8
//! [CPUTIME]  start {sec: u16, nsec: u32}, stop {sec: u16, nsec: u32}
//! [WALLTIME] start {sec: u16, nsec: u32}, stop {sec: u16, nsec: u32}
//! [PERFINFO] count: u8, count x {entry: u64, exit: u64}
//! [THREADID] thread: u16
//! arguments per CallType::shape()
//! ```
//!
//! Status arguments always occupy four length-prefixed arrays. Only the STATUS bits say whether
//! they carry detail; with STATUS clear the arrays are written empty and ignored on read.

use std::io::{Read, Write};

use crate::calls::{ArgKind, CallType};
use crate::error::{Result, TraceError};
use crate::format::FieldMask;
use crate::io::{ReadBeExt, WriteBeExt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clock {
    /// Seconds relative to the file's time bias.
    pub sec: u16,
    pub nsec: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: Clock,
    pub stop: Clock,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerfSample {
    pub entry: u64,
    pub exit: u64,
}

/// Per-element status detail. The arrays are independently length-prefixed; any of them may be
/// empty even when status detail is recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusBundle {
    pub bytes: Vec<i32>,
    pub sources: Vec<i32>,
    pub cancelled: Vec<i8>,
    pub errors: Vec<i8>,
}

impl StatusBundle {
    pub fn single(bytes: i32, source: i32, cancelled: bool, error: bool) -> Self {
        Self {
            bytes: vec![bytes],
            sources: vec![source],
            cancelled: vec![i8::from(cancelled)],
            errors: vec![i8::from(error)],
        }
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_array_u32(&self.bytes, |w, v| w.write_i32_be(*v))?;
        w.write_array_u32(&self.sources, |w, v| w.write_i32_be(*v))?;
        w.write_array_u32(&self.cancelled, |w, v| w.write_i8(*v))?;
        w.write_array_u32(&self.errors, |w, v| w.write_i8(*v))?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
            && self.sources.is_empty()
            && self.cancelled.is_empty()
            && self.errors.is_empty()
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            bytes: r.read_array_u32(|r| r.read_i32_be())?,
            sources: r.read_array_u32(|r| r.read_i32_be())?,
            cancelled: r.read_array_u32(|r| r.read_i8())?,
            errors: r.read_array_u32(|r| r.read_i8())?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Int(i32),
    Int64(i64),
    Handle(i32),
    IntArray(Vec<i32>),
    HandleArray(Vec<i32>),
    Str(String),
    StrArray(Vec<String>),
    /// Decodes as `Some` exactly when the record's mask has STATUS set. An empty bundle is also
    /// accepted on encode when STATUS is clear.
    Status(Option<StatusBundle>),
}

impl ArgValue {
    pub fn kind(&self) -> ArgKind {
        match self {
            ArgValue::Int(_) => ArgKind::Int,
            ArgValue::Int64(_) => ArgKind::Int64,
            ArgValue::Handle(_) => ArgKind::Handle,
            ArgValue::IntArray(_) => ArgKind::IntArray,
            ArgValue::HandleArray(_) => ArgKind::HandleArray,
            ArgValue::Str(_) => ArgKind::Str,
            ArgValue::StrArray(_) => ArgKind::StrArray,
            ArgValue::Status(_) => ArgKind::Status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub call: CallType,
    pub mask: FieldMask,
    pub cpu_time: Option<TimeSpan>,
    pub wall_time: Option<TimeSpan>,
    pub perf: Option<Vec<PerfSample>>,
    pub thread: Option<u16>,
    pub args: Vec<ArgValue>,
}

#[derive(Debug, Clone, Copy)]
enum OptionalField {
    CpuTime,
    WallTime,
    Perf,
    Thread,
}

/// Optional fields in wire order. Encode and decode both walk this list.
const OPTIONAL_FIELDS: [(FieldMask, OptionalField); 4] = [
    (FieldMask::CPUTIME, OptionalField::CpuTime),
    (FieldMask::WALLTIME, OptionalField::WallTime),
    (FieldMask::PERFINFO, OptionalField::Perf),
    (FieldMask::THREADID, OptionalField::Thread),
];

impl CallRecord {
    /// A record with an empty mask; use the `with_*` helpers to attach optional fields.
    pub fn new(call: CallType, args: Vec<ArgValue>) -> Self {
        Self {
            call,
            mask: FieldMask::empty(),
            cpu_time: None,
            wall_time: None,
            perf: None,
            thread: None,
            args,
        }
    }

    pub fn with_cpu_time(mut self, span: TimeSpan) -> Self {
        self.mask |= FieldMask::CPUTIME;
        self.cpu_time = Some(span);
        self
    }

    pub fn with_wall_time(mut self, span: TimeSpan) -> Self {
        self.mask |= FieldMask::WALLTIME;
        self.wall_time = Some(span);
        self
    }

    pub fn with_perf(mut self, samples: Vec<PerfSample>) -> Self {
        self.mask |= FieldMask::PERFINFO;
        self.perf = Some(samples);
        self
    }

    pub fn with_thread(mut self, thread: u16) -> Self {
        self.mask |= FieldMask::THREADID;
        self.thread = Some(thread);
        self
    }

    /// Mark status detail as recorded. Every `Status` argument must then carry a bundle.
    pub fn with_status_detail(mut self) -> Self {
        self.mask |= FieldMask::STATUS;
        self
    }

    fn has_field(&self, field: OptionalField) -> bool {
        match field {
            OptionalField::CpuTime => self.cpu_time.is_some(),
            OptionalField::WallTime => self.wall_time.is_some(),
            OptionalField::Perf => self.perf.is_some(),
            OptionalField::Thread => self.thread.is_some(),
        }
    }

    fn mismatch(&self, reason: &'static str) -> TraceError {
        TraceError::ArgumentMismatch {
            call: self.call,
            reason,
        }
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        let shape = self
            .call
            .shape()
            .ok_or(TraceError::UnknownCallType(self.call.0))?;
        if self.args.len() != shape.args.len() {
            return Err(self.mismatch("wrong number of arguments"));
        }

        w.write_u16_be(self.call.0)?;
        w.write_u8(self.mask.bits())?;

        for (bit, field) in OPTIONAL_FIELDS {
            let present = self.has_field(field);
            if self.mask.contains(bit) != present {
                return Err(self.mismatch("optional field presence disagrees with mask"));
            }
            if !present {
                continue;
            }
            match field {
                OptionalField::CpuTime => encode_span(w, self.cpu_time.unwrap_or_default())?,
                OptionalField::WallTime => encode_span(w, self.wall_time.unwrap_or_default())?,
                OptionalField::Perf => {
                    let samples = self.perf.as_deref().unwrap_or_default();
                    let count: u8 = samples
                        .len()
                        .try_into()
                        .map_err(|_| self.mismatch("more than 255 perf samples"))?;
                    w.write_u8(count)?;
                    for sample in samples {
                        w.write_u64_be(sample.entry)?;
                        w.write_u64_be(sample.exit)?;
                    }
                }
                OptionalField::Thread => w.write_u16_be(self.thread.unwrap_or_default())?,
            }
        }

        for (spec, value) in shape.args.iter().zip(&self.args) {
            if spec.kind != value.kind() {
                return Err(self.mismatch("argument kind differs from registered shape"));
            }
            match value {
                ArgValue::Int(v) | ArgValue::Handle(v) => w.write_i32_be(*v)?,
                ArgValue::Int64(v) => w.write_i64_be(*v)?,
                ArgValue::IntArray(vs) | ArgValue::HandleArray(vs) => {
                    w.write_array_u32(vs, |w, v| w.write_i32_be(*v))?
                }
                ArgValue::Str(s) => w.write_string_u32(s)?,
                ArgValue::StrArray(ss) => w.write_array_u32(ss, |w, s| w.write_string_u32(s))?,
                ArgValue::Status(bundle) => match (self.mask.has_status(), bundle) {
                    (true, Some(bundle)) => bundle.encode(w)?,
                    (false, None) => StatusBundle::default().encode(w)?,
                    (false, Some(bundle)) if bundle.is_empty() => bundle.encode(w)?,
                    _ => return Err(self.mismatch("status presence disagrees with mask")),
                },
            }
        }
        Ok(())
    }

    /// Decode the next record, or `None` at the end-of-stream sentinel.
    pub fn decode<R: Read>(r: &mut R) -> Result<Option<Self>> {
        let call = CallType(r.read_u16_be()?);
        if call.is_end_of_stream() {
            return Ok(None);
        }
        let shape = call.shape().ok_or(TraceError::UnknownCallType(call.0))?;
        let mask = FieldMask::from_bits_retain(r.read_u8()?);

        let mut record = CallRecord {
            mask,
            ..CallRecord::new(call, Vec::with_capacity(shape.args.len()))
        };
        for (bit, field) in OPTIONAL_FIELDS {
            if !mask.contains(bit) {
                continue;
            }
            match field {
                OptionalField::CpuTime => record.cpu_time = Some(decode_span(r)?),
                OptionalField::WallTime => record.wall_time = Some(decode_span(r)?),
                OptionalField::Perf => {
                    let count = r.read_u8()?;
                    let mut samples = Vec::with_capacity(usize::from(count));
                    for _ in 0..count {
                        samples.push(PerfSample {
                            entry: r.read_u64_be()?,
                            exit: r.read_u64_be()?,
                        });
                    }
                    record.perf = Some(samples);
                }
                OptionalField::Thread => record.thread = Some(r.read_u16_be()?),
            }
        }

        for spec in shape.args {
            let value = match spec.kind {
                ArgKind::Int => ArgValue::Int(r.read_i32_be()?),
                ArgKind::Int64 => ArgValue::Int64(r.read_i64_be()?),
                ArgKind::Handle => ArgValue::Handle(r.read_i32_be()?),
                ArgKind::IntArray => ArgValue::IntArray(r.read_array_u32(|r| r.read_i32_be())?),
                ArgKind::HandleArray => {
                    ArgValue::HandleArray(r.read_array_u32(|r| r.read_i32_be())?)
                }
                ArgKind::Str => ArgValue::Str(r.read_string_u32()?),
                ArgKind::StrArray => ArgValue::StrArray(r.read_array_u32(|r| r.read_string_u32())?),
                ArgKind::Status => {
                    let bundle = StatusBundle::decode(r)?;
                    ArgValue::Status(mask.has_status().then_some(bundle))
                }
            };
            record.args.push(value);
        }

        tracing::trace!(call = %call, mask = mask.bits(), "decoded call record");
        Ok(Some(record))
    }
}

pub fn encode_end_of_stream<W: Write>(w: &mut W) -> Result<()> {
    w.write_u16_be(CallType::END_OF_STREAM.0)
}

fn encode_span<W: Write>(w: &mut W, span: TimeSpan) -> Result<()> {
    for clock in [span.start, span.stop] {
        w.write_u16_be(clock.sec)?;
        w.write_u32_be(clock.nsec)?;
    }
    Ok(())
}

fn decode_span<R: Read>(r: &mut R) -> Result<TimeSpan> {
    let mut clock = || -> Result<Clock> {
        Ok(Clock {
            sec: r.read_u16_be()?,
            nsec: r.read_u32_be()?,
        })
    };
    let start = clock()?;
    let stop = clock()?;
    Ok(TimeSpan { start, stop })
}
