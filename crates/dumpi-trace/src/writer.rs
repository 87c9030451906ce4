use std::io::{Seek, Write};

use crate::calls::CallType;
use crate::error::{Result, TraceError};
use crate::format::{TimeBias, LEAD_IN_MAGIC};
use crate::io::WriteBeExt;
use crate::record::{encode_end_of_stream, CallRecord};
use crate::sections::{
    encode_function_names, encode_keyvals, encode_perf_labels, Footer, FunctionName, Header,
};
use crate::trailer::{TraceIndex, TrailerLayout};

/// Which trailer layout a writer emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrailerPolicy {
    /// Shortest layout that records every optional section the caller supplied. Unlike
    /// [`TrailerPolicy::Full`], a file with neither perfcounter labels nor function names gets the
    /// legacy five-word trailer rather than the newest seven-word one.
    #[default]
    Compact,
    /// Always [`TrailerLayout::SevenWord`].
    Full,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    pub trailer: TrailerPolicy,
}

/// Everything written after the call stream, apart from the footer counters the writer keeps
/// itself.
#[derive(Debug, Clone, Default)]
pub struct TraceMetadata {
    pub header: Header,
    pub keyvals: Vec<(String, String)>,
    /// `None` omits the section; `Some(vec![])` records it as present but empty.
    pub perf_labels: Option<Vec<String>>,
    /// `None` omits the section; `Some(vec![])` records it as present but empty.
    pub function_names: Option<Vec<FunctionName>>,
}

/// Append-only writer for one trace file.
pub struct TraceWriter<W> {
    writer: W,
    options: WriteOptions,
    body: u64,
    footer: Footer,
    records: u64,
    scratch: Vec<u8>,
}

impl<W: Write + Seek> TraceWriter<W> {
    /// Emit the lead-in magic and time biases. The call stream starts right after.
    pub fn new(mut writer: W, bias: TimeBias, options: WriteOptions) -> Result<Self> {
        writer.write_bytes(&LEAD_IN_MAGIC)?;
        writer.write_u32_be(bias.cpu_seconds)?;
        writer.write_u32_be(bias.wall_seconds)?;
        let body = writer.stream_position()?;
        Ok(Self {
            writer,
            options,
            body,
            footer: Footer::default(),
            records: 0,
            scratch: Vec::new(),
        })
    }

    /// Append one call record. A record that fails to encode leaves the file untouched.
    pub fn write_call(&mut self, record: &CallRecord) -> Result<()> {
        self.scratch.clear();
        record.encode(&mut self.scratch)?;
        self.writer.write_bytes(&self.scratch)?;
        bump(&mut self.footer.call_counts, record.call);
        self.records += 1;
        Ok(())
    }

    /// Count a call that was entered but not recorded.
    pub fn skip_call(&mut self, call: CallType) -> Result<()> {
        if call.shape().is_none() {
            return Err(TraceError::UnknownCallType(call.0));
        }
        bump(&mut self.footer.skip_counts, call);
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    pub fn body_offset(&self) -> u64 {
        self.body
    }

    /// Terminate the call stream and write every remaining section plus the trailing index.
    pub fn finish(mut self, meta: TraceMetadata) -> Result<(W, TraceIndex)> {
        let w = &mut self.writer;
        encode_end_of_stream(w)?;

        let header = w.stream_position()?;
        meta.header.encode(w)?;

        let footer = w.stream_position()?;
        self.footer.encode(w)?;

        let perf_labels = match meta.perf_labels.as_deref() {
            None => None,
            Some([]) => Some(0),
            Some(labels) => {
                let offset = w.stream_position()?;
                encode_perf_labels(w, labels)?;
                Some(offset)
            }
        };

        let function_names = match meta.function_names.as_deref() {
            None => None,
            Some([]) => Some(0),
            Some(names) => {
                let offset = w.stream_position()?;
                encode_function_names(w, names)?;
                Some(offset)
            }
        };

        let keyval = w.stream_position()?;
        encode_keyvals(w, &meta.keyvals)?;

        let layout = match (self.options.trailer, perf_labels, function_names) {
            (TrailerPolicy::Full, _, _) | (_, _, Some(_)) => TrailerLayout::SevenWord,
            (_, Some(_), None) => TrailerLayout::SixWord,
            (_, None, None) => TrailerLayout::FiveWord,
        };
        let index = TraceIndex {
            layout,
            header,
            body: self.body,
            footer,
            keyval,
            perf_labels: layout
                .has_perf_labels()
                .then_some(perf_labels.unwrap_or(0)),
            function_names: layout
                .has_function_names()
                .then_some(function_names.unwrap_or(0)),
        };
        index.encode(w)?;
        w.flush()?;

        tracing::debug!(
            records = self.records,
            layout = ?layout,
            "finished trace file"
        );
        Ok((self.writer, index))
    }
}

fn bump(counts: &mut [u32], call: CallType) {
    if let Some(count) = counts.get_mut(usize::from(call.0)) {
        *count = count.saturating_add(1);
    }
}
