use std::io::{BufReader, Read, Seek, SeekFrom};
use std::iter::FusedIterator;

use crate::error::{Result, TraceError};
use crate::format::{TimeBias, LEAD_IN_MAGIC};
use crate::io::ReadBeExt;
use crate::record::CallRecord;
use crate::sections::{
    decode_function_names, decode_keyvals, decode_perf_labels, Footer, FunctionName, Header,
};
use crate::trailer::TraceIndex;

/// Random-access reader for one trace file.
///
/// Opening a file reads only the lead-in and the trailing index; every section is decoded on
/// demand by seeking to its recorded offset.
pub struct TraceReader<R> {
    reader: R,
    file_len: u64,
    bias: TimeBias,
    index: TraceIndex,
}

impl<R: Read + Seek> TraceReader<R> {
    pub fn open(mut reader: R) -> Result<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if magic != LEAD_IN_MAGIC {
            return Err(TraceError::InvalidMagic);
        }
        let bias = TimeBias {
            cpu_seconds: reader.read_u32_be()?,
            wall_seconds: reader.read_u32_be()?,
        };

        let index = TraceIndex::read_from(&mut reader, file_len)?;
        // Offsets are untrusted; a bad one would otherwise surface later as a confusing decode
        // error far from its cause.
        if index.offsets().any(|offset| offset > file_len) {
            return Err(TraceError::CorruptRecord("section offset out of bounds"));
        }

        Ok(Self {
            reader,
            file_len,
            bias,
            index,
        })
    }

    pub fn index(&self) -> &TraceIndex {
        &self.index
    }

    pub fn time_bias(&self) -> TimeBias {
        self.bias
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn seek_to(&mut self, offset: u64) -> Result<&mut R> {
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(&mut self.reader)
    }

    pub fn header(&mut self) -> Result<Header> {
        let offset = self.index.header;
        Header::decode(self.seek_to(offset)?)
    }

    pub fn footer(&mut self) -> Result<Footer> {
        let offset = self.index.footer;
        Footer::decode(self.seek_to(offset)?)
    }

    pub fn keyvals(&mut self) -> Result<Vec<(String, String)>> {
        let offset = self.index.keyval;
        decode_keyvals(self.seek_to(offset)?)
    }

    /// `None` when the file predates perfcounter labels.
    pub fn perf_labels(&mut self) -> Result<Option<Vec<String>>> {
        match self.index.perf_labels {
            None => Ok(None),
            Some(0) => Ok(Some(Vec::new())),
            Some(offset) => decode_perf_labels(self.seek_to(offset)?).map(Some),
        }
    }

    /// `None` when the file predates function names.
    pub fn function_names(&mut self) -> Result<Option<Vec<FunctionName>>> {
        match self.index.function_names {
            None => Ok(None),
            Some(0) => Ok(Some(Vec::new())),
            Some(offset) => decode_function_names(self.seek_to(offset)?).map(Some),
        }
    }

    /// Stream the call records from the start of the body. Each call restarts from the
    /// beginning.
    pub fn calls(&mut self) -> Result<CallIter<'_, R>> {
        let offset = self.index.body;
        let reader = self.seek_to(offset)?;
        Ok(CallIter {
            reader: BufReader::new(reader),
            done: false,
        })
    }

    pub fn read_all_calls(&mut self) -> Result<Vec<CallRecord>> {
        self.calls()?.collect()
    }
}

/// Lazy sequence of call records. Ends at the end-of-stream sentinel or after the first error.
pub struct CallIter<'a, R> {
    reader: BufReader<&'a mut R>,
    done: bool,
}

impl<R: Read> Iterator for CallIter<'_, R> {
    type Item = Result<CallRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match CallRecord::decode(&mut self.reader) {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<R: Read> FusedIterator for CallIter<'_, R> {}
