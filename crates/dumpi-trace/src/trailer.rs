//! The trailing index.
//!
//! The index is a run of big-endian 64-bit words at the very end of the file, terminated (at its
//! start) by the lead-in magic. Its width grew as optional sections were added:
//!
//! ```text
//! FiveWord:  magic, header, body, footer, keyval
//! SixWord:   magic, perf_labels, header, body, footer, keyval
//! SevenWord: magic, function_names, perf_labels, header, body, footer, keyval
//! ```
//!
//! Readers find the layout by scanning backward from the fifth-from-last word for the magic.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{Result, TraceError};
use crate::format::LEAD_IN_MAGIC_WORD;
use crate::io::{ReadBeExt, WriteBeExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrailerLayout {
    /// Predates perfcounter labels and function names.
    FiveWord,
    /// Perfcounter labels, no function names.
    SixWord,
    /// Current layout.
    SevenWord,
}

impl TrailerLayout {
    pub const MAX_WORDS: usize = 7;

    pub fn words(self) -> usize {
        match self {
            TrailerLayout::FiveWord => 5,
            TrailerLayout::SixWord => 6,
            TrailerLayout::SevenWord => 7,
        }
    }

    pub fn has_perf_labels(self) -> bool {
        !matches!(self, TrailerLayout::FiveWord)
    }

    pub fn has_function_names(self) -> bool {
        matches!(self, TrailerLayout::SevenWord)
    }
}

/// Section offsets recovered from (or written to) the trailing index.
///
/// An optional section is `None` when the layout predates it. `Some(0)` means the section exists
/// but is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceIndex {
    pub layout: TrailerLayout,
    pub header: u64,
    pub body: u64,
    pub footer: u64,
    pub keyval: u64,
    pub perf_labels: Option<u64>,
    pub function_names: Option<u64>,
}

impl TraceIndex {
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        if self.layout.has_perf_labels() != self.perf_labels.is_some()
            || self.layout.has_function_names() != self.function_names.is_some()
        {
            return Err(TraceError::CorruptRecord(
                "index offsets do not match trailer layout",
            ));
        }
        w.write_u64_be(LEAD_IN_MAGIC_WORD)?;
        if let Some(offset) = self.function_names {
            w.write_u64_be(offset)?;
        }
        if let Some(offset) = self.perf_labels {
            w.write_u64_be(offset)?;
        }
        for offset in [self.header, self.body, self.footer, self.keyval] {
            w.write_u64_be(offset)?;
        }
        Ok(())
    }

    /// Classify the trailer from the final words of a file (`words.last()` is the last word).
    pub fn resolve(words: &[u64]) -> Result<Self> {
        let n = words.len();
        // `word(k)` is the k-th word from the end, 1-based.
        let word = |k: usize| -> Option<u64> { n.checked_sub(k).map(|idx| words[idx]) };
        let required = |k: usize| word(k).ok_or(TraceError::UnrecognizedTrailerLayout);

        let keyval = required(1)?;
        let footer = required(2)?;
        let body = required(3)?;
        let header = required(4)?;
        let fifth = required(5)?;

        let mut index = TraceIndex {
            layout: TrailerLayout::FiveWord,
            header,
            body,
            footer,
            keyval,
            perf_labels: None,
            function_names: None,
        };
        if fifth == LEAD_IN_MAGIC_WORD {
            return Ok(index);
        }

        index.perf_labels = Some(fifth);
        let sixth = required(6)?;
        if sixth == LEAD_IN_MAGIC_WORD {
            index.layout = TrailerLayout::SixWord;
            return Ok(index);
        }

        index.function_names = Some(sixth);
        let seventh = required(7)?;
        if seventh != LEAD_IN_MAGIC_WORD {
            return Err(TraceError::MagicMismatch { found: seventh });
        }
        index.layout = TrailerLayout::SevenWord;
        Ok(index)
    }

    /// Read the trailer window from the end of `r` and resolve it.
    pub fn read_from<R: Read + Seek>(r: &mut R, file_len: u64) -> Result<Self> {
        let available = usize::try_from(file_len / 8).unwrap_or(usize::MAX);
        let count = available.min(TrailerLayout::MAX_WORDS);
        r.seek(SeekFrom::Start(file_len - count as u64 * 8))?;
        let mut words = [0u64; TrailerLayout::MAX_WORDS];
        for word in words.iter_mut().take(count) {
            *word = r.read_u64_be()?;
        }
        let index = Self::resolve(&words[..count])?;
        tracing::debug!(layout = ?index.layout, "resolved trailer");
        Ok(index)
    }

    /// Every offset this index records, for bounds checks.
    pub fn offsets(&self) -> impl Iterator<Item = u64> {
        [self.header, self.body, self.footer, self.keyval]
            .into_iter()
            .chain(self.perf_labels)
            .chain(self.function_names)
    }
}
