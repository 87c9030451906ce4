//! Header, footer, keyval, perfcounter-label and function-name records.

use std::io::{Read, Write};

use crate::calls::CallType;
use crate::error::{Result, TraceError};
use crate::format::{FOOTER_MAGIC, FORMAT_VERSION, NONE_SENTINEL};
use crate::io::{ReadBeExt, WriteBeExt};

/// Position of this process in the machine's mesh, if the environment reported one.
///
/// Wire layout: `dimension: u32`, then `dimension` x `i32` position, then `dimension` x `i32`
/// size. Dimension 0 means unavailable; an unknown size is written as zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshDescriptor {
    pub position: Vec<i32>,
    pub size: Vec<i32>,
}

impl MeshDescriptor {
    pub fn dimension(&self) -> usize {
        self.position.len()
    }

    fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        let dim = self.dimension();
        let size_len = self.size.len();
        if size_len != 0 && size_len != dim {
            return Err(TraceError::CorruptRecord(
                "mesh size and position dimensions differ",
            ));
        }
        w.write_len_u32(dim)?;
        for v in &self.position {
            w.write_i32_be(*v)?;
        }
        for idx in 0..dim {
            w.write_i32_be(self.size.get(idx).copied().unwrap_or(0))?;
        }
        Ok(())
    }

    fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let dim = r.read_u32_be()? as usize;
        let position = read_coords(r, dim)?;
        let size = read_coords(r, dim)?;
        Ok(Self { position, size })
    }
}

fn read_coords<R: Read>(r: &mut R, dim: usize) -> Result<Vec<i32>> {
    let mut out = Vec::with_capacity(dim.min(64));
    for _ in 0..dim {
        out.push(r.read_i32_be()?);
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: [u8; 3],
    /// Seconds since the Unix epoch when tracing started.
    pub start_time: u64,
    pub hostname: String,
    /// [`NONE_SENTINEL`] when the username could not be determined.
    pub username: String,
    pub mesh: MeshDescriptor,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            start_time: 0,
            hostname: String::new(),
            username: NONE_SENTINEL.to_string(),
            mesh: MeshDescriptor::default(),
        }
    }
}

impl Header {
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_bytes(&self.version)?;
        w.write_u64_be(self.start_time)?;
        w.write_string_u32(&self.hostname)?;
        w.write_string_u32(&self.username)?;
        self.mesh.encode(w)
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let version = [r.read_u8()?, r.read_u8()?, r.read_u8()?];
        let start_time = r.read_u64_be()?;
        let hostname = r.read_string_u32()?;
        let username = r.read_string_u32()?;
        let mesh = MeshDescriptor::decode(r)?;
        Ok(Self {
            version,
            start_time,
            hostname,
            username,
            mesh,
        })
    }
}

/// Per-call counters. Both arrays are indexed by [`CallType`] code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    /// Calls that were recorded.
    pub call_counts: Vec<u32>,
    /// Calls that were entered but not recorded.
    pub skip_counts: Vec<u32>,
}

impl Default for Footer {
    fn default() -> Self {
        Self {
            call_counts: vec![0; CallType::COUNT],
            skip_counts: vec![0; CallType::COUNT],
        }
    }
}

impl Footer {
    pub fn calls(&self, call: CallType) -> u32 {
        self.call_counts
            .get(usize::from(call.0))
            .copied()
            .unwrap_or(0)
    }

    pub fn skips(&self, call: CallType) -> u32 {
        self.skip_counts
            .get(usize::from(call.0))
            .copied()
            .unwrap_or(0)
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u64_be(FOOTER_MAGIC)?;
        w.write_array_u32(&self.call_counts, |w, v| w.write_u32_be(*v))?;
        w.write_array_u32(&self.skip_counts, |w, v| w.write_u32_be(*v))?;
        Ok(())
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        if r.read_u64_be()? != FOOTER_MAGIC {
            return Err(TraceError::CorruptRecord("footer magic mismatch"));
        }
        let call_counts = r.read_array_u32(|r| r.read_u32_be())?;
        let skip_counts = r.read_array_u32(|r| r.read_u32_be())?;
        Ok(Self {
            call_counts,
            skip_counts,
        })
    }
}

pub fn encode_keyvals<W: Write>(w: &mut W, pairs: &[(String, String)]) -> Result<()> {
    w.write_array_u32(pairs, |w, (key, value)| {
        w.write_string_u32(key)?;
        w.write_string_u32(value)
    })
}

pub fn decode_keyvals<R: Read>(r: &mut R) -> Result<Vec<(String, String)>> {
    r.read_array_u32(|r| Ok((r.read_string_u32()?, r.read_string_u32()?)))
}

pub fn encode_perf_labels<W: Write>(w: &mut W, labels: &[String]) -> Result<()> {
    w.write_array_u32(labels, |w, label| w.write_string_u32(label))
}

pub fn decode_perf_labels<R: Read>(r: &mut R) -> Result<Vec<String>> {
    r.read_array_u32(|r| r.read_string_u32())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionName {
    pub address: u64,
    /// [`NONE_SENTINEL`] when the symbol could not be resolved.
    pub name: String,
}

pub fn encode_function_names<W: Write>(w: &mut W, names: &[FunctionName]) -> Result<()> {
    w.write_array_u32(names, |w, entry| {
        w.write_u64_be(entry.address)?;
        w.write_string_u32(&entry.name)
    })
}

pub fn decode_function_names<R: Read>(r: &mut R) -> Result<Vec<FunctionName>> {
    r.read_array_u32(|r| {
        Ok(FunctionName {
            address: r.read_u64_be()?,
            name: r.read_string_u32()?,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header(mesh: MeshDescriptor) -> Header {
        Header {
            version: [1, 2, 3],
            start_time: 1_700_000_000,
            hostname: "node017".to_string(),
            username: NONE_SENTINEL.to_string(),
            mesh,
        }
    }

    #[test]
    fn header_roundtrips_across_mesh_shapes() {
        let meshes = [
            MeshDescriptor::default(),
            MeshDescriptor {
                position: vec![3],
                size: vec![8],
            },
            MeshDescriptor {
                position: vec![1, 2, 3],
                size: vec![4, 4, 4],
            },
        ];
        for mesh in meshes {
            let h = header(mesh);
            let mut buf = Vec::new();
            h.encode(&mut buf).unwrap();
            let mut cursor = Cursor::new(buf);
            assert_eq!(Header::decode(&mut cursor).unwrap(), h);
            assert_eq!(cursor.position(), cursor.get_ref().len() as u64);
        }
    }

    #[test]
    fn unknown_mesh_size_is_written_as_zeros() {
        let h = header(MeshDescriptor {
            position: vec![5, 6],
            size: vec![],
        });
        let mut buf = Vec::new();
        h.encode(&mut buf).unwrap();
        let decoded = Header::decode(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded.mesh.size, vec![0, 0]);
        assert_eq!(decoded.mesh.position, vec![5, 6]);
    }

    #[test]
    fn none_sentinel_is_an_ordinary_string() {
        let h = header(MeshDescriptor::default());
        let mut buf = Vec::new();
        h.encode(&mut buf).unwrap();
        let decoded = Header::decode(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded.username, "<none>");
    }

    #[test]
    fn footer_roundtrips_and_indexes_by_call() {
        let mut footer = Footer::default();
        footer.call_counts[usize::from(CallType::SEND.0)] = 12;
        footer.skip_counts[usize::from(CallType::WTIME.0)] = 3;
        let mut buf = Vec::new();
        footer.encode(&mut buf).unwrap();
        assert_eq!(&buf[..8], &FOOTER_MAGIC.to_be_bytes());

        let decoded = Footer::decode(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, footer);
        assert_eq!(decoded.calls(CallType::SEND), 12);
        assert_eq!(decoded.skips(CallType::WTIME), 3);
        assert_eq!(decoded.calls(CallType::END_OF_STREAM), 0);
    }

    #[test]
    fn footer_with_bad_magic_stops_before_counters() {
        let mut buf = 0xf007_fee8u64.to_be_bytes().to_vec();
        buf.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 9]);
        let mut cursor = Cursor::new(buf);
        let err = Footer::decode(&mut cursor).unwrap_err();
        assert!(matches!(err, TraceError::CorruptRecord(_)));
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn tables_roundtrip_at_boundary_sizes() {
        for n in [0usize, 1, 40] {
            let pairs: Vec<_> = (0..n)
                .map(|i| (format!("key{i}"), format!("value {i}")))
                .collect();
            let mut buf = Vec::new();
            encode_keyvals(&mut buf, &pairs).unwrap();
            assert_eq!(decode_keyvals(&mut Cursor::new(buf)).unwrap(), pairs);

            let labels: Vec<_> = (0..n).map(|i| format!("PAPI_{i}")).collect();
            let mut buf = Vec::new();
            encode_perf_labels(&mut buf, &labels).unwrap();
            assert_eq!(decode_perf_labels(&mut Cursor::new(buf)).unwrap(), labels);

            let names: Vec<_> = (0..n)
                .map(|i| FunctionName {
                    address: 0x400000 + i as u64,
                    name: if i % 2 == 0 {
                        format!("fn_{i}")
                    } else {
                        NONE_SENTINEL.to_string()
                    },
                })
                .collect();
            let mut buf = Vec::new();
            encode_function_names(&mut buf, &names).unwrap();
            assert_eq!(decode_function_names(&mut Cursor::new(buf)).unwrap(), names);
        }
    }
}
