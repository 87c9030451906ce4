use std::io::{Read, Write};

use crate::error::{Result, TraceError};

/// Upper bound on speculative allocation driven by an untrusted length prefix. Anything longer
/// grows as bytes/elements actually arrive.
const MAX_PREALLOC: usize = 64 * 1024;

pub trait WriteBeExt: Write {
    fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_all(&[v])?;
        Ok(())
    }

    fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    fn write_u16_be(&mut self, v: u16) -> Result<()> {
        self.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    fn write_u32_be(&mut self, v: u32) -> Result<()> {
        self.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    fn write_i32_be(&mut self, v: i32) -> Result<()> {
        self.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    fn write_u64_be(&mut self, v: u64) -> Result<()> {
        self.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    fn write_i64_be(&mut self, v: i64) -> Result<()> {
        self.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)?;
        Ok(())
    }

    fn write_len_u32(&mut self, len: usize) -> Result<()> {
        let len: u32 = len
            .try_into()
            .map_err(|_| TraceError::CorruptRecord("length does not fit in u32"))?;
        self.write_u32_be(len)
    }

    fn write_string_u32(&mut self, s: &str) -> Result<()> {
        self.write_len_u32(s.len())?;
        self.write_bytes(s.as_bytes())
    }

    /// `u32` element count followed by each element.
    fn write_array_u32<T>(
        &mut self,
        items: &[T],
        mut f: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()>
    where
        Self: Sized,
    {
        self.write_len_u32(items.len())?;
        for item in items {
            f(self, item)?;
        }
        Ok(())
    }
}

impl<T: Write + ?Sized> WriteBeExt for T {}

pub trait ReadBeExt: Read {
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_i8(&mut self) -> Result<i8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(i8::from_be_bytes(buf))
    }

    fn read_u16_be(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_u32_be(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn read_i32_be(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    fn read_u64_be(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    fn read_i64_be(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>>
    where
        Self: Sized,
    {
        let mut buf = Vec::new();
        let prealloc = len.min(MAX_PREALLOC);
        buf.try_reserve_exact(prealloc)
            .map_err(|_| TraceError::OutOfMemory { len: prealloc })?;
        let got = self.by_ref().take(len as u64).read_to_end(&mut buf)?;
        if got != len {
            return Err(TraceError::TruncatedInput);
        }
        Ok(buf)
    }

    fn read_string_u32(&mut self) -> Result<String>
    where
        Self: Sized,
    {
        let len = self.read_u32_be()? as usize;
        let bytes = self.read_exact_vec(len)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Counterpart of [`WriteBeExt::write_array_u32`].
    fn read_array_u32<T>(&mut self, mut f: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>>
    where
        Self: Sized,
    {
        let count = self.read_u32_be()? as usize;
        let mut out = Vec::new();
        out.try_reserve_exact(count.min(MAX_PREALLOC))
            .map_err(|_| TraceError::OutOfMemory { len: count })?;
        for _ in 0..count {
            out.push(f(self)?);
        }
        Ok(out)
    }
}

impl<T: Read + ?Sized> ReadBeExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn integers_are_big_endian() {
        let mut buf = Vec::new();
        buf.write_u16_be(0x0102).unwrap();
        buf.write_u32_be(0x0304_0506).unwrap();
        buf.write_i64_be(-2).unwrap();
        assert_eq!(
            buf,
            [1, 2, 3, 4, 5, 6, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe]
        );
    }

    #[test]
    fn string_has_length_prefix_and_no_terminator() {
        let mut buf = Vec::new();
        buf.write_string_u32("abc").unwrap();
        assert_eq!(buf, [0, 0, 0, 3, b'a', b'b', b'c']);

        let mut cursor = Cursor::new(buf);
        assert_eq!(cursor.read_string_u32().unwrap(), "abc");
        assert_eq!(cursor.position(), 7);
    }

    #[test]
    fn empty_array_is_only_a_zero_length() {
        let mut buf = Vec::new();
        buf.write_array_u32(&[] as &[i32], |w, v| w.write_i32_be(*v))
            .unwrap();
        assert_eq!(buf, [0, 0, 0, 0]);

        let decoded = Cursor::new(buf).read_array_u32(|r| r.read_i32_be()).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn short_fixed_width_read_is_truncated_input() {
        let mut cursor = Cursor::new(vec![0u8; 3]);
        let err = cursor.read_u32_be().unwrap_err();
        assert!(matches!(err, TraceError::TruncatedInput));
    }

    #[test]
    fn lying_string_length_is_truncated_input() {
        let mut cursor = Cursor::new(vec![0xff, 0xff, 0xff, 0xff, b'x']);
        let err = cursor.read_string_u32().unwrap_err();
        assert!(matches!(err, TraceError::TruncatedInput));
    }

    #[test]
    fn lying_array_length_is_truncated_input() {
        let mut cursor = Cursor::new(vec![0xff, 0xff, 0xff, 0xff, 0, 0, 0, 1]);
        let err = cursor.read_array_u32(|r| r.read_i32_be()).unwrap_err();
        assert!(matches!(err, TraceError::TruncatedInput));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut cursor = Cursor::new(vec![0, 0, 0, 1, 0xff]);
        let err = cursor.read_string_u32().unwrap_err();
        assert!(matches!(err, TraceError::InvalidUtf8(_)));
    }
}
