use std::io::Cursor;

use binrw::{BinRead, BinReaderExt};

use crate::format::{DecodeError, DecodeResult};

/// Little-endian cursor over an in-memory buffer.
///
/// Every read checks the remaining length first, so running off the end of a
/// buffer is reported as [`DecodeError::TruncatedInput`] with the offset of
/// the failed read.
pub struct ByteCursor<'a> {
    data: &'a [u8],
    inner: Cursor<&'a [u8]>,
}

macro_rules! read_primitive {
    ($name:ident, $ty:ty) => {
        #[inline]
        pub fn $name(&mut self) -> DecodeResult<$ty> {
            self.require(std::mem::size_of::<$ty>())?;
            Ok(self.inner.read_le::<$ty>()?)
        }
    };
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self { Self { data, inner: Cursor::new(data) } }

    #[inline]
    pub fn position(&self) -> u64 { self.inner.position() }

    #[inline]
    pub fn remaining(&self) -> usize { self.data.len().saturating_sub(self.inner.position() as usize) }

    /// Fails with `TruncatedInput` unless `needed` bytes remain.
    pub fn require(&self, needed: usize) -> DecodeResult<()> {
        let available = self.remaining();
        if available < needed {
            return Err(DecodeError::TruncatedInput { offset: self.position(), available });
        }
        Ok(())
    }

    read_primitive!(read_u8, u8);
    read_primitive!(read_u16, u16);
    read_primitive!(read_i16, i16);
    read_primitive!(read_u32, u32);
    read_primitive!(read_u64, u64);
    read_primitive!(read_f32, f32);

    pub fn read_f32_array<const N: usize>(&mut self) -> DecodeResult<[f32; N]> {
        self.require(N * 4)?;
        let mut out = [0f32; N];
        for v in &mut out {
            *v = self.inner.read_le()?;
        }
        Ok(out)
    }

    pub fn read_f32_vec(&mut self, count: usize) -> DecodeResult<Vec<f32>> {
        self.require(count.saturating_mul(4))?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.inner.read_le()?);
        }
        Ok(out)
    }

    /// Reads a binrw structure, mapping end of input to `TruncatedInput`.
    pub fn read_type<T>(&mut self) -> DecodeResult<T>
    where
        T: BinRead,
        for<'b> T::Args<'b>: Default + Clone,
    {
        let offset = self.position();
        let available = self.remaining();
        match self.inner.read_le::<T>() {
            Ok(value) => Ok(value),
            Err(e) if e.is_eof() => {
                self.inner.set_position(offset);
                Err(DecodeError::TruncatedInput { offset, available })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> DecodeResult<&'a [u8]> {
        self.require(len)?;
        let start = self.position() as usize;
        self.inner.set_position((start + len) as u64);
        Ok(&self.data[start..start + len])
    }

    /// Reads `len` bytes as a UTF-8 string.
    pub fn read_string(&mut self, len: usize) -> DecodeResult<String> {
        let offset = self.position();
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidString { offset })
    }

    /// Reads a u32 length followed by that many bytes of UTF-8.
    pub fn read_prefixed_string(&mut self) -> DecodeResult<String> {
        let len = self.read_u32()? as usize;
        self.read_string(len)
    }

    /// Reads a NUL-terminated UTF-8 string, consuming the terminator.
    pub fn read_cstring(&mut self) -> DecodeResult<String> {
        let offset = self.position();
        let rest = &self.data[(offset as usize).min(self.data.len())..];
        let Some(end) = rest.iter().position(|&b| b == 0) else {
            return Err(DecodeError::TruncatedInput { offset, available: rest.len() });
        };
        let value = std::str::from_utf8(&rest[..end])
            .map_err(|_| DecodeError::InvalidString { offset })?
            .to_string();
        self.inner.set_position(offset + end as u64 + 1);
        Ok(value)
    }

    /// Moves to an absolute offset. The end of the buffer is a valid target.
    pub fn seek(&mut self, pos: u64) -> DecodeResult<()> {
        if pos > self.data.len() as u64 {
            return Err(DecodeError::TruncatedInput { offset: pos, available: 0 });
        }
        self.inner.set_position(pos);
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> DecodeResult<()> {
        self.require(n)?;
        self.inner.set_position(self.position() + n as u64);
        Ok(())
    }
}

/// Reinterprets the big-endian byte image of `value` as an IEEE-754 float.
#[inline]
pub fn hex_to_float(value: u32) -> f32 { f32::from_be_bytes(value.to_be_bytes()) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_to_float_boundaries() {
        assert_eq!(hex_to_float(0x0000_0000).to_bits(), 0.0f32.to_bits());
        assert_eq!(hex_to_float(0x8000_0000).to_bits(), (-0.0f32).to_bits());
        assert_eq!(hex_to_float(0x3F80_0000), 1.0);
        assert_eq!(hex_to_float(0xBF80_0000), -1.0);
    }

    #[test]
    fn primitives_advance_cursor() {
        let data = [0x01, 0x02, 0x00, 0xFE, 0xFF, 0x78, 0x56, 0x34, 0x12, 0x00, 0x00, 0x80, 0x3F];
        let mut r = ByteCursor::new(&data);
        assert_eq!(r.read_u8().unwrap(), 1);
        assert_eq!(r.read_u16().unwrap(), 2);
        assert_eq!(r.read_i16().unwrap(), -2);
        assert_eq!(r.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(r.read_f32().unwrap(), 1.0);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn truncated_read_reports_offset() {
        let mut r = ByteCursor::new(&[0u8; 6]);
        r.skip(4).unwrap();
        match r.read_u32() {
            Err(DecodeError::TruncatedInput { offset, available }) => {
                assert_eq!(offset, 4);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(r.skip(3), Err(DecodeError::TruncatedInput { .. })));
        assert!(r.seek(6).is_ok());
        assert!(matches!(r.seek(7), Err(DecodeError::TruncatedInput { .. })));
    }

    #[test]
    fn strings() {
        let mut data = Vec::new();
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(b"abcfoo\0");
        data.extend_from_slice(&[0xFF, 0xFE]);
        let mut r = ByteCursor::new(&data);
        assert_eq!(r.read_prefixed_string().unwrap(), "abc");
        assert_eq!(r.read_cstring().unwrap(), "foo");
        assert!(matches!(r.read_string(2), Err(DecodeError::InvalidString { offset: 11 })));
    }

    #[test]
    fn binread_types() {
        use crate::format::CAABox;

        let mut data = Vec::new();
        for v in [-1.0f32, -2.0, -3.0, 1.0, 2.0, 3.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let mut r = ByteCursor::new(&data);
        let bounds: CAABox = r.read_type().unwrap();
        assert_eq!(bounds.min.z, -3.0);
        assert_eq!(bounds.max.y, 2.0);

        let mut r = ByteCursor::new(&data[..20]);
        r.skip(2).unwrap();
        assert!(matches!(
            r.read_type::<CAABox>(),
            Err(DecodeError::TruncatedInput { offset: 2, available: 18 })
        ));
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn unterminated_cstring_is_truncated() {
        let mut r = ByteCursor::new(b"abc");
        assert!(matches!(r.read_cstring(), Err(DecodeError::TruncatedInput { offset: 0, .. })));
    }
}
