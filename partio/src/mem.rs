// SPDX-License-Identifier: MIT

use crate::{SectorIO, SectorIOError, SectorIOResult};

/// In-memory implementation of `SectorIO` over a borrowed buffer.
///
/// Useful for tests and RAM-backed disk images.
#[derive(Debug)]
pub struct MemSectorIO<'a> {
    buffer: &'a mut [u8],
}

impl<'a> MemSectorIO<'a> {
    #[inline]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.buffer.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    fn check_bounds(&self, offset: u64, len: usize) -> SectorIOResult<usize> {
        let end = offset
            .checked_add(len as u64)
            .ok_or(SectorIOError::OutOfBounds)?;
        if end > self.buffer.len() as u64 {
            return Err(SectorIOError::OutOfBounds);
        }
        Ok(offset as usize)
    }
}

impl SectorIO for MemSectorIO<'_> {
    #[inline(always)]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> SectorIOResult {
        let start = self.check_bounds(offset, data.len())?;
        self.buffer[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    #[inline(always)]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> SectorIOResult {
        let start = self.check_bounds(offset, buf.len())?;
        buf.copy_from_slice(&self.buffer[start..start + buf.len()]);
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> SectorIOResult {
        Ok(())
    }
}

#[cfg(all(test, feature = "std"))]
mod test {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_rw() {
        let mut buf = [0u8; 256];
        let mut io = MemSectorIO::new(&mut buf);
        io.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut output = [0u8; 4];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
    }

    #[test]
    fn test_bounds() {
        let mut buf = [0u8; 64];
        let mut io = MemSectorIO::new(&mut buf);
        assert_eq!(io.write_at(60, &[0; 8]), Err(SectorIOError::OutOfBounds));
        let mut output = [0u8; 4];
        assert_eq!(
            io.read_at(u64::MAX - 1, &mut output),
            Err(SectorIOError::OutOfBounds)
        );
    }

    #[test]
    fn test_struct_rw_through_disk_set() {
        let mut buf = [0u8; 1024];
        {
            let mut set = DiskSet::new();
            set.attach(2, MemSectorIO::new(&mut buf));
            set.write_struct(2, 512, &0xAA55u16.to_le_bytes()).unwrap();
            let magic: [u8; 2] = set.read_struct(2, 512).unwrap();
            assert_eq!(u16::from_le_bytes(magic), 0xAA55);
        }
        assert_eq!(&buf[512..514], &[0x55, 0xAA]);
    }
}
