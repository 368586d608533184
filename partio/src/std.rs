// SPDX-License-Identifier: MIT

use std::io::{Error, ErrorKind, Read, Seek, SeekFrom, Write};

use crate::{SectorIO, SectorIOError, SectorIOResult};

/// `SectorIO` over any `Read + Write + Seek` (image files, raw block devices).
#[derive(Debug)]
pub struct StdSectorIO<T: Read + Write + Seek> {
    io: T,
}

impl<T: Read + Write + Seek> StdSectorIO<T> {
    #[inline]
    pub fn new(io: T) -> Self {
        Self { io }
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: Read + Write + Seek> SectorIO for StdSectorIO<T> {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> SectorIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.write_all(data)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> SectorIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.read_exact(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> SectorIOResult {
        self.io.flush()?;
        Ok(())
    }
}

impl From<Error> for SectorIOError {
    #[cold]
    #[inline(never)]
    fn from(e: Error) -> Self {
        match e.kind() {
            ErrorKind::UnexpectedEof => SectorIOError::OutOfBounds,
            ErrorKind::Unsupported => SectorIOError::Unsupported,
            _ => {
                // Leak the string to produce a 'static str. Acceptable for error mapping.
                let leaked_str: &'static str = Box::leak(e.to_string().into_boxed_str());
                SectorIOError::Other(leaked_str)
            }
        }
    }
}
