// SPDX-License-Identifier: MIT

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use crate::{SectorIO, SectorIOError, SectorIOResult};

/// Sparse in-memory device: only written blocks are stored, everything
/// else reads back as zeroes.
///
/// Useful for tests and dry runs on multi-gigabyte geometries.
#[derive(Debug, Clone)]
pub struct SparseSectorIO {
    block_size: usize,
    len: u64,
    blocks: BTreeMap<u64, Vec<u8>>,
}

impl SparseSectorIO {
    /// `block_size` must be non-zero; it is clamped to 1 otherwise.
    pub fn new(block_size: usize, len: u64) -> Self {
        Self {
            block_size: block_size.max(1),
            len,
            blocks: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of blocks that have been written at least once.
    #[inline]
    pub fn allocated_blocks(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    fn check_bounds(&self, offset: u64, len: usize) -> SectorIOResult {
        let end = offset
            .checked_add(len as u64)
            .ok_or(SectorIOError::OutOfBounds)?;
        if end > self.len {
            return Err(SectorIOError::OutOfBounds);
        }
        Ok(())
    }
}

impl SectorIO for SparseSectorIO {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> SectorIOResult {
        self.check_bounds(offset, data.len())?;
        let block_size = self.block_size;
        let bs = block_size as u64;
        let mut pos = 0usize;
        while pos < data.len() {
            let abs = offset + pos as u64;
            let block = abs / bs;
            let within = (abs % bs) as usize;
            let n = (block_size - within).min(data.len() - pos);
            let slot = self
                .blocks
                .entry(block)
                .or_insert_with(|| vec![0u8; block_size]);
            slot[within..within + n].copy_from_slice(&data[pos..pos + n]);
            pos += n;
        }
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> SectorIOResult {
        self.check_bounds(offset, buf.len())?;
        let bs = self.block_size as u64;
        let mut pos = 0usize;
        while pos < buf.len() {
            let abs = offset + pos as u64;
            let block = abs / bs;
            let within = (abs % bs) as usize;
            let n = (self.block_size - within).min(buf.len() - pos);
            match self.blocks.get(&block) {
                Some(slot) => buf[pos..pos + n].copy_from_slice(&slot[within..within + n]),
                None => buf[pos..pos + n].fill(0),
            }
            pos += n;
        }
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> SectorIOResult {
        Ok(())
    }
}
