//! Chunk arithmetic for one upload.

/// Segment index of the finalize call.
pub const FINALIZE_SEGMENT: i64 = -1;

/// One contiguous slice of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based segment index.
    pub index: u64,
    /// Byte offset of the first byte.
    pub offset: u64,
    /// Length in bytes, never zero.
    pub len: u64,
}

/// How a source of `total_len` bytes is split into chunks of at most
/// `max_chunk_size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total_len: u64,
    max_chunk_size: u64,
}

impl ChunkPlan {
    /// A chunk size of zero is treated as one byte.
    pub fn new(total_len: u64, max_chunk_size: u64) -> Self {
        Self {
            total_len,
            max_chunk_size: max_chunk_size.max(1),
        }
    }

    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    pub fn max_chunk_size(&self) -> u64 {
        self.max_chunk_size
    }

    /// `ceil(total_len / max_chunk_size)`
    pub fn chunk_count(&self) -> u64 {
        self.total_len.div_ceil(self.max_chunk_size)
    }

    /// Chunks in upload order.
    pub fn chunks(&self) -> impl Iterator<Item = Chunk> {
        let total_len = self.total_len;
        let max = self.max_chunk_size;
        (0..self.chunk_count()).map(move |index| {
            let offset = index * max;
            Chunk {
                index,
                offset,
                len: max.min(total_len - offset),
            }
        })
    }
}
