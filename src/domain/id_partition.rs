use crate::domain::error::{DumpChunkError, DumpChunkResult};

/// Inclusive primary-key window `[lower, upper]`.
///
/// A window with `upper == lower - 1` is empty: it only appears when more
/// chunks are requested than there are ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub lower: i128,
    pub upper: i128,
}

impl IdRange {
    pub fn len(&self) -> i128 {
        (self.upper - self.lower + 1).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.upper < self.lower
    }
}

/// Splits `0..=max_id` into `chunk_count` contiguous windows of near-equal size.
#[derive(Debug, Clone, Copy)]
pub struct IdPartitioner {
    max_id: i128,
    chunk_count: i64,
}

impl IdPartitioner {
    pub fn new(max_id: i128, chunk_count: i64) -> DumpChunkResult<Self> {
        if max_id < 0 {
            return Err(DumpChunkError::invalid(format!(
                "max id must be 0 or greater, got {max_id}"
            )));
        }
        if chunk_count < 1 {
            return Err(DumpChunkError::invalid(format!(
                "dump file count must be at least 1, got {chunk_count}"
            )));
        }

        Ok(Self {
            max_id,
            chunk_count,
        })
    }

    pub fn total_ids(&self) -> i128 {
        self.max_id + 1
    }

    pub fn iter_ranges(&self) -> impl Iterator<Item = IdRange> + '_ {
        let chunk_count = i128::from(self.chunk_count);
        let base_size = self.total_ids() / chunk_count;
        let remainder = self.total_ids() % chunk_count;

        // The first `remainder` chunks carry one extra id.
        (0..chunk_count).scan(0i128, move |next_lower, index| {
            let size = base_size + i128::from(index < remainder);
            let range = IdRange {
                lower: *next_lower,
                upper: *next_lower + size - 1,
            };
            *next_lower += size;
            Some(range)
        })
    }
}

pub fn partition(max_id: i128, chunk_count: i64) -> DumpChunkResult<Vec<IdRange>> {
    let partitioner = IdPartitioner::new(max_id, chunk_count)?;
    Ok(partitioner.iter_ranges().collect())
}
