//! `Multivector<T>`: a ragged 2-D container storing `B` buckets of `T` in
//! CSR form, with two parallel bulk-assembly strategies.
//!
//! - **tall** mode (many buckets, few items per bucket on average): two
//!   passes over the `(bucket, value)` stream. Pass 1 counts per-bucket
//!   sizes with atomic fetch-add; a prefix sum turns counts into offsets;
//!   pass 2 scatters values using atomic fetch-add write cursors. Not
//!   ordered within a bucket.
//! - **wide** mode (few buckets, many items per bucket on average):
//!   per-thread-per-bucket counts, a scan across threads converts them to
//!   per-thread write cursors, and each thread then writes only into its own
//!   cursor range — no atomics needed during the scatter. Ordered
//!   per-thread (items from an earlier chunk precede those from a later
//!   one within the same bucket).
//!
//! Callers that need a canonical, fully-deterministic order must sort each
//! bucket's slice afterward.

use crate::error::{Error, ErrorKind, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A ragged 2-D container of `T`, addressed as `B` buckets in CSR layout.
#[derive(Debug, Clone)]
pub struct Multivector<T> {
    off: std::vec::Vec<usize>,
    val: std::vec::Vec<T>,
}

impl<T> Multivector<T> {
    /// Number of buckets.
    pub fn num_buckets(&self) -> usize {
        self.off.len().saturating_sub(1)
    }

    /// Total number of stored values across all buckets.
    pub fn num_values(&self) -> usize {
        self.val.len()
    }

    /// The values of bucket `i`.
    pub fn bucket(&self, i: usize) -> &[T] {
        &self.val[self.off[i]..self.off[i + 1]]
    }

    /// The values of bucket `i`, mutably.
    pub fn bucket_mut(&mut self, i: usize) -> &mut [T] {
        &mut self.val[self.off[i]..self.off[i + 1]]
    }

    /// Raw CSR offsets (`len() == num_buckets() + 1`).
    pub fn offsets(&self) -> &[usize] {
        &self.off
    }

    /// Raw CSR values.
    pub fn values(&self) -> &[T] {
        &self.val
    }

    /// Reset to a single empty bucket (the "one bucket-offset sentinel").
    pub fn clear(&mut self) {
        self.off = vec![0];
        self.val.clear();
    }

    /// Sort each bucket's slice with `cmp`, giving callers a canonical order.
    pub fn sort_buckets_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        for i in 0..self.num_buckets() {
            let start = self.off[i];
            let end = self.off[i + 1];
            self.val[start..end].sort_by(&mut cmp);
        }
    }
}

impl<T: Send + Sync + Copy + Default> Multivector<T> {
    /// Assemble from a `(bucket_index, value)` pair stream using the tall
    /// strategy: two atomic-counting passes plus a prefix sum.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::BucketIndexOutOfRange`] if any bucket index is
    /// `>= num_buckets`.
    pub fn assemble_tall(num_buckets: usize, pairs: &[(usize, T)]) -> Result<Self> {
        if let Some((b, _)) = pairs.iter().find(|(b, _)| *b >= num_buckets) {
            return Err(Error::new(ErrorKind::BucketIndexOutOfRange {
                index: *b,
                count: num_buckets,
            }));
        }

        // counts[b+2] accumulates the size of bucket b; the +2 shift lets
        // the prefix sum below land bucket starts at counts[b+1] and bucket
        // ends at counts[b+2] in one pass, restoring counts[0]=counts[1]=0.
        let counts: std::vec::Vec<AtomicUsize> =
            (0..num_buckets + 2).map(|_| AtomicUsize::new(0)).collect();
        pairs.par_iter().for_each(|(b, _)| {
            counts[b + 2].fetch_add(1, Ordering::Relaxed);
        });

        let mut running = 0usize;
        let mut off = vec![0usize; num_buckets + 2];
        for i in 0..num_buckets + 2 {
            running += counts[i].load(Ordering::Relaxed);
            off[i] = running;
        }
        // off[1] is the start of bucket 0 (always 0), off[b+2] the end of
        // bucket b. The public offsets array is off[1..=num_buckets+1].
        let final_off: std::vec::Vec<usize> = off[1..num_buckets + 2].to_vec();

        let total = final_off[num_buckets];
        let mut val = vec![T::default(); total];
        let cursor: std::vec::Vec<AtomicUsize> =
            final_off[..num_buckets].iter().map(|&o| AtomicUsize::new(o)).collect();

        // Scatter: disjoint per-bucket ranges, atomic cursor per bucket.
        // SAFETY: each write index comes from a fetch_add on that bucket's
        // own cursor, so no two writes (even across buckets) ever target
        // the same slot, and every slot for a non-empty bucket falls within
        // [final_off[b], final_off[b+1]).
        let val_ptr = val.as_mut_ptr();
        pairs.par_iter().for_each(|(b, v)| {
            let pos = cursor[*b].fetch_add(1, Ordering::Relaxed);
            unsafe { *val_ptr.add(pos) = *v };
        });

        Ok(Self {
            off: final_off,
            val,
        })
    }

    /// Assemble from a `(bucket_index, value)` pair stream using the wide
    /// strategy: per-thread bucket counts, a cross-thread scan, then
    /// lock-free disjoint scatter.
    ///
    /// `num_threads` chunks the pair stream; each chunk is counted and
    /// scattered independently, so values within a bucket are ordered by
    /// the chunk they came from (and, within a chunk, by stream order).
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::BucketIndexOutOfRange`] if any bucket index is
    /// `>= num_buckets`.
    pub fn assemble_wide(
        num_buckets: usize,
        num_threads: usize,
        pairs: &[(usize, T)],
    ) -> Result<Self> {
        if let Some((b, _)) = pairs.iter().find(|(b, _)| *b >= num_buckets) {
            return Err(Error::new(ErrorKind::BucketIndexOutOfRange {
                index: *b,
                count: num_buckets,
            }));
        }
        let num_threads = num_threads.max(1);
        let chunk_size = pairs.len().div_ceil(num_threads).max(1);
        let chunks: std::vec::Vec<&[(usize, T)]> = pairs.chunks(chunk_size).collect();
        let num_chunks = chunks.len();

        // counts[t][b]: number of items chunk t contributes to bucket b.
        let counts: std::vec::Vec<std::vec::Vec<usize>> = chunks
            .par_iter()
            .map(|chunk| {
                let mut row = vec![0usize; num_buckets];
                for (b, _) in chunk.iter() {
                    row[*b] += 1;
                }
                row
            })
            .collect();

        // Bucket totals across all chunks, prefix-summed into CSR offsets.
        let mut off = vec![0usize; num_buckets + 1];
        for b in 0..num_buckets {
            let total: usize = counts.iter().map(|row| row[b]).sum();
            off[b + 1] = off[b] + total;
        }

        // Per-thread, per-bucket write cursors: chunk t starts where chunk
        // t-1 left off, within each bucket's own range.
        let mut cursors = vec![vec![0usize; num_buckets]; num_chunks];
        for b in 0..num_buckets {
            let mut running = off[b];
            for t in 0..num_chunks {
                cursors[t][b] = running;
                running += counts[t][b];
            }
        }

        let total = off[num_buckets];
        let mut val = vec![T::default(); total];
        let val_ptr = val.as_mut_ptr() as usize;

        // SAFETY: cursors[t][b] partitions [off[b], off[b+1]) across chunks
        // with no overlap (verified by construction above), so each chunk
        // writes into a disjoint region of `val` and no synchronization is
        // required between chunks.
        chunks
            .par_iter()
            .zip(cursors.into_par_iter())
            .for_each(|(chunk, mut cursor)| {
                let ptr = val_ptr as *mut T;
                for (b, v) in chunk.iter() {
                    let pos = cursor[*b];
                    cursor[*b] += 1;
                    unsafe { *ptr.add(pos) = *v };
                }
            });

        Ok(Self { off, val })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tall_assembly_groups_by_bucket() {
        let pairs = [(0, 10), (2, 20), (0, 11), (3, 30), (2, 21)];
        let mv = Multivector::assemble_tall(4, &pairs).unwrap();
        assert_eq!(mv.num_buckets(), 4);
        let mut b0 = mv.bucket(0).to_vec();
        b0.sort();
        assert_eq!(b0, vec![10, 11]);
        assert!(mv.bucket(1).is_empty());
        let mut b2 = mv.bucket(2).to_vec();
        b2.sort();
        assert_eq!(b2, vec![20, 21]);
        assert_eq!(mv.bucket(3), &[30]);
    }

    #[test]
    fn wide_assembly_matches_scenario() {
        // 4 buckets, pairs (0,a) (2,b) (0,c) (3,d) (2,e) -> sizes {2,0,2,1}.
        let pairs = [(0, 1), (2, 2), (0, 3), (3, 4), (2, 5)];
        let mv = Multivector::assemble_wide(4, 2, &pairs).unwrap();
        assert_eq!(mv.num_buckets(), 4);
        let sizes: std::vec::Vec<usize> = (0..4).map(|b| mv.bucket(b).len()).collect();
        assert_eq!(sizes, vec![2, 0, 2, 1]);
        let mut b0 = mv.bucket(0).to_vec();
        b0.sort();
        assert_eq!(b0, vec![1, 3]);
        let mut b2 = mv.bucket(2).to_vec();
        b2.sort();
        assert_eq!(b2, vec![2, 5]);
        assert_eq!(mv.bucket(3), &[4]);
    }

    #[test]
    fn out_of_range_bucket_fails() {
        let pairs = [(0, 1), (5, 2)];
        let err = Multivector::assemble_tall(2, &pairs).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::BucketIndexOutOfRange { .. }));
    }

    #[test]
    fn clear_resets_to_sentinel() {
        let pairs = [(0, 1)];
        let mut mv = Multivector::assemble_tall(1, &pairs).unwrap();
        mv.clear();
        assert_eq!(mv.num_buckets(), 0);
        assert_eq!(mv.offsets(), &[0]);
    }
}
