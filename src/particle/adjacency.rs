//! `Adjacency`: the CSR-form neighbor structure over a particle array, plus
//! the parallel interpolation adjacency used to drive fixed (boundary)
//! particles from their mirror point's non-fixed neighbors.

use crate::containers::Multivector;
use crate::error::Result;

/// For every particle index `i`, the set of neighbor indices `N(i)`, stored
/// CSR-style, plus a parallel interpolation adjacency for fixed particles.
pub struct Adjacency {
    neighbors: Multivector<usize>,
    interpolation: Multivector<usize>,
}

impl Adjacency {
    /// Build from an explicit `(owner, neighbor)` pair stream — typically
    /// the output of [`crate::spatial::build`]'s neighbor search step.
    pub fn from_pairs(num_particles: usize, pairs: &[(usize, usize)]) -> Result<Self> {
        let values: std::vec::Vec<(usize, usize)> =
            pairs.iter().map(|&(i, j)| (i, j)).collect();
        let neighbors = Multivector::assemble_tall(num_particles, &values)?;
        Ok(Self {
            neighbors,
            interpolation: Multivector::assemble_tall(num_particles, &[])?,
        })
    }

    /// Attach an interpolation adjacency (built separately, over the same
    /// particle count) for fixed particles.
    pub fn with_interpolation(mut self, interpolation: Multivector<usize>) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn num_particles(&self) -> usize {
        self.neighbors.num_buckets()
    }

    /// `N(i)`: neighbor indices of particle `i`.
    pub fn neighbors_of(&self, i: usize) -> &[usize] {
        self.neighbors.bucket(i)
    }

    /// Non-fixed particles near fixed particle `i`'s mirror point.
    pub fn interpolation_of(&self, i: usize) -> &[usize] {
        self.interpolation.bucket(i)
    }

    /// Canonicalize neighbor order (ascending index) within every bucket.
    pub fn sort_canonical(&mut self) {
        self.neighbors.sort_buckets_by(|a, b| a.cmp(b));
        self.interpolation.sort_buckets_by(|a, b| a.cmp(b));
    }

    /// Every unique unordered pair `(i, j)` with `i < j` and `j` a neighbor
    /// of `i` — the edge set the discretization pipeline accumulates over.
    pub fn unique_edges(&self) -> std::vec::Vec<(usize, usize)> {
        let mut edges = std::vec::Vec::new();
        for i in 0..self.num_particles() {
            for &j in self.neighbors_of(i) {
                if i < j {
                    edges.push((i, j));
                }
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_group_by_owner() {
        let pairs = [(0, 1), (0, 2), (1, 0), (2, 0)];
        let adj = Adjacency::from_pairs(3, &pairs).unwrap();
        let mut n0 = adj.neighbors_of(0).to_vec();
        n0.sort();
        assert_eq!(n0, vec![1, 2]);
        assert_eq!(adj.neighbors_of(1), &[0]);
    }

    #[test]
    fn unique_edges_deduplicates_symmetric_pairs() {
        let pairs = [(0, 1), (1, 0), (1, 2), (2, 1)];
        let adj = Adjacency::from_pairs(3, &pairs).unwrap();
        let edges = adj.unique_edges();
        assert_eq!(edges, vec![(0, 1), (1, 2)]);
    }
}
