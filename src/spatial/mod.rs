//! Spatial indexing and partitioning: neighbor search structures (uniform
//! grid, k-d tree) and load-partitioning strategies (recursive inertial
//! bisection, pixelated k-means, Hilbert-curve blocking), plus the pipeline
//! that ties them to the particle model to (re)build an
//! [`Adjacency`](crate::particle::Adjacency).

pub mod build;
pub mod grid;
pub mod hilbert;
pub mod kdtree;
pub mod kmeans;
pub mod rib;

pub use build::{build_adjacency_2d, blocks_are_vertex_disjoint, BuildConfig, BuiltAdjacency};
pub use grid::GridSearch;
pub use hilbert::{hilbert_blocks_2d, hilbert_index_2d};
pub use kdtree::KDTree;
pub use kmeans::pixelated_kmeans;
pub use rib::recursive_inertial_bisection;
