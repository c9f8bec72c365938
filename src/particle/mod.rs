//! The particle model: field schema, struct-of-arrays particle array, and
//! the partition-aware neighbor (adjacency) structure built over it.

pub mod adjacency;
pub mod array;
pub mod field;
pub mod partition_label;
pub mod partvec;
pub mod snapshot;

pub use adjacency::Adjacency;
pub use array::{FieldValue, ParticleArray, ParticleView};
pub use field::{standard_schema, FieldSpec, FieldStorage, Schema};
pub use partition_label::PartitionLabelReader;
pub use partvec::PartVec;
pub use snapshot::SnapshotProducer;
