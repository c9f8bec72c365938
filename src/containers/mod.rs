//! Fixed-capacity array, dense tensor, and ragged CSR multivector.

pub mod fixed_array;
pub mod mdvector;
pub mod multivector;

pub use fixed_array::FixedArray;
pub use mdvector::Mdvector;
pub use multivector::Multivector;
