//! Numeric primitives: fixed-size vectors, square matrices, and a portable
//! SIMD register abstraction.

pub mod mat;
pub mod simd;
pub mod vec;

pub use mat::Mat;
pub use simd::{Reg2F64, Reg4F32, Reg4F64, Reg8F32};
pub use vec::Vec;
