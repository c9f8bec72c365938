//! `Reg<T,N>`: a thin wrapper over a portable SIMD register.
//!
//! Backed by the `wide` crate; `wide`'s concrete register types never leak
//! through the public surface. Only the lane widths `wide` and common
//! hardware jointly support are instantiated: 2 and 4 lanes for `f64`, 4 and
//! 8 lanes for `f32`. Reduction order for `sum`/`min`/`max` is a fixed,
//! stable function of `N` (pairwise-then-sequential, as emitted by `wide`
//! itself), so results are reproducible within one process invocation.

use crate::tit_assert;

macro_rules! impl_reg {
    ($name:ident, $scalar:ty, $n:expr, $wide:ty) => {
        /// SIMD register of
        #[doc = stringify!($n)]
        /// lanes of
        #[doc = stringify!($scalar)]
        /// .
        #[derive(Debug, Clone, Copy)]
        pub struct $name(pub(crate) $wide);

        impl $name {
            pub const LANES: usize = $n;

            /// Load `N` lanes from the front of `span`.
            ///
            /// # Panics (debug only)
            ///
            /// Loading from a span shorter than `N` is a contract violation.
            pub fn load(span: &[$scalar]) -> Self {
                tit_assert!(span.len() >= Self::LANES, "Reg::load: span shorter than N");
                let mut buf = [0 as $scalar; $n];
                buf.copy_from_slice(&span[..$n]);
                Self(<$wide>::new(buf))
            }

            /// Store `N` lanes to the front of `span`.
            pub fn store(&self, span: &mut [$scalar]) {
                tit_assert!(span.len() >= Self::LANES, "Reg::store: span shorter than N");
                let buf = self.0.to_array();
                span[..$n].copy_from_slice(&buf);
            }

            /// Broadcast a scalar to all lanes.
            pub fn splat(value: $scalar) -> Self {
                Self(<$wide>::splat(value))
            }

            pub fn min(self, rhs: Self) -> Self {
                Self(self.0.min(rhs.0))
            }

            pub fn max(self, rhs: Self) -> Self {
                Self(self.0.max(rhs.0))
            }

            /// Fused multiply-add: `self * a + b`.
            pub fn mul_add(self, a: Self, b: Self) -> Self {
                Self(self.0.mul_add(a.0, b.0))
            }

            /// Horizontal sum of all lanes.
            pub fn sum(self) -> $scalar {
                self.0.to_array().iter().sum()
            }

            /// Horizontal minimum of all lanes.
            pub fn hmin(self) -> $scalar {
                self.0
                    .to_array()
                    .into_iter()
                    .fold($scalar::INFINITY, |a, b| a.min(b))
            }

            /// Horizontal maximum of all lanes.
            pub fn hmax(self) -> $scalar {
                self.0
                    .to_array()
                    .into_iter()
                    .fold($scalar::NEG_INFINITY, |a, b| a.max(b))
            }

            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            /// Lane-wise sign: `-1`, `0`, or `1` (following `signum`'s
            /// convention of preserving sign on zero).
            pub fn sign(self) -> Self {
                let mut out = self.0.to_array();
                for v in out.iter_mut() {
                    *v = v.signum();
                }
                Self(<$wide>::new(out))
            }

            pub fn floor(self) -> Self {
                Self(self.0.floor())
            }

            pub fn ceil(self) -> Self {
                Self(self.0.ceil())
            }

            pub fn round(self) -> Self {
                Self(self.0.round())
            }

            /// Elementwise selection: `mask` lanes select `a`, others `b`.
            /// `mask` is produced by a lane comparison.
            pub fn blend(mask: Self, a: Self, b: Self) -> Self {
                Self(mask.0.blend(a.0, b.0))
            }

            pub fn cmp_lt(self, rhs: Self) -> Self {
                Self(self.0.cmp_lt(rhs.0))
            }

            pub fn cmp_gt(self, rhs: Self) -> Self {
                Self(self.0.cmp_gt(rhs.0))
            }
        }

        impl std::ops::Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl std::ops::Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl std::ops::Mul for $name {
            type Output = Self;
            fn mul(self, rhs: Self) -> Self {
                Self(self.0 * rhs.0)
            }
        }

        impl std::ops::Div for $name {
            type Output = Self;
            fn div(self, rhs: Self) -> Self {
                Self(self.0 / rhs.0)
            }
        }
    };
}

impl_reg!(Reg2F64, f64, 2, wide::f64x2);
impl_reg!(Reg4F64, f64, 4, wide::f64x4);
impl_reg!(Reg4F32, f32, 4, wide::f32x4);
impl_reg!(Reg8F32, f32, 8, wide::f32x8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_store_roundtrip() {
        let input = [1.0f64, 2.0, 3.0, 4.0];
        let reg = Reg4F64::load(&input);
        let mut output = [0.0f64; 4];
        reg.store(&mut output);
        assert_eq!(input, output);
    }

    #[test]
    fn arithmetic_and_reductions() {
        let a = Reg4F64::load(&[1.0, 2.0, 3.0, 4.0]);
        let b = Reg4F64::load(&[4.0, 3.0, 2.0, 1.0]);
        assert_eq!((a + b).sum(), 20.0);
        assert_eq!(a.max(b).sum(), 4.0 + 3.0 + 3.0 + 4.0);
        assert_eq!(a.hmin(), 1.0);
        assert_eq!(a.hmax(), 4.0);
    }

    #[test]
    fn fused_multiply_add() {
        let a = Reg4F64::splat(2.0);
        let b = Reg4F64::splat(3.0);
        let c = Reg4F64::splat(1.0);
        // a * b + c == 7 in every lane.
        assert_eq!(a.mul_add(b, c).sum(), 28.0);
    }
}
