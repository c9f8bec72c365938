//! SPH smoothing kernels: compactly supported radial weight functions and
//! their gradients.

use crate::numeric::Vec as NVec;

/// A compactly supported SPH kernel `W(x, h)` over a `D`-dimensional space.
///
/// `D` is a parameter of the trait itself, not of its methods, so kernels
/// stay usable behind `dyn Kernel<D>` — the integrator selects a concrete
/// kernel at construction and otherwise only depends on this interface.
///
/// Implementations must be consistent: `radius(h)` is the support cutoff
/// such that `W(x, h) == 0` for `|x| > radius(h)`.
pub trait Kernel<const D: usize>: Send + Sync {
    /// Weight at separation `x` with smoothing length `h`.
    fn value(&self, x: NVec<f64, D>, h: f64) -> f64;

    /// Gradient of the weight with respect to `x`.
    fn gradient(&self, x: NVec<f64, D>, h: f64) -> NVec<f64, D>;

    /// Support cutoff: `W(x, h) == 0` whenever `|x| > radius(h)`.
    fn radius(&self, h: f64) -> f64;
}

fn sigma(dim: usize, h: f64, value_1d: f64, value_2d: f64, value_3d: f64) -> f64 {
    match dim {
        1 => value_1d / h,
        2 => value_2d / (h * h),
        _ => value_3d / (h * h * h),
    }
}

/// Cubic spline (M4) kernel, the classical SPH weight function.
#[derive(Debug, Clone, Copy, Default)]
pub struct CubicSpline;

impl<const D: usize> Kernel<D> for CubicSpline {
    fn value(&self, x: NVec<f64, D>, h: f64) -> f64 {
        let q = x.norm() / h;
        let sigma = sigma(D, h, 2.0 / 3.0, 10.0 / (7.0 * std::f64::consts::PI), 1.0 / std::f64::consts::PI);
        let f = if q < 1.0 {
            1.0 - 1.5 * q * q + 0.75 * q * q * q
        } else if q < 2.0 {
            0.25 * (2.0 - q).powi(3)
        } else {
            0.0
        };
        sigma * f
    }

    fn gradient(&self, x: NVec<f64, D>, h: f64) -> NVec<f64, D> {
        let r = x.norm();
        if r < 1e-300 {
            return NVec::default();
        }
        let q = r / h;
        let sigma = sigma(D, h, 2.0 / 3.0, 10.0 / (7.0 * std::f64::consts::PI), 1.0 / std::f64::consts::PI);
        let df_dq = if q < 1.0 {
            -3.0 * q + 2.25 * q * q
        } else if q < 2.0 {
            -0.75 * (2.0 - q).powi(2)
        } else {
            0.0
        };
        let scale = sigma * df_dq / (h * r);
        x * scale
    }

    fn radius(&self, h: f64) -> f64 {
        2.0 * h
    }
}

/// Wendland C2 kernel (3D/2D normalization), compact support `2h`, widely
/// used for its lack of pairing instability.
#[derive(Debug, Clone, Copy, Default)]
pub struct WendlandC2;

impl<const D: usize> Kernel<D> for WendlandC2 {
    fn value(&self, x: NVec<f64, D>, h: f64) -> f64 {
        let q = (x.norm() / h).min(2.0) / 2.0;
        let sigma = sigma(D, h, 3.0 / 4.0, 7.0 / (4.0 * std::f64::consts::PI), 21.0 / (16.0 * std::f64::consts::PI));
        if q >= 1.0 {
            return 0.0;
        }
        sigma * (1.0 - q).powi(4) * (1.0 + 4.0 * q)
    }

    fn gradient(&self, x: NVec<f64, D>, h: f64) -> NVec<f64, D> {
        let r = x.norm();
        if r < 1e-300 {
            return NVec::default();
        }
        let q = (r / h).min(2.0) / 2.0;
        if q >= 1.0 {
            return NVec::default();
        }
        let sigma = sigma(D, h, 3.0 / 4.0, 7.0 / (4.0 * std::f64::consts::PI), 21.0 / (16.0 * std::f64::consts::PI));
        let df_dq = -20.0 * q * (1.0 - q).powi(3);
        let scale = sigma * df_dq / (2.0 * h * r);
        x * scale
    }

    fn radius(&self, h: f64) -> f64 {
        2.0 * h
    }
}

/// Wendland C4 kernel: higher-order smoothness than C2, same compact
/// support `2h`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WendlandC4;

impl<const D: usize> Kernel<D> for WendlandC4 {
    fn value(&self, x: NVec<f64, D>, h: f64) -> f64 {
        let q = (x.norm() / h).min(2.0) / 2.0;
        let sigma = sigma(D, h, 3.0 / 2.0, 9.0 / (4.0 * std::f64::consts::PI), 495.0 / (256.0 * std::f64::consts::PI));
        if q >= 1.0 {
            return 0.0;
        }
        sigma * (1.0 - q).powi(6) * (1.0 + 6.0 * q + 35.0 / 3.0 * q * q)
    }

    fn gradient(&self, x: NVec<f64, D>, h: f64) -> NVec<f64, D> {
        let r = x.norm();
        if r < 1e-300 {
            return NVec::default();
        }
        let q = (r / h).min(2.0) / 2.0;
        if q >= 1.0 {
            return NVec::default();
        }
        let sigma = sigma(D, h, 3.0 / 2.0, 9.0 / (4.0 * std::f64::consts::PI), 495.0 / (256.0 * std::f64::consts::PI));
        let poly = 1.0 + 6.0 * q + 35.0 / 3.0 * q * q;
        let dpoly = 6.0 + 70.0 / 3.0 * q;
        let df_dq = -6.0 * (1.0 - q).powi(5) * poly + (1.0 - q).powi(6) * dpoly;
        let scale = sigma * df_dq / (2.0 * h * r);
        x * scale
    }

    fn radius(&self, h: f64) -> f64 {
        2.0 * h
    }
}

/// Wendland C6 kernel: named alongside C2/C4 in the discretization pipeline's
/// kernel family, same compact support `2h` and the same polynomial
/// construction technique as the other Wendland kernels.
#[derive(Debug, Clone, Copy, Default)]
pub struct WendlandC6;

impl<const D: usize> Kernel<D> for WendlandC6 {
    fn value(&self, x: NVec<f64, D>, h: f64) -> f64 {
        let q = (x.norm() / h).min(2.0) / 2.0;
        let sigma = sigma(D, h, 55.0 / 32.0, 78.0 / (7.0 * std::f64::consts::PI), 1365.0 / (512.0 * std::f64::consts::PI));
        if q >= 1.0 {
            return 0.0;
        }
        let poly = 1.0 + 8.0 * q + 25.0 * q * q + 32.0 * q * q * q;
        sigma * (1.0 - q).powi(8) * poly
    }

    fn gradient(&self, x: NVec<f64, D>, h: f64) -> NVec<f64, D> {
        let r = x.norm();
        if r < 1e-300 {
            return NVec::default();
        }
        let q = (r / h).min(2.0) / 2.0;
        if q >= 1.0 {
            return NVec::default();
        }
        let sigma = sigma(D, h, 55.0 / 32.0, 78.0 / (7.0 * std::f64::consts::PI), 1365.0 / (512.0 * std::f64::consts::PI));
        let poly = 1.0 + 8.0 * q + 25.0 * q * q + 32.0 * q * q * q;
        let dpoly = 8.0 + 50.0 * q + 96.0 * q * q;
        let df_dq = -8.0 * (1.0 - q).powi(7) * poly + (1.0 - q).powi(8) * dpoly;
        let scale = sigma * df_dq / (2.0 * h * r);
        x * scale
    }

    fn radius(&self, h: f64) -> f64 {
        2.0 * h
    }
}

/// Gaussian kernel, truncated at `3h` for practical support.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gaussian;

impl<const D: usize> Kernel<D> for Gaussian {
    fn value(&self, x: NVec<f64, D>, h: f64) -> f64 {
        let q = x.norm() / h;
        if q > 3.0 {
            return 0.0;
        }
        let sigma = sigma(D, h, 1.0 / std::f64::consts::PI.sqrt(), 1.0 / std::f64::consts::PI, 1.0 / (std::f64::consts::PI * std::f64::consts::PI.sqrt()));
        sigma * (-q * q).exp()
    }

    fn gradient(&self, x: NVec<f64, D>, h: f64) -> NVec<f64, D> {
        let r = x.norm();
        if r < 1e-300 || r / h > 3.0 {
            return NVec::default();
        }
        let q = r / h;
        let sigma = sigma(D, h, 1.0 / std::f64::consts::PI.sqrt(), 1.0 / std::f64::consts::PI, 1.0 / (std::f64::consts::PI * std::f64::consts::PI.sqrt()));
        let df_dq = -2.0 * q * (-q * q).exp();
        let scale = sigma * df_dq / (h * r);
        x * scale
    }

    fn radius(&self, h: f64) -> f64 {
        3.0 * h
    }
}

/// Quartic spline kernel, compact support `2.5h`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quartic;

impl<const D: usize> Kernel<D> for Quartic {
    fn value(&self, x: NVec<f64, D>, h: f64) -> f64 {
        let q = x.norm() / h;
        let sigma = sigma(D, h, 1.0 / 24.0, 96.0 / (1199.0 * std::f64::consts::PI), 1.0 / (20.0 * std::f64::consts::PI));
        let f = |t: f64| (2.5 - t).max(0.0).powi(4);
        let value = f(q) - 5.0 * f(q - 1.0) + 10.0 * f(q - 2.0);
        sigma * value
    }

    fn gradient(&self, x: NVec<f64, D>, h: f64) -> NVec<f64, D> {
        let r = x.norm();
        if r < 1e-300 {
            return NVec::default();
        }
        let q = r / h;
        let sigma = sigma(D, h, 1.0 / 24.0, 96.0 / (1199.0 * std::f64::consts::PI), 1.0 / (20.0 * std::f64::consts::PI));
        let df = |t: f64| -4.0 * (2.5 - t).max(0.0).powi(3);
        let df_dq = df(q) - 5.0 * df(q - 1.0) + 10.0 * df(q - 2.0);
        let scale = sigma * df_dq / (h * r);
        x * scale
    }

    fn radius(&self, h: f64) -> f64 {
        2.5 * h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_spline_vanishes_past_support_radius() {
        let kernel = CubicSpline;
        let h = 1.0;
        let x: NVec<f64, 2> = NVec::from_array([kernel.radius(h) + 0.1, 0.0]);
        assert_eq!(kernel.value(x, h), 0.0);
    }

    #[test]
    fn cubic_spline_positive_at_origin() {
        let kernel = CubicSpline;
        let x: NVec<f64, 2> = NVec::from_array([0.0, 0.0]);
        assert!(kernel.value(x, 1.0) > 0.0);
    }

    #[test]
    fn wendland_c2_gradient_points_away_from_origin() {
        let kernel = WendlandC2;
        let x: NVec<f64, 2> = NVec::from_array([0.5, 0.0]);
        let g = kernel.gradient(x, 1.0);
        assert!(g[0] < 0.0);
    }

    #[test]
    fn wendland_c6_vanishes_past_support_radius() {
        let kernel = WendlandC6;
        let h = 1.0;
        let x: NVec<f64, 2> = NVec::from_array([kernel.radius(h) + 0.1, 0.0]);
        assert_eq!(kernel.value(x, h), 0.0);
    }
}
