//! Smoothed-particle hydrodynamics: kernels, equations of state, and the
//! time integrator that composes them over a particle array.

pub mod eos;
pub mod integrator;
pub mod kernel;

pub use eos::{AdiabaticIdealGas, EquationOfState, IdealGas, LinearCole, ParticleState, WeaklyCompressibleCole};
pub use integrator::{IntegrationOrder, TimeIntegrator};
pub use kernel::{CubicSpline, Gaussian, Kernel, Quartic, WendlandC2, WendlandC4, WendlandC6};
