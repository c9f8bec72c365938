//! Equations of state: closures relating pressure (and sound speed) to
//! density and internal energy.

use crate::error::{Error, ErrorKind, Result};

/// Per-particle thermodynamic state an equation of state reads from and
/// writes to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParticleState {
    pub rho: f64,
    pub u: f64,
    pub p: f64,
    pub cs: f64,
}

/// A closure relating pressure (and sound speed) to density and internal
/// energy.
pub trait EquationOfState: Send + Sync {
    /// Compute `p` (and, when required, `cs`) from `{rho, u}`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidState`] if a precondition (`rho > 0`, etc.) is
    /// violated.
    fn compute_pressure(&self, state: &mut ParticleState) -> Result<()>;
}

fn require(cond: bool, message: impl Into<String>) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::InvalidState(message.into())))
    }
}

/// `p = (gamma - 1) * rho * u`, `cs = sqrt(gamma * (gamma - 1) * u)`.
#[derive(Debug, Clone, Copy)]
pub struct IdealGas {
    pub gamma: f64,
}

impl EquationOfState for IdealGas {
    fn compute_pressure(&self, state: &mut ParticleState) -> Result<()> {
        require(state.rho > 0.0, "IdealGas requires rho > 0")?;
        require(self.gamma > 1.0, "IdealGas requires gamma > 1")?;
        state.p = (self.gamma - 1.0) * state.rho * state.u;
        state.cs = (self.gamma * (self.gamma - 1.0) * state.u).sqrt();
        Ok(())
    }
}

/// `p = kappa * rho^gamma`, `cs = sqrt(gamma * p / rho)`.
#[derive(Debug, Clone, Copy)]
pub struct AdiabaticIdealGas {
    pub kappa: f64,
    pub gamma: f64,
}

impl EquationOfState for AdiabaticIdealGas {
    fn compute_pressure(&self, state: &mut ParticleState) -> Result<()> {
        require(state.rho > 0.0, "AdiabaticIdealGas requires rho > 0")?;
        require(self.gamma > 1.0, "AdiabaticIdealGas requires gamma > 1")?;
        state.p = self.kappa * state.rho.powf(self.gamma);
        state.cs = (self.gamma * state.p / state.rho).sqrt();
        Ok(())
    }
}

/// Tait-style weakly-compressible EOS: `p1 = rho0*c0^2/gamma; p = p0 +
/// p1*(rho/rho0)^gamma - p1`.
#[derive(Debug, Clone, Copy)]
pub struct WeaklyCompressibleCole {
    pub c0: f64,
    pub rho0: f64,
    pub p0: f64,
    pub gamma: f64,
}

impl EquationOfState for WeaklyCompressibleCole {
    fn compute_pressure(&self, state: &mut ParticleState) -> Result<()> {
        require(state.rho > 0.0, "WeaklyCompressibleCole requires rho > 0")?;
        require(self.gamma > 1.0, "WeaklyCompressibleCole requires gamma > 1")?;
        require(self.c0 > 0.0, "WeaklyCompressibleCole requires c0 > 0")?;
        let p1 = self.rho0 * self.c0 * self.c0 / self.gamma;
        state.p = self.p0 + p1 * (state.rho / self.rho0).powf(self.gamma) - p1;
        state.cs = self.c0;
        Ok(())
    }
}

/// Linearized Cole EOS: `p = p0 + c0^2 * (rho - rho0)`.
#[derive(Debug, Clone, Copy)]
pub struct LinearCole {
    pub c0: f64,
    pub rho0: f64,
    pub p0: f64,
}

impl EquationOfState for LinearCole {
    fn compute_pressure(&self, state: &mut ParticleState) -> Result<()> {
        require(state.rho > 0.0, "LinearCole requires rho > 0")?;
        require(self.c0 > 0.0, "LinearCole requires c0 > 0")?;
        state.p = self.p0 + self.c0 * self.c0 * (state.rho - self.rho0);
        state.cs = self.c0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ideal_gas_scenario() {
        let eos = IdealGas { gamma: 1.4 };
        let mut state = ParticleState {
            rho: 2.0,
            u: 5.0,
            ..Default::default()
        };
        eos.compute_pressure(&mut state).unwrap();
        assert!((state.p - 4.0).abs() < 1e-12);
        assert!((state.cs - (1.4_f64 * 0.4 * 5.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn linear_cole_scenario() {
        let eos = LinearCole {
            c0: 10.0,
            rho0: 1000.0,
            p0: 0.0,
        };
        let mut hi = ParticleState {
            rho: 1001.0,
            ..Default::default()
        };
        eos.compute_pressure(&mut hi).unwrap();
        assert!((hi.p - 100.0).abs() < 1e-9);

        let mut lo = ParticleState {
            rho: 999.0,
            ..Default::default()
        };
        eos.compute_pressure(&mut lo).unwrap();
        assert!((lo.p - (-100.0)).abs() < 1e-9);
    }

    #[test]
    fn nonpositive_density_fails() {
        let eos = IdealGas { gamma: 1.4 };
        let mut state = ParticleState {
            rho: -1.0,
            u: 1.0,
            ..Default::default()
        };
        let err = eos.compute_pressure(&mut state).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidState(_)));
    }
}
