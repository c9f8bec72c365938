//! Particle field schema: an ordered, named set of columns a
//! [`super::array::ParticleArray`] is built from.
//!
//! The source this is modeled on packs field tags into compile-time tuples
//! via template metaprogramming. That doesn't translate to idiomatic Rust
//! (no variadic const-generic tuples), so fields are a runtime schema
//! instead: an ordered `(name, DataType, storage kind)` table, with the
//! struct-of-arrays column lookup done by name. The numeric payload itself
//! still monomorphizes on `D`, which is the part that actually benefits.

use crate::datatype::{DataType, Kind};

/// Whether a field holds one value per particle, or a single value shared by
/// the whole array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStorage {
    Variable,
    Constant,
}

/// One entry of a particle schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub data_type: DataType,
    pub storage: FieldStorage,
}

/// The ordered field set of a [`super::array::ParticleArray`].
#[derive(Debug, Clone)]
pub struct Schema {
    fields: std::vec::Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: std::vec::Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn find(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields
            .iter()
            .filter(|f| f.storage == FieldStorage::Variable)
    }

    pub fn constants(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields
            .iter()
            .filter(|f| f.storage == FieldStorage::Constant)
    }
}

/// Names of the standard fields required by the SPH discretization pipeline.
pub mod names {
    pub const R: &str = "r";
    pub const V: &str = "v";
    pub const RHO: &str = "rho";
    pub const P: &str = "p";
    pub const M: &str = "m";
    pub const H: &str = "h";
    pub const CS: &str = "cs";
    pub const U: &str = "u";
    pub const DU_DT: &str = "du_dt";
    pub const MU: &str = "mu";
    pub const KAPPA: &str = "kappa";
    pub const ALPHA: &str = "alpha";
    pub const DALPHA_DT: &str = "dalpha_dt";
    pub const GRAD_V: &str = "grad_v";
    pub const DIV_V: &str = "div_v";
    pub const CURL_V: &str = "curl_v";
    pub const DRHO_DT: &str = "drho_dt";
    pub const DV_DT: &str = "dv_dt";
    pub const PARINFO: &str = "parinfo";
}

/// Build the standard schema required by the discretization pipeline, for a
/// `dim`-dimensional simulation.
pub fn standard_schema(dim: u8) -> Schema {
    use names::*;
    use FieldStorage::{Constant, Variable};

    let vector = DataType::vector(Kind::F64, dim);
    let matrix = DataType::matrix(Kind::F64, dim);
    let scalar = DataType::scalar(Kind::F64);
    let partvec = DataType::scalar(Kind::U64);

    let field = |name: &'static str, data_type: DataType, storage: FieldStorage| FieldSpec {
        name,
        data_type,
        storage,
    };

    Schema::new(vec![
        field(R, vector, Variable),
        field(V, vector, Variable),
        field(RHO, scalar, Variable),
        field(P, scalar, Variable),
        field(M, scalar, Constant),
        field(H, scalar, Variable),
        field(CS, scalar, Variable),
        field(U, scalar, Variable),
        field(DU_DT, scalar, Variable),
        field(MU, scalar, Variable),
        field(KAPPA, scalar, Variable),
        field(ALPHA, scalar, Variable),
        field(DALPHA_DT, scalar, Variable),
        field(GRAD_V, matrix, Variable),
        field(DIV_V, scalar, Variable),
        field(CURL_V, vector, Variable),
        field(DRHO_DT, scalar, Variable),
        field(DV_DT, vector, Variable),
        field(PARINFO, partvec, Variable),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_schema_has_expected_fields() {
        let schema = standard_schema(3);
        assert!(schema.find(names::R).is_some());
        assert!(schema.find(names::M).unwrap().storage == FieldStorage::Constant);
        assert_eq!(schema.variables().count() + schema.constants().count(), schema.fields().len());
    }
}
