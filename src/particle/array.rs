//! `ParticleArray`: a field-addressable, struct-of-arrays particle store.

use super::field::{FieldStorage, Schema};
use super::partvec::PartVec;
use crate::numeric::{Mat, Vec as NVec};
use std::collections::HashMap;

/// A single field's value, read from or written to a particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<const D: usize> {
    Scalar(f64),
    Vector(NVec<f64, D>),
    Matrix(Mat<f64, D>),
    PartVec(PartVec),
}

impl<const D: usize> FieldValue<D> {
    pub fn as_scalar(&self) -> f64 {
        match self {
            FieldValue::Scalar(v) => *v,
            _ => panic!("field value is not a scalar"),
        }
    }

    pub fn as_vector(&self) -> NVec<f64, D> {
        match self {
            FieldValue::Vector(v) => *v,
            _ => panic!("field value is not a vector"),
        }
    }

    pub fn as_matrix(&self) -> Mat<f64, D> {
        match self {
            FieldValue::Matrix(v) => *v,
            _ => panic!("field value is not a matrix"),
        }
    }

    pub fn as_partvec(&self) -> PartVec {
        match self {
            FieldValue::PartVec(v) => *v,
            _ => panic!("field value is not a partvec"),
        }
    }
}

#[derive(Debug, Clone)]
enum Column<const D: usize> {
    Scalar(std::vec::Vec<f64>),
    Vector(std::vec::Vec<NVec<f64, D>>),
    Matrix(std::vec::Vec<Mat<f64, D>>),
    PartVec(std::vec::Vec<PartVec>),
}

impl<const D: usize> Column<D> {
    fn new_variable(data_type: crate::datatype::DataType) -> Self {
        use crate::datatype::{Kind, Rank};
        match (data_type.rank(), data_type.kind()) {
            (Rank::Scalar, Kind::U64) => Column::PartVec(std::vec::Vec::new()),
            (Rank::Scalar, _) => Column::Scalar(std::vec::Vec::new()),
            (Rank::Vector, _) => Column::Vector(std::vec::Vec::new()),
            (Rank::Matrix, _) => Column::Matrix(std::vec::Vec::new()),
        }
    }

    fn push_default(&mut self) {
        match self {
            Column::Scalar(v) => v.push(0.0),
            Column::Vector(v) => v.push(NVec::default()),
            Column::Matrix(v) => v.push(Mat::default()),
            Column::PartVec(v) => v.push(PartVec::default()),
        }
    }

    fn get(&self, i: usize) -> FieldValue<D> {
        match self {
            Column::Scalar(v) => FieldValue::Scalar(v[i]),
            Column::Vector(v) => FieldValue::Vector(v[i]),
            Column::Matrix(v) => FieldValue::Matrix(v[i]),
            Column::PartVec(v) => FieldValue::PartVec(v[i]),
        }
    }

    fn set(&mut self, i: usize, value: FieldValue<D>) {
        match (self, value) {
            (Column::Scalar(v), FieldValue::Scalar(x)) => v[i] = x,
            (Column::Vector(v), FieldValue::Vector(x)) => v[i] = x,
            (Column::Matrix(v), FieldValue::Matrix(x)) => v[i] = x,
            (Column::PartVec(v), FieldValue::PartVec(x)) => v[i] = x,
            _ => panic!("field value type does not match column type"),
        }
    }
}

#[derive(Debug, Clone)]
enum ConstValue<const D: usize> {
    Scalar(f64),
    Vector(NVec<f64, D>),
    Matrix(Mat<f64, D>),
    PartVec(PartVec),
}

impl<const D: usize> ConstValue<D> {
    fn new_default(data_type: crate::datatype::DataType) -> Self {
        use crate::datatype::{Kind, Rank};
        match (data_type.rank(), data_type.kind()) {
            (Rank::Scalar, Kind::U64) => ConstValue::PartVec(PartVec::default()),
            (Rank::Scalar, _) => ConstValue::Scalar(0.0),
            (Rank::Vector, _) => ConstValue::Vector(NVec::default()),
            (Rank::Matrix, _) => ConstValue::Matrix(Mat::default()),
        }
    }

    fn get(&self) -> FieldValue<D> {
        match self {
            ConstValue::Scalar(x) => FieldValue::Scalar(*x),
            ConstValue::Vector(x) => FieldValue::Vector(*x),
            ConstValue::Matrix(x) => FieldValue::Matrix(*x),
            ConstValue::PartVec(x) => FieldValue::PartVec(*x),
        }
    }

    fn set(&mut self, value: FieldValue<D>) {
        match (self, value) {
            (ConstValue::Scalar(v), FieldValue::Scalar(x)) => *v = x,
            (ConstValue::Vector(v), FieldValue::Vector(x)) => *v = x,
            (ConstValue::Matrix(v), FieldValue::Matrix(x)) => *v = x,
            (ConstValue::PartVec(v), FieldValue::PartVec(x)) => *v = x,
            _ => panic!("field value type does not match column type"),
        }
    }
}

/// A struct-of-arrays particle array: a dense `[0, size)` index space with
/// per-particle (variable) and whole-array (constant) fields addressed by
/// name.
pub struct ParticleArray<const D: usize> {
    schema: Schema,
    size: usize,
    variables: HashMap<&'static str, Column<D>>,
    constants: HashMap<&'static str, ConstValue<D>>,
}

impl<const D: usize> ParticleArray<D> {
    /// Build an empty array (`size() == 0`) over `schema`.
    pub fn new(schema: Schema) -> Self {
        let mut variables = HashMap::new();
        let mut constants = HashMap::new();
        for field in schema.variables() {
            variables.insert(field.name, Column::new_variable(field.data_type));
        }
        for field in schema.constants() {
            constants.insert(field.name, ConstValue::new_default(field.data_type));
        }
        Self {
            schema,
            size: 0,
            variables,
            constants,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Append a new, default-initialized particle; returns a view on it.
    pub fn append(&mut self) -> ParticleView<'_, D> {
        for column in self.variables.values_mut() {
            column.push_default();
        }
        let index = self.size;
        self.size += 1;
        ParticleView { array: self, index }
    }

    /// Views over every particle, in index order.
    pub fn views(&self) -> impl Iterator<Item = ParticleView<'_, D>> {
        (0..self.size).map(move |index| ParticleView {
            array: self,
            index,
        })
    }

    fn variable_column(&self, name: &str) -> &Column<D> {
        self.variables
            .get(name)
            .unwrap_or_else(|| panic!("unknown variable field {name:?}"))
    }

    fn variable_column_mut(&mut self, name: &str) -> &mut Column<D> {
        self.variables
            .get_mut(name)
            .unwrap_or_else(|| panic!("unknown variable field {name:?}"))
    }

    /// Read a variable field of particle `index`.
    pub fn get(&self, index: usize, name: &str) -> FieldValue<D> {
        crate::tit_assert!(index < self.size, "particle index out of range");
        self.variable_column(name).get(index)
    }

    /// Write a variable field of particle `index`.
    pub fn set(&mut self, index: usize, name: &str, value: FieldValue<D>) {
        crate::tit_assert!(index < self.size, "particle index out of range");
        self.variable_column_mut(name).set(index, value);
    }

    /// Read a constant field's broadcast value.
    pub fn get_const(&self, name: &str) -> FieldValue<D> {
        self.constants
            .get(name)
            .unwrap_or_else(|| panic!("unknown constant field {name:?}"))
            .get()
    }

    /// Broadcast a new value to a constant field, for all particles.
    pub fn set_const(&mut self, name: &str, value: FieldValue<D>) {
        self.constants
            .get_mut(name)
            .unwrap_or_else(|| panic!("unknown constant field {name:?}"))
            .set(value);
    }
}

/// A non-owning `(array, index)` handle. Equality requires the same
/// backing array.
#[derive(Clone, Copy)]
pub struct ParticleView<'a, const D: usize> {
    array: &'a ParticleArray<D>,
    index: usize,
}

impl<'a, const D: usize> ParticleView<'a, D> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, name: &str) -> FieldValue<D> {
        self.array.get(self.index, name)
    }

    pub fn get_const(&self, name: &str) -> FieldValue<D> {
        self.array.get_const(name)
    }
}

impl<'a, const D: usize> PartialEq for ParticleView<'a, D> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.array, other.array) && self.index == other.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::field::standard_schema;

    #[test]
    fn append_grows_and_defaults() {
        let mut array: ParticleArray<3> = ParticleArray::new(standard_schema(3));
        assert_eq!(array.size(), 0);
        array.append();
        array.append();
        assert_eq!(array.size(), 2);
        assert_eq!(array.get(0, "rho").as_scalar(), 0.0);
    }

    #[test]
    fn variable_field_read_write() {
        let mut array: ParticleArray<3> = ParticleArray::new(standard_schema(3));
        array.append();
        array.set(0, "rho", FieldValue::Scalar(1000.0));
        assert_eq!(array.get(0, "rho").as_scalar(), 1000.0);

        let r = NVec::from_array([1.0, 2.0, 3.0]);
        array.set(0, "r", FieldValue::Vector(r));
        assert_eq!(array.get(0, "r").as_vector(), r);
    }

    #[test]
    fn constant_field_broadcasts() {
        let mut array: ParticleArray<3> = ParticleArray::new(standard_schema(3));
        array.append();
        array.append();
        array.set_const("m", FieldValue::Scalar(0.5));
        assert_eq!(array.get_const("m").as_scalar(), 0.5);
    }

    #[test]
    fn view_equality_requires_same_array() {
        let mut a: ParticleArray<3> = ParticleArray::new(standard_schema(3));
        a.append();
        let mut b: ParticleArray<3> = ParticleArray::new(standard_schema(3));
        b.append();
        let va = a.views().next().unwrap();
        let va2 = a.views().next().unwrap();
        let vb = b.views().next().unwrap();
        assert_eq!(va, va2);
        assert_ne!(va, vb);
    }
}
