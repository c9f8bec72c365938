//! `SnapshotProducer`: the collaborator contract a particle snapshot
//! producer exposes to an external consumer (the persistence engine, or any
//! other caller wanting a flat byte view of a field column).

use super::array::{FieldValue, ParticleArray};
use super::field::FieldStorage;

/// Something that can serialize its fields to little-endian bytes in index
/// order, matching the byte layout [`crate::storage::DataStorage::array_data_write`]
/// expects: `count * width` bytes per array, `width` given by the field's
/// [`crate::datatype::DataType::width`].
pub trait SnapshotProducer {
    /// Number of particles this snapshot covers.
    fn particle_count(&self) -> usize;

    /// Names of the variable fields available to snapshot, in schema order.
    fn field_names(&self) -> std::vec::Vec<&'static str>;

    /// Flatten a field's values across every particle into little-endian
    /// bytes, one value's worth of bytes after another in index order.
    fn snapshot_field(&self, name: &str) -> std::vec::Vec<u8>;
}

impl<const D: usize> SnapshotProducer for ParticleArray<D> {
    fn particle_count(&self) -> usize {
        self.size()
    }

    fn field_names(&self) -> std::vec::Vec<&'static str> {
        self.schema()
            .fields()
            .iter()
            .filter(|f| f.storage == FieldStorage::Variable)
            .map(|f| f.name)
            .collect()
    }

    fn snapshot_field(&self, name: &str) -> std::vec::Vec<u8> {
        let mut out = std::vec::Vec::new();
        for i in 0..self.size() {
            field_value_bytes(self.get(i, name), &mut out);
        }
        out
    }
}

fn field_value_bytes<const D: usize>(value: FieldValue<D>, out: &mut std::vec::Vec<u8>) {
    match value {
        FieldValue::Scalar(x) => out.extend_from_slice(&x.to_le_bytes()),
        FieldValue::Vector(v) => {
            for x in v.as_array() {
                out.extend_from_slice(&x.to_le_bytes());
            }
        }
        FieldValue::Matrix(m) => {
            for i in 0..D {
                for j in 0..D {
                    out.extend_from_slice(&m[(i, j)].to_le_bytes());
                }
            }
        }
        FieldValue::PartVec(p) => out.extend_from_slice(&p.serialize().to_le_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::field::{names, standard_schema};

    #[test]
    fn snapshot_field_names_exclude_constants() {
        let array: ParticleArray<2> = ParticleArray::new(standard_schema(2));
        let names = array.field_names();
        assert!(names.contains(&names::R));
        assert!(!names.contains(&names::M));
    }

    #[test]
    fn snapshot_scalar_field_matches_manual_le_bytes() {
        let mut array: ParticleArray<2> = ParticleArray::new(standard_schema(2));
        array.append();
        array.append();
        array.set(0, names::RHO, FieldValue::Scalar(1.5));
        array.set(1, names::RHO, FieldValue::Scalar(2.5));
        let bytes = array.snapshot_field(names::RHO);
        let mut expected = std::vec::Vec::new();
        expected.extend_from_slice(&1.5f64.to_le_bytes());
        expected.extend_from_slice(&2.5f64.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn snapshot_vector_field_flattens_components_in_order() {
        let mut array: ParticleArray<2> = ParticleArray::new(standard_schema(2));
        array.append();
        array.set(
            0,
            names::R,
            FieldValue::Vector(crate::numeric::Vec::from_array([3.0, 4.0])),
        );
        let bytes = array.snapshot_field(names::R);
        assert_eq!(bytes.len(), 16);
        assert_eq!(f64::from_le_bytes(bytes[0..8].try_into().unwrap()), 3.0);
        assert_eq!(f64::from_le_bytes(bytes[8..16].try_into().unwrap()), 4.0);
    }
}
