//! `PartitionLabelReader`: the collaborator contract an external
//! partition-aware consumer (domain decomposition visualization, a load
//! balancer) reads partition labels through, without depending on
//! [`super::array::ParticleArray`]'s full field-addressable API.

use super::array::ParticleArray;
use super::field::names;
use super::partvec::PartVec;

/// Reads a [`ParticleArray`]'s `parinfo` field in index order.
pub struct PartitionLabelReader<'a, const D: usize> {
    array: &'a ParticleArray<D>,
    next: usize,
}

impl<'a, const D: usize> PartitionLabelReader<'a, D> {
    pub fn new(array: &'a ParticleArray<D>) -> Self {
        Self { array, next: 0 }
    }
}

impl<'a, const D: usize> Iterator for PartitionLabelReader<'a, D> {
    type Item = PartVec;

    fn next(&mut self) -> Option<PartVec> {
        if self.next >= self.array.size() {
            return None;
        }
        let label = self.array.get(self.next, names::PARINFO).as_partvec();
        self.next += 1;
        Some(label)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.array.size() - self.next;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::array::FieldValue;
    use crate::particle::field::standard_schema;

    #[test]
    fn reads_labels_in_index_order() {
        let mut array: ParticleArray<2> = ParticleArray::new(standard_schema(2));
        array.append();
        array.append();
        array.set(0, names::PARINFO, FieldValue::PartVec(PartVec::new([1; 8])));
        array.set(1, names::PARINFO, FieldValue::PartVec(PartVec::new([2; 8])));

        let labels: std::vec::Vec<PartVec> = PartitionLabelReader::new(&array).collect();
        assert_eq!(labels, vec![PartVec::new([1; 8]), PartVec::new([2; 8])]);
    }

    #[test]
    fn empty_array_yields_no_labels() {
        let array: ParticleArray<2> = ParticleArray::new(standard_schema(2));
        assert_eq!(PartitionLabelReader::new(&array).count(), 0);
    }
}
