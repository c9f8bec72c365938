//! The adjacency-build pipeline: ties the particle model (§ particle) and
//! spatial search/partitioning together into the per-step neighbor-list and
//! coloring refresh.

use crate::containers::Multivector;
use crate::numeric::Vec as NVec;
use crate::particle::{Adjacency, FieldValue, ParticleArray, PartVec};
use crate::spatial::grid::GridSearch;
use crate::spatial::hilbert::hilbert_blocks_2d;

/// Configuration for one adjacency rebuild.
pub struct BuildConfig {
    /// Number of partition blocks `P` used for edge coloring.
    pub num_parts: usize,
    /// Domain half-extent used to mirror fixed particles through the
    /// nearest boundary face (a simple axis-aligned box domain).
    pub domain_half_extent: f64,
}

/// The result of a full adjacency rebuild: neighbor lists plus the `P+1`
/// color blocks described in the discretization pipeline's third phase.
pub struct BuiltAdjacency {
    pub adjacency: Adjacency,
    /// Edge lists `color_blocks[0..P]` are pairwise vertex-disjoint and may
    /// be processed without synchronization; `color_blocks[P]` (the
    /// boundary block) must be processed serially.
    pub color_blocks: Multivector<(usize, usize)>,
    pub parts: std::vec::Vec<usize>,
}

/// Build (or rebuild) the adjacency of a 2D particle array: neighbor search
/// at `radius(h[i])` per particle, fixed-particle interpolation adjacency,
/// canonical bucket order, space-filling-curve partition labels, and the
/// `P+1`-way edge coloring.
///
/// `radius_of` maps a particle index to its search radius (typically
/// `k * h[i]`); `is_fixed` flags boundary/ghost particles.
pub fn build_adjacency_2d(
    array: &ParticleArray<2>,
    radius_of: impl Fn(usize) -> f64,
    is_fixed: impl Fn(usize) -> bool,
    config: &BuildConfig,
) -> crate::error::Result<BuiltAdjacency> {
    let n = array.size();
    let positions: std::vec::Vec<NVec<f64, 2>> = (0..n)
        .map(|i| array.get(i, crate::particle::field::names::R).as_vector())
        .collect();

    let max_radius = (0..n).map(&radius_of).fold(0.0_f64, f64::max).max(1e-12);
    let search = GridSearch::build(&positions, max_radius);

    // Step 3: neighbor search per particle.
    let mut pairs: std::vec::Vec<(usize, usize)> = std::vec::Vec::new();
    for i in 0..n {
        for j in search.search(positions[i], radius_of(i))? {
            if j != i {
                pairs.push((i, j));
            }
        }
    }

    // Step 4: fixed-particle mirror search, non-fixed hits only.
    let mut interpolation_pairs: std::vec::Vec<(usize, usize)> = std::vec::Vec::new();
    for i in 0..n {
        if !is_fixed(i) {
            continue;
        }
        let mirror = mirror_point(positions[i], config.domain_half_extent);
        for j in search.search(mirror, 3.0 * radius_of(i))? {
            if !is_fixed(j) {
                interpolation_pairs.push((i, j));
            }
        }
    }

    let mut adjacency = Adjacency::from_pairs(n, &pairs)?
        .with_interpolation(Multivector::assemble_tall(n, &interpolation_pairs)?);
    // Step 5: canonical bucket order.
    adjacency.sort_canonical();

    // Step 6: space-filling-curve partition blocks, recorded into parinfo.
    let parts = hilbert_blocks_2d(&positions, config.num_parts);

    // Step 7: wide-assembly edge coloring into P+1 blocks.
    let edges = adjacency.unique_edges();
    let colored: std::vec::Vec<(usize, (usize, usize))> = edges
        .iter()
        .map(|&(i, j)| {
            let block = if parts[i] == parts[j] {
                parts[i]
            } else {
                config.num_parts
            };
            (block, (i, j))
        })
        .collect();
    let color_blocks = Multivector::assemble_wide(config.num_parts + 1, 4, &colored)?;

    Ok(BuiltAdjacency {
        adjacency,
        color_blocks,
        parts,
    })
}

/// Checks whether every interior color block (`< num_parts`) is vertex
/// disjoint, i.e. no particle index appears in more than one edge of the
/// same block.
///
/// This is *not* guaranteed by partition-based coloring in general (a
/// particle can have several same-partition neighbors), only by partitioners
/// that happen to produce a matching per block. Pixelated k-means in
/// particular does not give a hard guarantee here. Callers that need the
/// lock-free accumulation property should check this at debug time rather
/// than assume it.
pub fn blocks_are_vertex_disjoint(built: &BuiltAdjacency) -> bool {
    for block in 0..built.color_blocks.num_buckets().saturating_sub(1) {
        let mut seen = std::collections::HashSet::new();
        for &(i, j) in built.color_blocks.bucket(block) {
            if !seen.insert(i) || !seen.insert(j) {
                return false;
            }
        }
    }
    true
}

/// Serialize partition labels into each particle's `parinfo` field as a
/// single finest-assigned level, per the standard field's serialization
/// rule.
pub fn write_parinfo(array: &mut ParticleArray<2>, parts: &[usize]) {
    for (i, &part) in parts.iter().enumerate() {
        let mut levels = [0u8; crate::particle::partvec::LEVELS];
        levels[0] = (part % 256) as u8;
        array.set(
            i,
            crate::particle::field::names::PARINFO,
            FieldValue::PartVec(PartVec::new(levels)),
        );
    }
}

fn mirror_point(p: NVec<f64, 2>, half_extent: f64) -> NVec<f64, 2> {
    let mut out = p;
    for d in 0..2 {
        if p[d] < 0.0 {
            out[d] = -half_extent - p[d];
        } else if p[d] > half_extent {
            out[d] = 2.0 * half_extent - p[d];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::standard_schema;

    #[test]
    fn coloring_invariant_holds() {
        let mut array: ParticleArray<2> = ParticleArray::new(standard_schema(2));
        for x in 0..4 {
            for y in 0..4 {
                array.append();
                let idx = (x * 4 + y) as usize;
                array.set(
                    idx,
                    crate::particle::field::names::R,
                    FieldValue::Vector(NVec::from_array([x as f64, y as f64])),
                );
                array.set(idx, crate::particle::field::names::H, FieldValue::Scalar(0.6));
            }
        }

        let config = BuildConfig {
            num_parts: 4,
            domain_half_extent: 10.0,
        };
        let built = build_adjacency_2d(&array, |_| 1.0, |_| false, &config).unwrap();

        for block in 0..config.num_parts {
            for &(i, j) in built.color_blocks.bucket(block) {
                assert_eq!(built.parts[i], block);
                assert_eq!(built.parts[j], block);
            }
        }
        for &(i, j) in built.color_blocks.bucket(config.num_parts) {
            assert_ne!(built.parts[i], built.parts[j]);
        }
    }
}
