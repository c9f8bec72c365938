//! Space-filling curve ordering (Hilbert, 2D/3D) used to bin particles into
//! contiguous, roughly load-balanced blocks for `parinfo` assignment.

use crate::numeric::Vec as NVec;

/// Number of bits per axis used to quantize coordinates before computing the
/// Hilbert index; `2^BITS` cells per axis.
const BITS: u32 = 16;

/// Hilbert-curve index of a 2D point, given the bounding box `(min, max)`
/// used to quantize it into `[0, 2^BITS)` per axis.
pub fn hilbert_index_2d(p: NVec<f64, 2>, min: NVec<f64, 2>, max: NVec<f64, 2>) -> u64 {
    let mut x = quantize(p[0], min[0], max[0]);
    let mut y = quantize(p[1], min[1], max[1]);
    let mut rx;
    let mut ry;
    let mut d: u64 = 0;
    let n = 1u32 << BITS;
    let mut s = n / 2;
    while s > 0 {
        rx = u32::from((x & s) > 0);
        ry = u32::from((y & s) > 0);
        d += (s as u64) * (s as u64) * ((3 * rx) ^ ry) as u64;
        rotate(n, &mut x, &mut y, rx, ry);
        s /= 2;
    }
    d
}

fn quantize(value: f64, min: f64, max: f64) -> u32 {
    let extent = (max - min).max(f64::EPSILON);
    let t = ((value - min) / extent).clamp(0.0, 1.0);
    (t * ((1u64 << BITS) - 1) as f64) as u32
}

fn rotate(n: u32, x: &mut u32, y: &mut u32, rx: u32, ry: u32) {
    if ry == 0 {
        if rx == 1 {
            *x = n - 1 - *x;
            *y = n - 1 - *y;
        }
        std::mem::swap(x, y);
    }
}

/// Bin `points` into `num_blocks` contiguous blocks of approximately equal
/// size, ordered by Hilbert index: returns the block index for each point.
pub fn hilbert_blocks_2d(points: &[NVec<f64, 2>], num_blocks: usize) -> std::vec::Vec<usize> {
    if points.is_empty() || num_blocks == 0 {
        return vec![0; points.len()];
    }
    let mut min = NVec::splat(f64::INFINITY);
    let mut max = NVec::splat(f64::NEG_INFINITY);
    for p in points {
        for d in 0..2 {
            min[d] = min[d].min(p[d]);
            max[d] = max[d].max(p[d]);
        }
    }

    let mut order: std::vec::Vec<usize> = (0..points.len()).collect();
    order.sort_by_key(|&i| hilbert_index_2d(points[i], min, max));

    let mut blocks = vec![0usize; points.len()];
    let block_size = points.len().div_ceil(num_blocks);
    for (rank, &i) in order.iter().enumerate() {
        blocks[i] = (rank / block_size).min(num_blocks - 1);
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_points_get_nearby_indices() {
        let min = NVec::from_array([0.0, 0.0]);
        let max = NVec::from_array([1.0, 1.0]);
        let a = hilbert_index_2d(NVec::from_array([0.1, 0.1]), min, max);
        let b = hilbert_index_2d(NVec::from_array([0.11, 0.1]), min, max);
        let c = hilbert_index_2d(NVec::from_array([0.9, 0.9]), min, max);
        assert!(a.abs_diff(b) < a.abs_diff(c));
    }

    #[test]
    fn blocks_cover_every_point() {
        let points: std::vec::Vec<NVec<f64, 2>> =
            (0..40).map(|i| NVec::from_array([(i % 7) as f64, (i / 7) as f64])).collect();
        let blocks = hilbert_blocks_2d(&points, 4);
        assert_eq!(blocks.len(), points.len());
        assert!(blocks.iter().all(|&b| b < 4));
    }
}
