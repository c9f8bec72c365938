//! Recursive Inertial Bisection: mass-weighted centroid/covariance
//! partitioning for load balancing.

use crate::numeric::{Mat, Vec as NVec};

/// Partition `points` (with per-point `weights`, e.g. mass) into `parts`
/// labels in `[0, parts)` by recursively bisecting along the eigenvector of
/// largest eigenvalue of the weighted covariance, at the weighted median.
pub fn recursive_inertial_bisection<const D: usize>(
    points: &[NVec<f64, D>],
    weights: &[f64],
    parts: usize,
) -> std::vec::Vec<usize> {
    crate::tit_assert!(points.len() == weights.len(), "points/weights length mismatch");
    let mut labels = vec![0usize; points.len()];
    if parts <= 1 || points.is_empty() {
        return labels;
    }
    let indices: std::vec::Vec<usize> = (0..points.len()).collect();
    bisect(points, weights, &indices, 0, parts, &mut labels);
    labels
}

fn bisect<const D: usize>(
    points: &[NVec<f64, D>],
    weights: &[f64],
    indices: &[usize],
    base_label: usize,
    parts: usize,
    labels: &mut [usize],
) {
    if parts <= 1 || indices.len() <= 1 {
        for &i in indices {
            labels[i] = base_label;
        }
        return;
    }

    let centroid = weighted_centroid(points, weights, indices);
    let axis = dominant_eigenvector(points, weights, indices, centroid);

    // Project onto the axis and split at the weighted median.
    let mut projections: std::vec::Vec<(f64, usize)> = indices
        .iter()
        .map(|&i| ((points[i] - centroid).dot(&axis), i))
        .collect();
    projections.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let total_weight: f64 = indices.iter().map(|&i| weights[i]).sum();
    let mut cumulative = 0.0;
    let mut split = projections.len() / 2;
    for (k, (_, i)) in projections.iter().enumerate() {
        cumulative += weights[*i];
        if cumulative >= total_weight * 0.5 {
            split = k + 1;
            break;
        }
    }
    let split = split.clamp(1, projections.len() - 1);

    let left_parts = parts / 2;
    let right_parts = parts - left_parts;
    let left_indices: std::vec::Vec<usize> = projections[..split].iter().map(|&(_, i)| i).collect();
    let right_indices: std::vec::Vec<usize> = projections[split..].iter().map(|&(_, i)| i).collect();

    bisect(points, weights, &left_indices, base_label, left_parts, labels);
    bisect(
        points,
        weights,
        &right_indices,
        base_label + left_parts,
        right_parts,
        labels,
    );
}

fn weighted_centroid<const D: usize>(
    points: &[NVec<f64, D>],
    weights: &[f64],
    indices: &[usize],
) -> NVec<f64, D> {
    let mut acc = NVec::default();
    let mut total = 0.0;
    for &i in indices {
        acc += points[i] * weights[i];
        total += weights[i];
    }
    if total > 0.0 {
        acc / total
    } else {
        acc
    }
}

/// Dominant eigenvector of the weighted covariance matrix of `points` about
/// `centroid`, found by power iteration (cheap and sufficient since only the
/// top eigenvector is needed).
fn dominant_eigenvector<const D: usize>(
    points: &[NVec<f64, D>],
    weights: &[f64],
    indices: &[usize],
    centroid: NVec<f64, D>,
) -> NVec<f64, D> {
    let mut cov = Mat::default();
    for &i in indices {
        let d = points[i] - centroid;
        cov += Mat::outer(d, d) * weights[i];
    }

    let mut v = NVec::splat(1.0 / (D as f64).sqrt());
    for _ in 0..50 {
        let next = cov * v;
        let norm = next.norm();
        if norm < 1e-300 {
            break;
        }
        v = next / norm;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bisects_into_requested_part_count() {
        let points: std::vec::Vec<NVec<f64, 2>> =
            (0..16).map(|i| NVec::from_array([i as f64, 0.0])).collect();
        let weights = vec![1.0; 16];
        let labels = recursive_inertial_bisection(&points, &weights, 4);
        let max_label = *labels.iter().max().unwrap();
        assert!(max_label < 4);
        assert_eq!(labels.len(), 16);
    }

    #[test]
    fn single_part_labels_everything_zero() {
        let points: std::vec::Vec<NVec<f64, 2>> =
            (0..5).map(|i| NVec::from_array([i as f64, 0.0])).collect();
        let weights = vec![1.0; 5];
        let labels = recursive_inertial_bisection(&points, &weights, 1);
        assert!(labels.iter().all(|&l| l == 0));
    }
}
