//! Pixelated k-means partitioning: rasterize to a coarse grid, cluster cell
//! centroids, lift labels back to points.

use crate::error::{Error, ErrorKind, Result};
use crate::numeric::Vec as NVec;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

/// Fixed seed for center seeding: reruns on the same input partition
/// identically, which matters for reproducing a simulation's domain
/// decomposition across restarts.
const SEED: u64 = 0x5350_4831_4b4d_4e53;

/// Partition `points` into `k` clusters by rasterizing to a grid of edge
/// `cell_size` (typically `2h`), running Lloyd's algorithm on the
/// population-weighted cell centroids, then lifting cell labels back to
/// points.
///
/// Terminates when cluster-centroid movement drops below `tol`, or after
/// `max_iter` iterations — in the latter case returns
/// [`ErrorKind::ClusteringDidNotConverge`] as a soft warning (the labels are
/// still the caller's best-effort result; the error communicates non-full
/// convergence, not a usable failure).
pub fn pixelated_kmeans<const D: usize>(
    points: &[NVec<f64, D>],
    cell_size: f64,
    k: usize,
    max_iter: usize,
    tol: f64,
) -> (std::vec::Vec<usize>, Result<()>) {
    crate::tit_assert!(k >= 1, "k must be positive");
    if points.is_empty() {
        return (std::vec::Vec::new(), Ok(()));
    }

    let mut cells: HashMap<[i64; D], (NVec<f64, D>, usize)> = HashMap::new();
    let mut cell_of_point = std::vec::Vec::with_capacity(points.len());
    for p in points {
        let cell = cell_index(p, cell_size);
        cell_of_point.push(cell);
        let entry = cells.entry(cell).or_insert((NVec::default(), 0));
        entry.0 += *p;
        entry.1 += 1;
    }
    let cell_keys: std::vec::Vec<[i64; D]> = cells.keys().copied().collect();
    let cell_centroids: std::vec::Vec<NVec<f64, D>> = cell_keys
        .iter()
        .map(|key| {
            let (sum, count) = cells[key];
            sum / count as f64
        })
        .collect();
    let cell_weights: std::vec::Vec<f64> = cell_keys.iter().map(|key| cells[key].1 as f64).collect();

    let k = k.min(cell_centroids.len()).max(1);
    let mut order: std::vec::Vec<usize> = (0..cell_centroids.len()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    order.shuffle(&mut rng);
    let centers: std::vec::Vec<NVec<f64, D>> = order[..k].iter().map(|&i| cell_centroids[i]).collect();

    let mut cell_labels = vec![0usize; cell_centroids.len()];
    let mut converged = false;
    for _ in 0..max_iter {
        for (i, c) in cell_centroids.iter().enumerate() {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (l, center) in centers.iter().enumerate() {
                let d = (*c - *center).norm2();
                if d < best_dist {
                    best_dist = d;
                    best = l;
                }
            }
            cell_labels[i] = best;
        }

        let mut sums = vec![NVec::default(); k];
        let mut weights = vec![0.0; k];
        for (i, c) in cell_centroids.iter().enumerate() {
            let l = cell_labels[i];
            sums[l] += *c * cell_weights[i];
            weights[l] += cell_weights[i];
        }
        let mut movement = 0.0;
        for l in 0..k {
            if weights[l] > 0.0 {
                let new_center = sums[l] / weights[l];
                movement += (new_center - centers[l]).norm();
                centers[l] = new_center;
            }
        }
        if movement < tol {
            converged = true;
            break;
        }
    }

    let cell_index_map: HashMap<[i64; D], usize> = cell_keys
        .iter()
        .enumerate()
        .map(|(i, key)| (*key, i))
        .collect();
    let point_labels: std::vec::Vec<usize> = cell_of_point
        .iter()
        .map(|cell| cell_labels[cell_index_map[cell]])
        .collect();

    let status = if converged {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::ClusteringDidNotConverge {
            iterations: max_iter,
        }))
    };
    (point_labels, status)
}

fn cell_index<const D: usize>(p: &NVec<f64, D>, cell_size: f64) -> [i64; D] {
    let mut cell = [0i64; D];
    for d in 0..D {
        cell[d] = (p[d] / cell_size).floor() as i64;
    }
    cell
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clusters_two_separated_blobs() {
        let mut points = std::vec::Vec::new();
        for i in 0..10 {
            points.push(NVec::from_array([i as f64 * 0.1, 0.0]));
            points.push(NVec::from_array([100.0 + i as f64 * 0.1, 0.0]));
        }
        let (labels, status) = pixelated_kmeans(&points, 0.5, 2, 50, 1e-6);
        assert!(status.is_ok());
        assert_eq!(labels.len(), points.len());
        assert_eq!(labels[0], labels[1]);
        assert_ne!(labels[0], labels[points.len() - 1]);
    }

    #[test]
    fn empty_points_returns_empty() {
        let points: std::vec::Vec<NVec<f64, 2>> = vec![];
        let (labels, status) = pixelated_kmeans(&points, 1.0, 3, 10, 1e-6);
        assert!(labels.is_empty());
        assert!(status.is_ok());
    }
}
