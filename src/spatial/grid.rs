//! `GridSearch`: a uniform-grid neighbor search over a fixed point set.

use crate::error::{Error, ErrorKind, Result};
use crate::numeric::Vec as NVec;
use std::collections::HashMap;

/// A uniform grid whose cell edge is fixed at build time; `search` scans the
/// 3^D neighboring cells (own cell plus every adjacent cell along each
/// axis) and applies an exact distance test.
pub struct GridSearch<const D: usize> {
    cell_size: f64,
    points: std::vec::Vec<NVec<f64, D>>,
    cells: HashMap<[i64; D], std::vec::Vec<usize>>,
}

impl<const D: usize> GridSearch<D> {
    /// Bin `points` into cells of edge `cell_size` (must be at least the
    /// largest radius this index will be queried with).
    pub fn build(points: &[NVec<f64, D>], cell_size: f64) -> Self {
        crate::tit_assert!(cell_size > 0.0, "grid cell size must be positive");
        let mut cells: HashMap<[i64; D], std::vec::Vec<usize>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            cells.entry(cell_of(p, cell_size)).or_default().push(i);
        }
        Self {
            cell_size,
            points: points.to_vec(),
            cells,
        }
    }

    /// Indices of points of the 3^D neighboring cells of `p` within radius
    /// `r`, exact-distance filtered.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidRadius`] if `r <= 0`.
    pub fn search(&self, p: NVec<f64, D>, r: f64) -> Result<std::vec::Vec<usize>> {
        if r <= 0.0 {
            return Err(Error::new(ErrorKind::InvalidRadius(r)));
        }
        let r2 = r * r;
        let center = cell_of(&p, self.cell_size);
        let mut out = std::vec::Vec::new();
        for offset in neighbor_offsets::<D>() {
            let mut cell = center;
            for d in 0..D {
                cell[d] += offset[d];
            }
            if let Some(indices) = self.cells.get(&cell) {
                for &i in indices {
                    if (self.points[i] - p).norm2() <= r2 {
                        out.push(i);
                    }
                }
            }
        }
        Ok(out)
    }
}

fn cell_of<const D: usize>(p: &NVec<f64, D>, cell_size: f64) -> [i64; D] {
    let mut cell = [0i64; D];
    for d in 0..D {
        cell[d] = (p[d] / cell_size).floor() as i64;
    }
    cell
}

/// Every offset in `{-1, 0, 1}^D`, enumerated by treating the index as a
/// base-3 number.
fn neighbor_offsets<const D: usize>() -> std::vec::Vec<[i64; D]> {
    let total = 3usize.pow(D as u32);
    let mut out = std::vec::Vec::with_capacity(total);
    for mut idx in 0..total {
        let mut offset = [0i64; D];
        for d in 0..D {
            offset[d] = (idx % 3) as i64 - 1;
            idx /= 3;
        }
        out.push(offset);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cartesian_grid_query_scenario() {
        // points = Cartesian grid {0,1,2}^2.
        let mut points = std::vec::Vec::new();
        for x in 0..3 {
            for y in 0..3 {
                points.push(NVec::from_array([x as f64, y as f64]));
            }
        }
        let grid = GridSearch::build(&points, 1.0);
        let hits = grid.search(NVec::from_array([1.0, 1.0]), 1.0).unwrap();
        let mut found: std::vec::Vec<(i64, i64)> = hits
            .iter()
            .map(|&i| (points[i][0] as i64, points[i][1] as i64))
            .collect();
        found.sort();
        assert_eq!(found, vec![(0, 1), (1, 0), (1, 1), (1, 2), (2, 1)]);
    }

    #[test]
    fn nonpositive_radius_fails() {
        let points = vec![NVec::from_array([0.0, 0.0])];
        let grid = GridSearch::build(&points, 1.0);
        let err = grid.search(NVec::from_array([0.0, 0.0]), 0.0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidRadius(_)));
    }

    #[test]
    fn empty_point_set_returns_empty() {
        let points: std::vec::Vec<NVec<f64, 2>> = vec![];
        let grid = GridSearch::build(&points, 1.0);
        let hits = grid.search(NVec::from_array([0.0, 0.0]), 1.0).unwrap();
        assert!(hits.is_empty());
    }
}
