//! `KDTree`: a balanced bounding-box k-d tree over a fixed point set.

use crate::numeric::Vec as NVec;

struct Node<const D: usize> {
    /// Contiguous range into the tree's permutation array.
    range: (usize, usize),
    /// `None` for a leaf; `Some((axis, split_value))` for an internal node.
    split: Option<(usize, f64)>,
    children: Option<(Box<Node<D>>, Box<Node<D>>)>,
}

/// A balanced k-d tree, split by median on the widest axis of the current
/// bounding box at each level.
pub struct KDTree<const D: usize> {
    points: std::vec::Vec<NVec<f64, D>>,
    perm: std::vec::Vec<usize>,
    root: Option<Node<D>>,
}

impl<const D: usize> KDTree<D> {
    /// Build a tree over `points`, with leaves holding at most `max_leaf`
    /// points.
    pub fn build(points: &[NVec<f64, D>], max_leaf: usize) -> Self {
        crate::tit_assert!(max_leaf >= 1, "max_leaf must be positive");
        let mut perm: std::vec::Vec<usize> = (0..points.len()).collect();
        let root = if points.is_empty() {
            None
        } else {
            let hi = points.len();
            Some(Self::build_node(points, &mut perm, 0, hi, max_leaf))
        };
        Self { points: points.to_vec(), perm, root }
    }

    fn build_node(
        points: &[NVec<f64, D>],
        perm: &mut [usize],
        lo: usize,
        hi: usize,
        max_leaf: usize,
    ) -> Node<D> {
        if hi - lo <= max_leaf {
            return Node {
                range: (lo, hi),
                split: None,
                children: None,
            };
        }

        let axis = widest_axis(points, &perm[lo..hi]);
        let mid = lo + (hi - lo) / 2;

        // Select the median element by rank so the split is an exact
        // order statistic: everything in perm[lo..mid] is <= perm[mid]'s
        // key and everything in perm[mid..hi] is >= it, by construction of
        // `select_nth` rather than by an independent value threshold that
        // could disagree with where the elements actually end up.
        select_nth(points, perm, lo, hi, mid, axis);
        let split_value = points[perm[mid]][axis];

        let left = Self::build_node(points, perm, lo, mid, max_leaf);
        let right = Self::build_node(points, perm, mid, hi, max_leaf);

        Node {
            range: (lo, hi),
            split: Some((axis, split_value)),
            children: Some((Box::new(left), Box::new(right))),
        }
    }

    /// Indices of points within radius `r` of `p`.
    pub fn search(&self, p: NVec<f64, D>, r: f64) -> std::vec::Vec<usize> {
        let mut out = std::vec::Vec::new();
        if let Some(root) = &self.root {
            self.search_node(root, p, r * r, &mut out);
        }
        out
    }

    fn search_node(&self, node: &Node<D>, p: NVec<f64, D>, r2: f64, out: &mut std::vec::Vec<usize>) {
        match (&node.split, &node.children) {
            (None, None) => {
                let (lo, hi) = node.range;
                for &i in &self.perm[lo..hi] {
                    if (self.points[i] - p).norm2() <= r2 {
                        out.push(i);
                    }
                }
            }
            (Some((axis, split_value)), Some((left, right))) => {
                let gap = p[*axis] - split_value;
                let (near, far) = if gap < 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };
                self.search_node(near, p, r2, out);
                if gap * gap <= r2 {
                    self.search_node(far, p, r2, out);
                }
            }
            _ => unreachable!("a node is either a leaf or has both split and children"),
        }
    }
}

fn widest_axis<const D: usize>(points: &[NVec<f64, D>], indices: &[usize]) -> usize {
    let mut mins = [f64::INFINITY; D];
    let mut maxs = [f64::NEG_INFINITY; D];
    for &i in indices {
        for d in 0..D {
            mins[d] = mins[d].min(points[i][d]);
            maxs[d] = maxs[d].max(points[i][d]);
        }
    }
    let mut axis = 0;
    let mut width = maxs[0] - mins[0];
    for d in 1..D {
        let w = maxs[d] - mins[d];
        if w > width {
            width = w;
            axis = d;
        }
    }
    axis
}

/// Rearranges `perm[lo..hi]` so the element that lands at `target` is the
/// order statistic it would hold if `perm[lo..hi]` were sorted by `axis`:
/// every index before `target` then has a key `<=` it and every index at
/// or after `target` has a key `>=` it. Standard quickselect (the same
/// postcondition as `std::slice::select_nth_unstable`), median-of-three
/// pivot to avoid quadratic blowup on sorted or reverse-sorted input.
fn select_nth<const D: usize>(
    points: &[NVec<f64, D>],
    perm: &mut [usize],
    mut lo: usize,
    mut hi: usize,
    target: usize,
    axis: usize,
) {
    while hi - lo > 1 {
        let pivot_index = median_of_three(points, perm, lo, hi, axis);
        perm.swap(pivot_index, hi - 1);
        let pivot_value = points[perm[hi - 1]][axis];

        let mut store = lo;
        for i in lo..hi - 1 {
            if points[perm[i]][axis] < pivot_value {
                perm.swap(i, store);
                store += 1;
            }
        }
        perm.swap(store, hi - 1);

        if target < store {
            hi = store;
        } else if target > store {
            lo = store + 1;
        } else {
            return;
        }
    }
}

fn median_of_three<const D: usize>(
    points: &[NVec<f64, D>],
    perm: &[usize],
    lo: usize,
    hi: usize,
    axis: usize,
) -> usize {
    let mid = lo + (hi - lo) / 2;
    let last = hi - 1;
    let key = |i: usize| points[perm[i]][axis];
    if key(lo) < key(mid) {
        if key(mid) < key(last) {
            mid
        } else if key(lo) < key(last) {
            last
        } else {
            lo
        }
    } else if key(lo) < key(last) {
        lo
    } else if key(mid) < key(last) {
        last
    } else {
        mid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cartesian_grid_query_scenario() {
        let mut points = std::vec::Vec::new();
        for x in 0..3 {
            for y in 0..3 {
                points.push(NVec::from_array([x as f64, y as f64]));
            }
        }
        let tree = KDTree::build(&points, 2);
        let hits = tree.search(NVec::from_array([1.0, 1.0]), 1.0);
        let mut found: std::vec::Vec<(i64, i64)> = hits
            .iter()
            .map(|&i| (points[i][0] as i64, points[i][1] as i64))
            .collect();
        found.sort();
        assert_eq!(found, vec![(0, 1), (1, 0), (1, 1), (1, 2), (2, 1)]);
    }

    #[test]
    fn empty_point_set_returns_empty() {
        let points: std::vec::Vec<NVec<f64, 2>> = vec![];
        let tree = KDTree::build(&points, 4);
        assert!(tree.search(NVec::from_array([0.0, 0.0]), 1.0).is_empty());
    }

    #[test]
    fn leaves_respect_max_leaf() {
        let points: std::vec::Vec<NVec<f64, 1>> =
            (0..100).map(|x| NVec::from_array([x as f64])).collect();
        let tree = KDTree::build(&points, 8);
        fn check_leaf_sizes<const D: usize>(node: &Node<D>, max_leaf: usize) {
            match &node.children {
                None => assert!(node.range.1 - node.range.0 <= max_leaf),
                Some((l, r)) => {
                    check_leaf_sizes(l, max_leaf);
                    check_leaf_sizes(r, max_leaf);
                }
            }
        }
        check_leaf_sizes(tree.root.as_ref().unwrap(), 8);
    }

    #[test]
    fn skewed_equal_distance_block_still_finds_the_exact_match() {
        // A value-threshold split (pivot = (min+max)/2 = 5.5, partitioned
        // then truncated to the array midpoint) used to place 8.0 in a
        // "right" child bounded below by split_value = 9.0, which search
        // pruning then skipped entirely. `select_nth` makes the split an
        // exact order statistic, so this can no longer happen.
        let points: std::vec::Vec<NVec<f64, 1>> = [10.0, 1.0, 9.0, 2.0, 8.0]
            .iter()
            .map(|&x| NVec::from_array([x]))
            .collect();
        let tree = KDTree::build(&points, 1);
        let hits = tree.search(NVec::from_array([8.0]), 0.5);
        assert!(hits.iter().any(|&i| points[i][0] == 8.0));
    }
}
