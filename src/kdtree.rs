//! Nearest-neighbour index over geographic points.
//!
//! Points are stored on the unit sphere so that plain Euclidean splits work
//! across the antimeridian and near the poles. Inserts attach a leaf without
//! restructuring; call [`KdTree::rebalance`] after a batch of inserts to get
//! median splits back.

use crate::geo::Coordinate;

const DIMENSIONS: usize = 3;

#[derive(Debug, Clone)]
pub struct KdPoint<T> {
    pub coordinate: Coordinate,
    pub payload: T,
    position: [f64; DIMENSIONS],
    seq: u64,
}

#[derive(Debug, Clone, Copy)]
struct KdNode {
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// A k-d tree whose node `i` always describes `points[i]`.
#[derive(Debug, Clone)]
pub struct KdTree<T> {
    points: Vec<KdPoint<T>>,
    nodes: Vec<KdNode>,
    root: Option<usize>,
    next_seq: u64,
}

impl<T> Default for KdTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> KdTree<T> {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            nodes: Vec::new(),
            root: None,
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn insert(&mut self, coordinate: Coordinate, payload: T) {
        let position = coordinate.to_unit_vector();
        let idx = self.points.len();
        self.points.push(KdPoint {
            coordinate,
            payload,
            position,
            seq: self.next_seq,
        });
        self.next_seq += 1;

        let Some(mut current) = self.root else {
            self.nodes.push(KdNode {
                axis: 0,
                left: None,
                right: None,
            });
            self.root = Some(idx);
            return;
        };

        loop {
            let node = self.nodes[current];
            let go_left = position[node.axis] < self.points[current].position[node.axis];
            let next = if go_left { node.left } else { node.right };
            match next {
                Some(child) => current = child,
                None => {
                    self.nodes.push(KdNode {
                        axis: (node.axis + 1) % DIMENSIONS,
                        left: None,
                        right: None,
                    });
                    if go_left {
                        self.nodes[current].left = Some(idx);
                    } else {
                        self.nodes[current].right = Some(idx);
                    }
                    return;
                }
            }
        }
    }

    /// Rebuilds the tree with median splits over every stored point.
    pub fn rebalance(&mut self) {
        let mut order: Vec<usize> = (0..self.points.len()).collect();
        for node in &mut self.nodes {
            node.left = None;
            node.right = None;
        }
        self.root = self.build(&mut order, 0);
    }

    fn build(&mut self, slice: &mut [usize], depth: usize) -> Option<usize> {
        if slice.is_empty() {
            return None;
        }
        let axis = depth % DIMENSIONS;
        {
            let points = &self.points;
            slice.sort_by(|a, b| {
                points[*a].position[axis]
                    .total_cmp(&points[*b].position[axis])
                    .then(points[*a].seq.cmp(&points[*b].seq))
            });
        }
        let mut mid = slice.len() / 2;
        // Equal keys must sit on the right of the split to match insert().
        while mid > 0
            && self.points[slice[mid - 1]].position[axis] == self.points[slice[mid]].position[axis]
        {
            mid -= 1;
        }
        let median = slice[mid];
        let (left, rest) = slice.split_at_mut(mid);
        let right = &mut rest[1..];
        let left = self.build(left, depth + 1);
        let right = self.build(right, depth + 1);
        self.nodes[median] = KdNode { axis, left, right };
        Some(median)
    }

    /// Returns up to `k` points ordered by ascending distance to `target`,
    /// ties broken by insertion order.
    pub fn nearest_neighbors(&self, target: &Coordinate, k: usize) -> Vec<&KdPoint<T>> {
        if k == 0 {
            return Vec::new();
        }
        let position = target.to_unit_vector();
        let mut best: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
        if let Some(root) = self.root {
            self.search(root, &position, k, &mut best);
        }
        best.into_iter().map(|(_, idx)| &self.points[idx]).collect()
    }

    fn search(&self, idx: usize, target: &[f64; DIMENSIONS], k: usize, best: &mut Vec<(f64, usize)>) {
        let point = &self.points[idx];
        let dist = squared_distance(&point.position, target);
        let pos = best.partition_point(|(d, other)| {
            *d < dist || (*d == dist && self.points[*other].seq < point.seq)
        });
        if pos < k {
            best.insert(pos, (dist, idx));
            best.truncate(k);
        }

        let node = self.nodes[idx];
        let diff = target[node.axis] - point.position[node.axis];
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };
        if let Some(near) = near {
            self.search(near, target, k, best);
        }
        if let Some(far) = far {
            let worst = best.last().map(|(d, _)| *d).unwrap_or(f64::INFINITY);
            if best.len() < k || diff * diff <= worst {
                self.search(far, target, k, best);
            }
        }
    }

    /// Every stored point, in insertion order.
    pub fn all_points(&self) -> impl Iterator<Item = &KdPoint<T>> {
        self.points.iter()
    }

    /// Drops points for which `keep` returns false and rebuilds the tree.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&KdPoint<T>) -> bool,
    {
        self.points.retain(|p| keep(p));
        self.nodes.truncate(self.points.len());
        self.rebalance();
    }
}

fn squared_distance(a: &[f64; DIMENSIONS], b: &[f64; DIMENSIONS]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}
