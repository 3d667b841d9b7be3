//! Sixteen-by-sixteen proximity grid shared by the impact and locality passes.

use flotilla_core::ObjectId;
use flotilla_world::Cell;

/// Buckets checked besides an object's own: right, lower left, below, lower right.
pub(crate) const ADJACENT: [(i32, i32); 4] = [(1, 0), (-1, 1), (0, 1), (1, 1)];

const SIDE: i32 = Cell::GRID_SIZE as i32;

/// Objects bucketed by cell, in insertion order.
#[derive(Debug)]
pub(crate) struct ProximityGrid {
    buckets: Vec<Vec<(ObjectId, Cell)>>,
}

impl Default for ProximityGrid {
    fn default() -> Self {
        let count = (Cell::GRID_SIZE * Cell::GRID_SIZE) as usize;
        Self {
            buckets: (0..count).map(|_| Vec::new()).collect(),
        }
    }
}

impl ProximityGrid {
    pub(crate) fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    pub(crate) fn insert(&mut self, id: ObjectId, cell: Cell) {
        if let Some(bucket) = self.buckets.get_mut(cell.bucket()) {
            bucket.push((id, cell));
        }
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn bucket(&self, index: usize) -> &[(ObjectId, Cell)] {
        self.buckets.get(index).map_or(&[], Vec::as_slice)
    }

    /// Every pair worth testing, each reported once.
    ///
    /// The flag is `true` when both objects share a bucket.
    pub(crate) fn pairs(&self, out: &mut Vec<(ObjectId, ObjectId, bool)>) {
        out.clear();
        for index in 0..self.bucket_count() {
            let bucket = self.bucket(index);
            for (position, &(a, cell)) in bucket.iter().enumerate() {
                for &(b, other) in &bucket[position + 1..] {
                    if same_super(cell, other) {
                        out.push((a, b, true));
                    }
                }
                for (dh, dv) in ADJACENT {
                    let Some((neighbour, super_h, super_v)) = adjacent(cell, dh, dv) else {
                        continue;
                    };
                    for &(b, other) in self.bucket(neighbour) {
                        if other.super_h == super_h && other.super_v == super_v {
                            out.push((a, b, false));
                        }
                    }
                }
            }
        }
    }
}

fn same_super(a: Cell, b: Cell) -> bool {
    a.super_h == b.super_h && a.super_v == b.super_v
}

/// Bucket index and super cell of a neighbouring unit, wrapping across super cells.
fn adjacent(cell: Cell, dh: i32, dv: i32) -> Option<(usize, u32, u32)> {
    let (h, super_h) = wrap(cell.h as i32 + dh, cell.super_h)?;
    let (v, super_v) = wrap(cell.v as i32 + dv, cell.super_v)?;
    let probe = Cell {
        h,
        v,
        super_h,
        super_v,
    };
    Some((probe.bucket(), super_h, super_v))
}

fn wrap(unit: i32, super_unit: u32) -> Option<(u32, u32)> {
    if unit < 0 {
        Some(((unit + SIDE) as u32, super_unit.checked_sub(1)?))
    } else if unit >= SIDE {
        Some(((unit - SIDE) as u32, super_unit + 1))
    } else {
        Some((unit as u32, super_unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::Handle;

    fn cell(h: u32, v: u32, super_h: u32, super_v: u32) -> Cell {
        Cell {
            h,
            v,
            super_h,
            super_v,
        }
    }

    #[test]
    fn neighbours_wrap_into_the_next_super_cell() {
        assert_eq!(adjacent(cell(15, 3, 2, 2), 1, 0), Some((3 * 16, 3, 2)));
        assert_eq!(adjacent(cell(0, 15, 2, 2), -1, 1), Some((15, 1, 3)));
        assert_eq!(adjacent(cell(0, 0, 0, 0), -1, 1), None);
    }

    #[test]
    fn pairs_cover_own_and_forward_buckets_only() {
        let a = Handle::new(0, 0);
        let b = Handle::new(1, 0);
        let c = Handle::new(2, 0);
        let d = Handle::new(3, 0);
        let mut grid = ProximityGrid::default();
        grid.insert(a, cell(4, 4, 1, 1));
        grid.insert(b, cell(4, 4, 1, 1));
        grid.insert(c, cell(5, 5, 1, 1));
        grid.insert(d, cell(4, 4, 2, 1));

        let mut pairs = Vec::new();
        grid.pairs(&mut pairs);

        assert!(pairs.contains(&(a, b, true)));
        assert!(pairs.contains(&(a, c, false)));
        assert!(pairs.contains(&(b, c, false)));
        assert!(!pairs.iter().any(|&(x, y, _)| x == d || y == d));
        assert_eq!(pairs.len(), 3);
    }
}
