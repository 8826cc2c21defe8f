use crate::util::indexing::*;
use crate::util::*;

/// Axis Aligned Bounding Box (AABB) over integer cell coordinates.
/// Each instance is inclusive of both corners.
/// This class is responsible for the indexing operations,
/// where we map between a linear buffer and coordinates.
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq)]
pub struct AABB<const DIMENSION: usize> {
    pub bounds: Bounds<DIMENSION>,
}

impl<const GRID_DIMENSION: usize> std::fmt::Display for AABB<GRID_DIMENSION> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> Result<(), std::fmt::Error> {
        write!(f, "[")?;
        for d in 0..GRID_DIMENSION {
            if d > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}, {}", self.bounds[(d, 0)], self.bounds[(d, 1)])?;
        }
        write!(f, "]")
    }
}

impl<const DIMENSION: usize> AABB<DIMENSION> {
    /// Create AABB from raw bounds.
    #[inline]
    pub fn new(bounds: Bounds<DIMENSION>) -> Self {
        AABB { bounds }
    }

    /// Create AABB from corners.
    pub fn from_mm(min: Coord<DIMENSION>, max: Coord<DIMENSION>) -> Self {
        let result = AABB {
            bounds: Bounds::from_columns(&[min, max]),
        };
        debug_assert!(result.check_validity());
        result
    }

    /// AABB starting at the origin with `cells[d]` cells along each
    /// dimension. Returns `None` if any count is zero.
    pub fn from_cell_counts(cells: &[usize; DIMENSION]) -> Option<Self> {
        if cells.iter().any(|n| *n == 0 || *n > i32::MAX as usize) {
            return None;
        }
        let max = Coord::from_fn(|d, _| cells[d] as i32 - 1);
        Some(Self::from_mm(Coord::zero(), max))
    }

    /// Moving min to the origin, returns the exclusive size in each direction
    /// i.e. [0, 9]  would have exclusive size of 10.
    pub fn exclusive_bounds(&self) -> Coord<DIMENSION> {
        (self.bounds.column(1) - self.bounds.column(0)).add_scalar(1)
    }

    /// Return the number of coordinates contained in the instance.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        real_buffer_size(&self.exclusive_bounds())
    }

    /// `buffer_size` for bounds from outside the program, `None` when an
    /// extent does not fit an `i32` or the count overflows.
    pub fn checked_buffer_size(&self) -> Option<usize> {
        (0..DIMENSION).try_fold(1usize, |accumulator, d| {
            let extent = self.bounds[(d, 1)] as i64 - self.bounds[(d, 0)] as i64 + 1;
            if extent <= 0 || extent > i32::MAX as i64 {
                return None;
            }
            accumulator.checked_mul(extent as usize)
        })
    }

    /// Return the linear index for a coord in the instance
    pub fn coord_to_linear(&self, coord: &Coord<DIMENSION>) -> usize {
        coord_to_linear(&(coord - self.min()), &self.exclusive_bounds())
    }

    /// Return the coordinate in the instance for a given linear index.
    pub fn linear_to_coord(&self, index: usize) -> Coord<DIMENSION> {
        linear_to_coord(index, &self.exclusive_bounds()) + self.min()
    }

    /// Check whether the instance contains a coordinate.
    pub fn contains(&self, coord: &Coord<DIMENSION>) -> bool {
        for d in 0..DIMENSION {
            if coord[d] < self.bounds[(d, 0)] || coord[d] > self.bounds[(d, 1)]
            {
                return false;
            }
        }
        true
    }

    /// The face neighbour of `coord` one step along dimension `d`,
    /// `side` 0 is the negative direction and 1 the positive one.
    /// `None` when the step leaves the box, i.e. the face is a boundary face.
    pub fn face_neighbour(
        &self,
        coord: &Coord<DIMENSION>,
        d: usize,
        side: usize,
    ) -> Option<Coord<DIMENSION>> {
        debug_assert!(side < 2);
        let mut n = *coord;
        n[d] += if side == 0 { -1 } else { 1 };
        if self.contains(&n) {
            Some(n)
        } else {
            None
        }
    }

    /// Return min corner.
    pub fn min(&self) -> Coord<DIMENSION> {
        self.bounds.column(0).into()
    }

    /// Return max corner
    pub fn max(&self) -> Coord<DIMENSION> {
        self.bounds.column(1).into()
    }

    /// Check that max >= min
    pub fn check_validity(&self) -> bool {
        for d in 0..DIMENSION {
            if self.bounds[(d, 0)] > self.bounds[(d, 1)] {
                return false;
            }
        }
        true
    }

    /// Return iterator over contained coords
    /// in linear ordering.
    #[allow(clippy::needless_lifetimes)]
    pub fn coord_iter<'a>(
        &'a self,
    ) -> impl Iterator<Item = Coord<DIMENSION>> + use<'a, DIMENSION> {
        (0..self.buffer_size()).map(|i| self.linear_to_coord(i))
    }

    /// Bounds of the cell corner points for the cells in this instance.
    /// Inverse of the cell bounds of a point grid.
    pub fn point_bounds(&self) -> Self {
        let mut point_bounds = *self;
        point_bounds
            .bounds
            .set_column(1, &point_bounds.bounds.column(1).add_scalar(1));
        point_bounds
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn buffer_size_test() {
        {
            let a = AABB::new(matrix![0, 5]);
            assert_eq!(a.buffer_size(), 6);
        }

        {
            let dimensions = AABB::new(matrix![0, 5; 0, 7; 0, 9]);
            assert_eq!(dimensions.buffer_size(), 6 * 8 * 10);
        }

        {
            let dimensions = AABB::new(matrix![1, 6; 1, 8; 1, 10]);
            assert_eq!(dimensions.buffer_size(), 6 * 8 * 10);
        }
    }

    #[test]
    fn checked_buffer_size_test() {
        let a = AABB::new(matrix![1, 6; 1, 8; 1, 10]);
        assert_eq!(a.checked_buffer_size(), Some(a.buffer_size()));
        assert_eq!(AABB::new(matrix![i32::MIN, i32::MAX]).checked_buffer_size(), None);
        assert_eq!(AABB::new(matrix![5, 4]).checked_buffer_size(), None);
        let huge = AABB::new(matrix![0, i32::MAX - 1; 0, i32::MAX - 1; 0, i32::MAX - 1]);
        assert_eq!(huge.checked_buffer_size(), None);
    }

    #[test]
    fn from_cell_counts_test() {
        let a = AABB::from_cell_counts(&[10, 4]).unwrap();
        assert_eq!(a, AABB::new(matrix![0, 9; 0, 3]));
        assert_eq!(a.buffer_size(), 40);
        assert!(AABB::from_cell_counts(&[10, 0]).is_none());
    }

    #[test]
    fn linear_to_coord_test() {
        {
            let bb = AABB::new(matrix![2, 8]);
            let c_1 = bb.linear_to_coord(5);
            assert_eq!(c_1, vector![7]);
        }

        {
            let bound = AABB::new(matrix![0, 9; 0, 9]);
            let c = vector![9, 8];
            let li = bound.coord_to_linear(&c);
            assert_eq!(c, bound.linear_to_coord(li));
        }
    }

    #[test]
    fn face_neighbour_test() {
        let bound = AABB::new(matrix![0, 4; 0, 2]);
        let c = vector![0, 1];
        assert_eq!(bound.face_neighbour(&c, 0, 0), None);
        assert_eq!(bound.face_neighbour(&c, 0, 1), Some(vector![1, 1]));
        assert_eq!(bound.face_neighbour(&c, 1, 0), Some(vector![0, 0]));
        assert_eq!(bound.face_neighbour(&c, 1, 1), Some(vector![0, 2]));
        assert_eq!(bound.face_neighbour(&vector![0, 2], 1, 1), None);
    }

    #[test]
    fn check_validity_test() {
        assert!(AABB::new(matrix![0, 9]).check_validity());
        assert!(!AABB::new(matrix![9, 0]).check_validity());
        assert!(AABB::new(matrix![0, 0]).check_validity());
    }

    #[test]
    fn point_bounds_test() {
        let cells = AABB::new(matrix![0, 3; 0, 1]);
        let points = cells.point_bounds();
        assert_eq!(points, AABB::new(matrix![0, 4; 0, 2]));
        assert_eq!(points.buffer_size(), 15);
    }

    #[test]
    fn display_test() {
        let a = AABB::new(matrix![0, 3; 1, 2]);
        assert_eq!(format!("{a}"), "[0, 3; 1, 2]");
    }
}
