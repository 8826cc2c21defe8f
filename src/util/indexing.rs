use crate::util::*;

/// Number of cells covered by an exclusive bound.
pub fn real_buffer_size<const DIMENSION: usize>(
    exclusive_bound: &Coord<DIMENSION>,
) -> usize {
    exclusive_bound
        .iter()
        .fold(1, |accumulator, d| accumulator * *d as usize)
}

/// Row-major linearization, the highest dimension varies fastest.
pub fn coord_to_linear<const GRID_DIMENSION: usize>(
    coord: &Coord<GRID_DIMENSION>,
    exclusive_bounds: &Coord<GRID_DIMENSION>,
) -> usize {
    let mut accumulator = 0;
    for d in 0..GRID_DIMENSION {
        debug_assert!(coord[d] >= 0);
        debug_assert!(coord[d] < exclusive_bounds[d]);
        accumulator =
            accumulator * exclusive_bounds[d] as usize + coord[d] as usize;
    }
    accumulator
}

pub fn linear_to_coord<const GRID_DIMENSION: usize>(
    linear_index: usize,
    exclusive_bounds: &Coord<GRID_DIMENSION>,
) -> Coord<GRID_DIMENSION> {
    let mut result = Coord::zero();
    let mut index_accumulator = linear_index;
    for d in (0..GRID_DIMENSION).rev() {
        let size = exclusive_bounds[d] as usize;
        result[d] = (index_accumulator % size) as i32;
        index_accumulator /= size;
    }
    debug_assert_eq!(index_accumulator, 0);
    result
}
