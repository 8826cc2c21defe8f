use super::*;
use crate::util::*;

/// Heap buffer holding one value per cell of an `AABB`.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedDomain<const GRID_DIMENSION: usize> {
    aabb: AABB<GRID_DIMENSION>,
    buffer: Vec<f64>,
}

impl<const GRID_DIMENSION: usize> OwnedDomain<GRID_DIMENSION> {
    /// Zero initialized domain.
    pub fn new(aabb: AABB<GRID_DIMENSION>) -> Self {
        let buffer = vec![0.0; aabb.buffer_size()];
        OwnedDomain { aabb, buffer }
    }

    /// Domain with every cell set to `value`.
    pub fn uniform(aabb: AABB<GRID_DIMENSION>, value: f64) -> Self {
        let buffer = vec![value; aabb.buffer_size()];
        OwnedDomain { aabb, buffer }
    }

    /// Wrap existing values, `None` if the length does not match the box.
    pub fn from_values(
        aabb: AABB<GRID_DIMENSION>,
        buffer: Vec<f64>,
    ) -> Option<Self> {
        if buffer.len() != aabb.buffer_size() {
            return None;
        }
        Some(OwnedDomain { aabb, buffer })
    }

    pub fn into_values(self) -> Vec<f64> {
        self.buffer
    }

    #[track_caller]
    pub fn set_coord(&mut self, world_coord: &Coord<GRID_DIMENSION>, value: f64) {
        debug_assert!(
            self.aabb.contains(world_coord),
            "{:?} does not contain {:?}",
            self.aabb,
            world_coord
        );
        let index = self.aabb.coord_to_linear(world_coord);
        self.buffer[index] = value;
    }
}

impl<const GRID_DIMENSION: usize> DomainView<GRID_DIMENSION>
    for OwnedDomain<GRID_DIMENSION>
{
    fn aabb(&self) -> &AABB<GRID_DIMENSION> {
        &self.aabb
    }

    fn buffer(&self) -> &[f64] {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut [f64] {
        &mut self.buffer
    }

    fn aabb_buffer_mut(&mut self) -> (&AABB<GRID_DIMENSION>, &mut [f64]) {
        (&self.aabb, &mut self.buffer)
    }

    #[track_caller]
    fn view(&self, world_coord: &Coord<GRID_DIMENSION>) -> f64 {
        debug_assert!(
            self.aabb.contains(world_coord),
            "{:?} does not contain {:?}",
            self.aabb,
            world_coord
        );
        let index = self.aabb.coord_to_linear(world_coord);
        self.buffer[index]
    }
}
