use crate::util::*;
use clap::ValueEnum;

/// Condition on one side of the grid, applied to every boundary face there.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PatchCondition {
    /// Zero normal gradient, i.e. no flux through the face.
    ZeroGradient,
    /// Prescribed face value.
    FixedValue(f64),
}

impl std::fmt::Display for PatchCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchCondition::ZeroGradient => write!(f, "zeroGradient"),
            PatchCondition::FixedValue(v) => write!(f, "fixedValue {v}"),
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum, Default)]
pub enum ClapPatchType {
    #[default]
    ZeroGradient,
    FixedValue,
}

impl ClapPatchType {
    pub fn to_patch_condition(&self, value: f64) -> PatchCondition {
        match self {
            ClapPatchType::ZeroGradient => PatchCondition::ZeroGradient,
            ClapPatchType::FixedValue => PatchCondition::FixedValue(value),
        }
    }
}

/// One condition per side and dimension, `patches[d][0]` is the
/// low side along dimension `d`, `patches[d][1]` the high side.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundaryConditions<const GRID_DIMENSION: usize> {
    patches: [[PatchCondition; 2]; GRID_DIMENSION],
}

impl<const GRID_DIMENSION: usize> BoundaryConditions<GRID_DIMENSION> {
    pub fn uniform(condition: PatchCondition) -> Self {
        BoundaryConditions {
            patches: [[condition; 2]; GRID_DIMENSION],
        }
    }

    pub fn zero_gradient() -> Self {
        Self::uniform(PatchCondition::ZeroGradient)
    }

    pub fn with_patch(
        mut self,
        d: usize,
        side: usize,
        condition: PatchCondition,
    ) -> Self {
        self.patches[d][side] = condition;
        self
    }

    pub fn patch(&self, d: usize, side: usize) -> PatchCondition {
        self.patches[d][side]
    }

    /// Which boundary sides of a cell lie on the grid edge.
    pub fn boundary_sides(
        aabb: &AABB<GRID_DIMENSION>,
        coord: &Coord<GRID_DIMENSION>,
    ) -> impl Iterator<Item = (usize, usize)> {
        let min = aabb.min();
        let max = aabb.max();
        let c = *coord;
        (0..GRID_DIMENSION).flat_map(move |d| {
            let low = (c[d] == min[d]).then_some((d, 0));
            let high = (c[d] == max[d]).then_some((d, 1));
            low.into_iter().chain(high)
        })
    }
}

impl<const GRID_DIMENSION: usize> Default for BoundaryConditions<GRID_DIMENSION> {
    fn default() -> Self {
        Self::zero_gradient()
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn boundary_sides_test() {
        let aabb = AABB::new(matrix![0, 4; 0, 0]);
        let sides: Vec<_> =
            BoundaryConditions::boundary_sides(&aabb, &vector![0, 0])
                .collect();
        assert_eq!(sides, vec![(0, 0), (1, 0), (1, 1)]);

        let sides: Vec<_> =
            BoundaryConditions::boundary_sides(&aabb, &vector![2, 0])
                .collect();
        assert_eq!(sides, vec![(1, 0), (1, 1)]);
    }
}
