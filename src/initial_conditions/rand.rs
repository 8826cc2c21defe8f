use crate::domain::*;
use rand::prelude::*;
use rayon::prelude::*;

/// Uniform noise, each chunk draws from its own generator seeded from
/// `seed` and the chunk offset, so the values do not depend on threading.
pub fn rand_ic<
    const GRID_DIMENSION: usize,
    DomainType: DomainView<GRID_DIMENSION>,
>(
    domain: &mut DomainType,
    amplitude: f64,
    seed: u64,
    chunk_size: usize,
) {
    domain.par_modify_access(chunk_size).for_each(
        |mut d: DomainChunk<'_, GRID_DIMENSION>| {
            let mut rng = StdRng::seed_from_u64(seed ^ d.offset() as u64);
            d.coord_iter_mut().for_each(|(_, value_mut)| {
                *value_mut = amplitude * rng.gen_range(-1.0..=1.0);
            })
        },
    );
}
