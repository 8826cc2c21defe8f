use crate::domain::*;
use crate::initial_conditions::centre_coord;
use crate::util::*;

/// Normal like bump centred in the domain, all values are in [0, 1].
/// `sigma = n / variance` with `n` the cell count along dimension 0.
pub fn gaussian_ic<
    const GRID_DIMENSION: usize,
    DomainType: DomainView<GRID_DIMENSION>,
>(
    domain: &mut DomainType,
    variance: f64,
    chunk_size: usize,
) {
    let n_f = domain.aabb().exclusive_bounds()[0] as f64;
    let sigma_sq: f64 = (n_f / variance) * (n_f / variance);
    let centre = centre_coord(domain.aabb());
    let ic_gen = move |coord: Coord<GRID_DIMENSION>| {
        let r_sq: f64 = (coord - centre)
            .iter()
            .map(|x| (*x as f64) * (*x as f64))
            .sum();
        (-r_sq / (2.0 * sigma_sq)).exp()
    };
    domain.par_set_values(ic_gen, chunk_size);
}
