use crate::domain::*;
use crate::initial_conditions::*;
use crate::util::*;

/// The middle cell of the domain.
pub fn centre_coord<const GRID_DIMENSION: usize>(
    aabb: &AABB<GRID_DIMENSION>,
) -> Coord<GRID_DIMENSION> {
    Coord::from_fn(|d, _| {
        aabb.bounds[(d, 0)] + (aabb.bounds[(d, 1)] - aabb.bounds[(d, 0)]) / 2
    })
}

pub fn impulse_ic<
    const GRID_DIMENSION: usize,
    DomainType: DomainView<GRID_DIMENSION>,
>(
    domain: &mut DomainType,
    chunk_size: usize,
) {
    let centre = centre_coord(domain.aabb());
    domain.par_set_values(
        move |coord| if coord == centre { 1.0 } else { 0.0 },
        chunk_size,
    );
}

pub fn generate_ic<
    const GRID_DIMENSION: usize,
    DomainType: DomainView<GRID_DIMENSION>,
>(
    domain: &mut DomainType,
    ic_type: ICType,
    chunk_size: usize,
) {
    profiling::scope!("generate_ic");
    match ic_type {
        ICType::Zero => domain.par_set_values(|_| 0.0, chunk_size),
        ICType::Impulse => impulse_ic(domain, chunk_size),
        ICType::Gaussian { variance } => {
            gaussian_ic(domain, variance, chunk_size)
        }
        ICType::Rand { amplitude, seed } => {
            rand_ic(domain, amplitude, seed, chunk_size)
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn impulse_is_single_cell() {
        for chunk_size in [1, 4, 100] {
            let aabb = AABB::new(matrix![0, 4; 0, 6]);
            let mut domain = OwnedDomain::uniform(aabb, 3.0);
            generate_ic(&mut domain, ICType::Impulse, chunk_size);
            assert_eq!(domain.buffer().iter().sum::<f64>(), 1.0);
            assert_eq!(domain.view(&vector![2, 3]), 1.0);
        }
    }

    #[test]
    fn zero_clears() {
        let aabb = AABB::new(matrix![0, 9]);
        let mut domain = OwnedDomain::uniform(aabb, 3.0);
        generate_ic(&mut domain, ICType::Zero, 3);
        assert_eq!(domain.max_abs(), 0.0);
    }

    #[test]
    fn clap_mapping() {
        assert_eq!(
            ClapICType::Gaussian.to_ic_type(8.0, 0),
            ICType::Gaussian { variance: 8.0 }
        );
        assert_eq!(ClapICType::default().to_ic_type(1.0, 0), ICType::Impulse);
    }
}
