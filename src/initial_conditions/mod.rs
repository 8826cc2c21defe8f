mod gaussian;
mod generate_ic;
mod rand;

pub use gaussian::*;
pub use generate_ic::*;
pub use self::rand::*;

use clap::ValueEnum;

/// Starting shape of the solved field, the run always starts at rest.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum ICType {
    Zero,
    /// The middle cell set to 1, all others 0.
    #[default]
    Impulse,
    /// Smooth bump of height 1 in the middle, width is `n / variance`
    /// cells along dimension 0.
    Gaussian { variance: f64 },
    /// Uniform noise in `[-amplitude, amplitude]`, reproducible for a seed.
    Rand { amplitude: f64, seed: u64 },
}

#[derive(Copy, Clone, Debug, ValueEnum, Default)]
pub enum ClapICType {
    Zero,
    #[default]
    Impulse,
    Gaussian,
    Rand,
}

impl ClapICType {
    /// `dial` is the Gaussian variance or the noise amplitude.
    pub fn to_ic_type(&self, dial: f64, seed: u64) -> ICType {
        match self {
            ClapICType::Zero => ICType::Zero,
            ClapICType::Impulse => ICType::Impulse,
            ClapICType::Gaussian => ICType::Gaussian { variance: dial },
            ClapICType::Rand => ICType::Rand {
                amplitude: dial,
                seed,
            },
        }
    }
}
