/// SI base-unit exponents: mass, length, time, temperature,
/// amount of substance, current, luminous intensity.
///
/// Attached to fields and equation terms so that `d2dt2(h) == laplacian(c², h)`
/// can be checked for consistency before a system is solved.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DimensionSet {
    pub exponents: [f64; 7],
}

pub const DIMLESS: DimensionSet = DimensionSet::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
pub const DIM_LENGTH: DimensionSet = DimensionSet::new(0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0);
pub const DIM_TIME: DimensionSet = DimensionSet::new(0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0);
pub const DIM_VOLUME: DimensionSet = DimensionSet::new(0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0);
pub const DIM_VELOCITY: DimensionSet = DimensionSet::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0);

impl DimensionSet {
    pub const fn new(
        mass: f64,
        length: f64,
        time: f64,
        temperature: f64,
        moles: f64,
        current: f64,
        luminous_intensity: f64,
    ) -> Self {
        DimensionSet {
            exponents: [
                mass,
                length,
                time,
                temperature,
                moles,
                current,
                luminous_intensity,
            ],
        }
    }

    pub fn mul(&self, other: &DimensionSet) -> DimensionSet {
        let mut exponents = self.exponents;
        for (e, o) in exponents.iter_mut().zip(other.exponents) {
            *e += o;
        }
        DimensionSet { exponents }
    }

    pub fn div(&self, other: &DimensionSet) -> DimensionSet {
        self.mul(&other.pow(-1.0))
    }

    pub fn pow(&self, p: f64) -> DimensionSet {
        DimensionSet {
            exponents: self.exponents.map(|e| e * p),
        }
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == DIMLESS
    }
}

impl std::fmt::Display for DimensionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.exponents.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{e}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn wave_equation_is_consistent() {
        // d2dt2(h) * V versus laplacian(c^2, h) * V for a dimensionless h.
        let h = DIMLESS;
        let c_sq = DIM_VELOCITY.pow(2.0);
        let temporal = h.div(&DIM_TIME.pow(2.0)).mul(&DIM_VOLUME);
        let spatial = c_sq.mul(&h).div(&DIM_LENGTH.pow(2.0)).mul(&DIM_VOLUME);
        assert_eq!(temporal, spatial);
        assert_ne!(temporal, h.mul(&DIM_VOLUME));
    }

    #[test]
    fn display() {
        assert_eq!(format!("{DIM_VELOCITY}"), "[0 1 -1 0 0 0 0]");
        assert!(DIM_LENGTH.div(&DIM_LENGTH).is_dimensionless());
    }
}
