// th-core/src/units.rs

use uom::si::f64::ThermodynamicTemperature;

/// CMB temperature as carried by the background parameters.
pub type Temperature = ThermodynamicTemperature;

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn kelvin(t: Temperature) -> f64 {
    use uom::si::thermodynamic_temperature::kelvin;
    t.get::<kelvin>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kelvin_round_trip() {
        assert!((kelvin(k(2.7255)) - 2.7255).abs() < 1e-12);
    }
}
