//! Named, bounded model parameters
//!
//! Every component of the likelihood (richness, isochrone, kernel) exposes
//! its free parameters by name through the `Model` trait; the likelihood
//! dispatches `set` calls to whichever model owns a name and tracks which
//! component needs resynchronization.

use posho_common::{PoshoError, Result};

/// A bounded scalar parameter
#[derive(Debug, Clone, Copy)]
pub struct Parameter {
    value: f64,
    lo: f64,
    hi: f64,
}

impl Parameter {
    pub fn new(value: f64, lo: f64, hi: f64) -> Self {
        Parameter { value, lo, hi }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    /// Set the value, rejecting anything outside the bounds
    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        if !(value >= self.lo && value <= self.hi) {
            return Err(PoshoError::ParameterBounds {
                name: name.to_string(),
                value,
                lo: self.lo,
                hi: self.hi,
            });
        }
        self.value = value;
        Ok(())
    }
}

/// A component with named, settable parameters
pub trait Model {
    fn name(&self) -> &'static str;

    fn param_names(&self) -> &'static [&'static str];

    fn get_param(&self, name: &str) -> Option<f64>;

    /// Returns Ok(true) when this model owns `name` and the value was set,
    /// Ok(false) when the name belongs to another model.
    fn set_param(&mut self, name: &str, value: f64) -> Result<bool>;
}

/// Total number of satellite member stars.
///
/// Richness is not tied to the spatial or color models, so changing it never
/// forces a resynchronization of either.
#[derive(Debug, Clone)]
pub struct Richness {
    richness: Parameter,
}

impl Richness {
    pub fn new() -> Self {
        Richness {
            richness: Parameter::new(1.0, 0.0, f64::INFINITY),
        }
    }

    pub fn value(&self) -> f64 {
        self.richness.value()
    }
}

impl Default for Richness {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for Richness {
    fn name(&self) -> &'static str {
        "richness"
    }

    fn param_names(&self) -> &'static [&'static str] {
        &["richness"]
    }

    fn get_param(&self, name: &str) -> Option<f64> {
        (name == "richness").then(|| self.richness.value())
    }

    fn set_param(&mut self, name: &str, value: f64) -> Result<bool> {
        if name != "richness" {
            return Ok(false);
        }
        self.richness.set(name, value)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_bounds() {
        let mut p = Parameter::new(1.0, 0.0, 10.0);
        assert!(p.set("p", 5.0).is_ok());
        assert_eq!(p.value(), 5.0);
        assert!(p.set("p", -1.0).is_err());
        assert!(p.set("p", 11.0).is_err());
        // Failed set leaves the value untouched
        assert_eq!(p.value(), 5.0);
        // Bounds are inclusive
        assert!(p.set("p", 0.0).is_ok());
        assert!(p.set("p", 10.0).is_ok());
    }

    #[test]
    fn test_parameter_rejects_nan() {
        let mut p = Parameter::new(1.0, 0.0, 10.0);
        assert!(p.set("p", f64::NAN).is_err());
    }

    #[test]
    fn test_richness_model() {
        let mut model = Richness::new();
        assert_eq!(model.value(), 1.0);
        assert_eq!(model.get_param("richness"), Some(1.0));
        assert_eq!(model.get_param("extension"), None);

        assert_eq!(model.set_param("richness", 250.0).unwrap(), true);
        assert_eq!(model.value(), 250.0);
        assert_eq!(model.set_param("lon", 10.0).unwrap(), false);
        assert!(model.set_param("richness", -1.0).is_err());
    }
}
