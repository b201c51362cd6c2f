//! Checking config values

use crate::error::ValidationError;
use std::fmt::Display;

/// Largest playback rate any setting may hold
pub const MAX_RATE: f64 = 4.0;

/// A config table that can check its own values
pub trait ConfigSection: Default {
    /// Table name in the TOML file
    fn section_name(&self) -> &'static str;

    /// Records every problem with this section in `issues`
    fn check(&self, issues: &mut Issues);

    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut issues = Issues::default();
        self.check(&mut issues);
        issues.into_result()
    }
}

/// Collects validation failures so all of them are reported at once
#[derive(Debug, Default)]
pub struct Issues {
    errors: Vec<ValidationError>,
}

impl Issues {
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Inclusive range check
    pub fn range<T>(&mut self, field: &str, value: T, min: T, max: T)
    where
        T: PartialOrd + Display + Copy,
    {
        if value < min || value > max {
            self.push(ValidationError::with_value(
                field,
                format!("must be between {} and {}", min, max),
                value,
            ));
        }
    }

    /// Playback rates are exclusive at zero
    pub fn rate(&mut self, field: &str, value: f64) {
        if !(value > 0.0 && value <= MAX_RATE) {
            self.push(ValidationError::with_value(
                field,
                format!("must be greater than 0 and at most {}", MAX_RATE),
                value,
            ));
        }
    }

    pub fn not_empty(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(ValidationError::new(field, "must not be empty"));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
