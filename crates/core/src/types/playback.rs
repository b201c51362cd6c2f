//! Playback settings carried in a progress record

use crate::types::Validator;

/// Playback speed multiplier
///
/// The store accepts any positive finite value; UIs typically offer a fixed set.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct PlaybackRate(f64);

impl PlaybackRate {
    /// Normal speed
    pub const NORMAL: Self = Self(1.0);

    /// Creates a new playback rate (must be finite and > 0)
    pub fn new(rate: f64) -> Result<Self, String> {
        if rate.is_finite() && rate > 0.0 {
            Ok(Self(rate))
        } else {
            Err(format!("Playback rate must be positive, got {}", rate))
        }
    }

    /// Creates a playback rate without validation (for deserialization)
    pub fn new_unchecked(rate: f64) -> Self {
        Self(rate)
    }

    /// Returns the rate value
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl Validator for PlaybackRate {
    fn validate(&self) -> Result<(), Vec<String>> {
        Self::new(self.0).map(|_| ()).map_err(|e| vec![e])
    }
}

/// Output volume in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Volume(f64);

impl Volume {
    /// Full volume
    pub const MAX: Self = Self(1.0);

    /// Creates a new volume (0.0 - 1.0)
    pub fn new(volume: f64) -> Result<Self, String> {
        if (0.0..=1.0).contains(&volume) {
            Ok(Self(volume))
        } else {
            Err(format!("Volume must be between 0 and 1, got {}", volume))
        }
    }

    /// Creates a volume without validation (for deserialization)
    pub fn new_unchecked(volume: f64) -> Self {
        Self(volume)
    }

    /// Returns the volume value
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::MAX
    }
}

impl Validator for Volume {
    fn validate(&self) -> Result<(), Vec<String>> {
        Self::new(self.0).map(|_| ()).map_err(|e| vec![e])
    }
}

/// The (position, rate, volume) triple restored once at session start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResumePoint {
    pub position: f64,
    pub rate: PlaybackRate,
    pub volume: Volume,
}

impl ResumePoint {
    /// Creates a resume point
    pub fn new(position: f64, rate: PlaybackRate, volume: Volume) -> Self {
        Self {
            position,
            rate,
            volume,
        }
    }
}

impl Default for ResumePoint {
    /// Start of the item at normal speed and full volume
    fn default() -> Self {
        Self {
            position: 0.0,
            rate: PlaybackRate::NORMAL,
            volume: Volume::MAX,
        }
    }
}

impl Validator for ResumePoint {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(self.position.is_finite() && self.position >= 0.0) {
            errors.push(format!("Position must be >= 0, got {}", self.position));
        }

        if let Err(rate_errors) = self.rate.validate() {
            errors.extend(rate_errors);
        }

        if let Err(volume_errors) = self.volume.validate() {
            errors.extend(volume_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_rate_default() {
        assert_eq!(PlaybackRate::default().value(), 1.0);
    }

    #[test]
    fn test_playback_rate_accepts_any_positive_value() {
        assert!(PlaybackRate::new(0.75).is_ok());
        assert!(PlaybackRate::new(3.3).is_ok());
        assert!(PlaybackRate::new(0.01).is_ok());
    }

    #[test]
    fn test_playback_rate_rejects_zero_negative_and_nan() {
        assert!(PlaybackRate::new(0.0).is_err());
        assert!(PlaybackRate::new(-1.0).is_err());
        assert!(PlaybackRate::new(f64::NAN).is_err());
        assert!(!PlaybackRate::new_unchecked(0.0).is_valid());
    }

    #[test]
    fn test_volume_bounds() {
        assert!(Volume::new(0.0).is_ok());
        assert!(Volume::new(1.0).is_ok());
        assert!(Volume::new(1.01).is_err());
        assert!(Volume::new(-0.1).is_err());
    }

    #[test]
    fn test_resume_point_default() {
        let resume = ResumePoint::default();
        assert_eq!(resume.position, 0.0);
        assert_eq!(resume.rate.value(), 1.0);
        assert_eq!(resume.volume.value(), 1.0);
        assert!(resume.is_valid());
    }

    #[test]
    fn test_resume_point_validation_collects_all_errors() {
        let resume = ResumePoint::new(
            -5.0,
            PlaybackRate::new_unchecked(0.0),
            Volume::new_unchecked(2.0),
        );
        let errors = resume.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
