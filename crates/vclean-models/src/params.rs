//! Processing parameters submitted with an upload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Audio masking intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioLevel {
    /// No audio masking
    Off,
    /// Light masking (default)
    #[default]
    Weak,
    /// Moderate masking
    Medium,
    /// Aggressive masking
    Strong,
}

impl AudioLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioLevel::Off => "off",
            AudioLevel::Weak => "weak",
            AudioLevel::Medium => "medium",
            AudioLevel::Strong => "strong",
        }
    }
}

impl fmt::Display for AudioLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AudioLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(AudioLevel::Off),
            "weak" => Ok(AudioLevel::Weak),
            "medium" => Ok(AudioLevel::Medium),
            "strong" => Ok(AudioLevel::Strong),
            other => Err(format!(
                "unknown audio level '{other}' (expected off, weak, medium or strong)"
            )),
        }
    }
}

/// Parameters for a video-cleaning job.
///
/// The ranges mirror what the processing service accepts; they are
/// validated client-side before any byte goes over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingParams {
    /// Noise strength (0.04-0.20)
    pub epsilon: f64,
    /// Strength multiplier (1.0-2.0)
    pub video_strength: f64,
    /// Audio masking level
    pub audio_level: AudioLevel,
    /// Apply noise to every N-th frame (1-30)
    pub every_n_frames: u32,
    /// Submitting user id
    pub user_id: String,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            epsilon: 0.12,
            video_strength: 1.0,
            audio_level: AudioLevel::Weak,
            every_n_frames: 10,
            user_id: "web_user".to_string(),
        }
    }
}

impl ProcessingParams {
    /// Check all parameter ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.04..=0.20).contains(&self.epsilon) {
            return Err(ValidationError::EpsilonOutOfRange(self.epsilon));
        }
        if !(1.0..=2.0).contains(&self.video_strength) {
            return Err(ValidationError::StrengthOutOfRange(self.video_strength));
        }
        if !(1..=30).contains(&self.every_n_frames) {
            return Err(ValidationError::FrameStrideOutOfRange(self.every_n_frames));
        }
        Ok(())
    }

    /// Set the user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }
}

impl fmt::Display for ProcessingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "epsilon={} strength={} audio={} every_n_frames={}",
            self.epsilon, self.video_strength, self.audio_level, self.every_n_frames
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = ProcessingParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.epsilon, 0.12);
        assert_eq!(params.audio_level, AudioLevel::Weak);
    }

    #[test]
    fn epsilon_below_floor_is_rejected() {
        let params = ProcessingParams {
            epsilon: 0.03,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ValidationError::EpsilonOutOfRange(_))
        ));
    }

    #[test]
    fn frame_stride_bounds() {
        let mut params = ProcessingParams {
            every_n_frames: 30,
            ..Default::default()
        };
        assert!(params.validate().is_ok());

        params.every_n_frames = 31;
        assert!(matches!(
            params.validate(),
            Err(ValidationError::FrameStrideOutOfRange(31))
        ));
    }

    #[test]
    fn audio_level_round_trip() {
        for level in [
            AudioLevel::Off,
            AudioLevel::Weak,
            AudioLevel::Medium,
            AudioLevel::Strong,
        ] {
            assert_eq!(level.as_str().parse::<AudioLevel>(), Ok(level));
        }
        assert!("loud".parse::<AudioLevel>().is_err());
    }

    #[test]
    fn audio_level_serializes_lowercase() {
        let json = serde_json::to_string(&AudioLevel::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }
}
