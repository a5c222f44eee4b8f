//! Named merge quality profiles and their x264 encoder settings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of quality presets offered for merged exports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityProfile {
    #[default]
    High,
    Medium,
    Low,
}

/// x264 speed preset and constant-rate factor for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    pub preset: &'static str,
    pub crf: u8,
}

impl QualityProfile {
    /// Resolve a caller-supplied profile name.
    ///
    /// Unknown or missing names fall back to [`QualityProfile::High`].
    pub fn resolve(name: Option<&str>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            Some("medium") => QualityProfile::Medium,
            Some("low") => QualityProfile::Low,
            _ => QualityProfile::High,
        }
    }

    pub fn encoder_settings(self) -> EncoderSettings {
        match self {
            QualityProfile::High => EncoderSettings {
                preset: "medium",
                crf: 18,
            },
            QualityProfile::Medium => EncoderSettings {
                preset: "fast",
                crf: 23,
            },
            QualityProfile::Low => EncoderSettings {
                preset: "fast",
                crf: 28,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityProfile::High => "high",
            QualityProfile::Medium => "medium",
            QualityProfile::Low => "low",
        }
    }
}

impl fmt::Display for QualityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_maps_to_medium_preset_crf_18() {
        let s = QualityProfile::High.encoder_settings();
        assert_eq!((s.preset, s.crf), ("medium", 18));
    }

    #[test]
    fn medium_maps_to_fast_preset_crf_23() {
        let s = QualityProfile::resolve(Some("medium")).encoder_settings();
        assert_eq!((s.preset, s.crf), ("fast", 23));
    }

    #[test]
    fn low_maps_to_fast_preset_crf_28() {
        let s = QualityProfile::resolve(Some("low")).encoder_settings();
        assert_eq!((s.preset, s.crf), ("fast", 28));
    }

    #[test]
    fn unknown_profile_falls_back_to_high() {
        assert_eq!(QualityProfile::resolve(Some("ultra")), QualityProfile::High);
        assert_eq!(
            QualityProfile::resolve(Some("ultra")).encoder_settings(),
            QualityProfile::High.encoder_settings()
        );
    }

    #[test]
    fn missing_profile_falls_back_to_high() {
        assert_eq!(QualityProfile::resolve(None), QualityProfile::High);
    }

    #[test]
    fn resolve_ignores_case_and_whitespace() {
        assert_eq!(QualityProfile::resolve(Some(" LOW ")), QualityProfile::Low);
    }
}
