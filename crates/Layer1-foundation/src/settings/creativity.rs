//! Creativity presets
//!
//! 창의성 레벨(temperature) 프리셋과 구간 라벨.

use serde::{Deserialize, Serialize};

/// Lowest accepted creativity level
pub const MIN_CREATIVITY: f64 = 0.1;
/// Highest accepted creativity level
pub const MAX_CREATIVITY: f64 = 2.0;
/// Global level used when nothing is configured
pub const DEFAULT_CREATIVITY: f64 = 0.7;

/// Named creativity preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreativityPreset {
    Predictable,
    Balanced,
    Creative,
    Experimental,
}

impl CreativityPreset {
    pub const ALL: [CreativityPreset; 4] = [
        CreativityPreset::Predictable,
        CreativityPreset::Balanced,
        CreativityPreset::Creative,
        CreativityPreset::Experimental,
    ];

    pub fn temperature(&self) -> f64 {
        match self {
            Self::Predictable => 0.2,
            Self::Balanced => 0.7,
            Self::Creative => 1.0,
            Self::Experimental => 1.5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Predictable => "Predictable",
            Self::Balanced => "Balanced",
            Self::Creative => "Creative",
            Self::Experimental => "Experimental",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Predictable => "Conservative, consistent responses",
            Self::Balanced => "Good mix of accuracy and variation",
            Self::Creative => "More varied and creative responses",
            Self::Experimental => "Highly creative, less predictable",
        }
    }
}

impl Default for CreativityPreset {
    fn default() -> Self {
        Self::Balanced
    }
}

/// Preset whose temperature is closest to `temperature` (first wins on ties)
pub fn preset_for_temperature(temperature: f64) -> CreativityPreset {
    let mut closest = CreativityPreset::ALL[0];
    for preset in CreativityPreset::ALL {
        if (preset.temperature() - temperature).abs() < (closest.temperature() - temperature).abs()
        {
            closest = preset;
        }
    }
    closest
}

/// Six-band label for a creativity level
pub fn temperature_label(temperature: f64) -> &'static str {
    if temperature <= 0.3 {
        "Very Predictable"
    } else if temperature <= 0.5 {
        "Predictable"
    } else if temperature <= 0.8 {
        "Balanced"
    } else if temperature <= 1.2 {
        "Creative"
    } else if temperature <= 1.5 {
        "Very Creative"
    } else {
        "Experimental"
    }
}

/// Recommended per-field-type levels
pub const FIELD_SPECIFIC_PRESETS: &[(&str, f64)] = &[
    ("name", 0.3),
    ("email", 0.1),
    ("phone", 0.1),
    ("address", 0.4),
    ("city", 0.2),
    ("company", 0.5),
    ("title", 0.6),
    ("description", 1.0),
    ("bio", 1.2),
    ("textarea", 1.0),
    ("text", 0.7),
];

pub fn clamp_creativity(level: f64) -> f64 {
    level.clamp(MIN_CREATIVITY, MAX_CREATIVITY)
}
