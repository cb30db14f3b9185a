use crate::config::types::Thresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    Moderate,
    High,
    Critical,
}

/// Classify a reading for display. Each bound is exclusive for the level below it.
pub fn threshold_level(value: f32, thresholds: &Thresholds) -> Level {
    if value < thresholds.moderate {
        Level::Low
    }
    else if value < thresholds.high {
        Level::Moderate
    }
    else if value < thresholds.critical {
        Level::High
    }
    else {
        Level::Critical
    }
}
