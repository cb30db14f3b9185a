use serde::{Deserialize, Serialize};

/// Lower bounds (percent) at which a reading is shown as moderate, high or critical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub moderate: f32,
    pub high: f32,
    pub critical: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            moderate: 20.0,
            high: 50.0,
            critical: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub thresholds: Thresholds,
    /// chrono format string for the timestamps in the history list
    pub time_format: String,
}

impl Config {
    pub fn sort_thresholds(&mut self) {
        let mut bounds = [self.thresholds.moderate, self.thresholds.high, self.thresholds.critical];
        bounds.sort_by(|a, b| a.total_cmp(b));
        [self.thresholds.moderate, self.thresholds.high, self.thresholds.critical] = bounds;
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            thresholds: Thresholds::default(),
            time_format: "%H:%M:%S".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_fill_missing_fields_with_defaults() {
        let config: Config = serde_json::from_str(r#"{"timeFormat": "%H:%M"}"#).unwrap();
        assert_eq!(config.time_format, "%H:%M");
        assert_eq!(config.thresholds, Thresholds::default());
    }

    #[test]
    fn should_sort_thresholds_ascending() {
        let mut config = Config {
            thresholds: Thresholds { moderate: 90.0, high: 10.0, critical: 40.0 },
            ..Config::default()
        };
        config.sort_thresholds();
        assert_eq!(config.thresholds, Thresholds { moderate: 10.0, high: 40.0, critical: 90.0 });
    }
}
