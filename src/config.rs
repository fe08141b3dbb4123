//! Application configuration.
//!
//! Serializable settings for the annotation session: auto-save, detection
//! thresholds, and the work-mode preset table. Loaded from and saved to a
//! JSON file; missing fields fall back to defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::format::FormatError;

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Detection thresholds shared by the detection-assisted work-modes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionThresholds {
    /// Confidence floor applied during decode
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// NMS overlap threshold
    #[serde(default = "default_nms")]
    pub nms: f32,
    /// Final acceptance floor applied after decode/suppression
    #[serde(default = "default_acceptance")]
    pub acceptance: f32,
}

fn default_confidence() -> f32 {
    0.6
}

fn default_nms() -> f32 {
    0.3
}

fn default_acceptance() -> f32 {
    0.5
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            confidence: default_confidence(),
            nms: default_nms(),
            acceptance: default_acceptance(),
        }
    }
}

/// One work-mode: a point-count discipline plus detection behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkModePreset {
    /// Preset name shown to drivers
    pub name: String,
    /// Required points per label
    pub point_count: usize,
    /// Classes the detection model predicts; `None` for shape-only models
    #[serde(default)]
    pub class_count: Option<usize>,
    /// Whether detection is available in this work-mode
    #[serde(default)]
    pub detection: bool,
    /// Whether detection applies NMS in this work-mode
    #[serde(default)]
    pub apply_nms: bool,
}

/// Default work-mode table: general labeling with a user-settable vertex
/// count, a 16-class quad preset (the model suppresses its own duplicates),
/// and a 6-class quad preset whose duplicates are pruned with NMS.
fn default_work_modes() -> Vec<WorkModePreset> {
    vec![
        WorkModePreset {
            name: "general".to_string(),
            point_count: 4,
            class_count: None,
            detection: false,
            apply_nms: false,
        },
        WorkModePreset {
            name: "quad-16".to_string(),
            point_count: 4,
            class_count: Some(16),
            detection: true,
            apply_nms: false,
        },
        WorkModePreset {
            name: "quad-6".to_string(),
            point_count: 4,
            class_count: Some(6),
            detection: true,
            apply_nms: true,
        },
    ]
}

fn default_auto_save() -> bool {
    false
}

/// Application configuration that can be exported and imported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Save the current image's labels automatically on image switch
    #[serde(default = "default_auto_save")]
    pub auto_save: bool,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Detection thresholds
    #[serde(default)]
    pub thresholds: DetectionThresholds,

    /// Work-mode preset table
    #[serde(default = "default_work_modes")]
    pub work_modes: Vec<WorkModePreset>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            auto_save: default_auto_save(),
            log_level: LogLevel::default(),
            thresholds: DetectionThresholds::default(),
            work_modes: default_work_modes(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, FormatError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        log::info!("Loaded config v{} from {:?}", config.version, path);
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), FormatError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
