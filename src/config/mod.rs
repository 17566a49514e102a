//! Configuration management for Cloth
//!
//! Loads and validates the TOML configuration: general switches, the
//! workspace set, the headless backend's virtual outputs, and per-output
//! settings (enable flag, position, scale, transform, mode, custom modes).
//! The engine only ever reads it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use wayland_server::protocol::wl_output::Transform;

use crate::backend::Mode;
use crate::error::{EngineError, EngineResult};

/// Upper bound on configured workspaces
pub const MAX_WORKSPACES: usize = 32;

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClothConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub workspaces: WorkspacesConfig,

    /// Virtual outputs used when running headless
    #[serde(default)]
    pub headless: HeadlessConfig,

    /// Per-output settings, matched by output name
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GeneralConfig {
    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspacesConfig {
    /// Number of workspaces
    pub count: usize,

    /// Names, by index; missing entries are numbered from 1
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeadlessConfig {
    pub width: i32,
    pub height: i32,
    /// Refresh rate in Hz
    pub refresh_rate: f64,
}

/// Settings for one output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    pub name: String,

    #[serde(default = "OutputConfig::default_enable")]
    pub enable: bool,

    /// Layout position
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,

    #[serde(default = "OutputConfig::default_scale")]
    pub scale: f64,

    #[serde(default)]
    pub transform: OutputTransform,

    /// Mode to negotiate; a zero width leaves the output's own mode alone
    #[serde(default)]
    pub mode: ModeConfig,

    /// Custom modes to install (DRM only)
    #[serde(default)]
    pub modes: Vec<ModeConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct ModeConfig {
    pub width: i32,
    pub height: i32,
    /// Refresh rate in Hz
    #[serde(default)]
    pub refresh_rate: f64,
}

impl ModeConfig {
    pub fn is_set(&self) -> bool {
        self.width != 0
    }

    pub fn to_mode(self) -> Mode {
        Mode::new(
            self.width,
            self.height,
            (self.refresh_rate * 1000.0).round() as i32,
        )
    }
}

/// Output transform as written in the config file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum OutputTransform {
    #[default]
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "90")]
    Rotate90,
    #[serde(rename = "180")]
    Rotate180,
    #[serde(rename = "270")]
    Rotate270,
    #[serde(rename = "flipped")]
    Flipped,
    #[serde(rename = "flipped-90")]
    Flipped90,
    #[serde(rename = "flipped-180")]
    Flipped180,
    #[serde(rename = "flipped-270")]
    Flipped270,
}

impl From<OutputTransform> for Transform {
    fn from(t: OutputTransform) -> Self {
        match t {
            OutputTransform::Normal => Transform::Normal,
            OutputTransform::Rotate90 => Transform::_90,
            OutputTransform::Rotate180 => Transform::_180,
            OutputTransform::Rotate270 => Transform::_270,
            OutputTransform::Flipped => Transform::Flipped,
            OutputTransform::Flipped90 => Transform::Flipped90,
            OutputTransform::Flipped180 => Transform::Flipped180,
            OutputTransform::Flipped270 => Transform::Flipped270,
        }
    }
}

impl Default for WorkspacesConfig {
    fn default() -> Self {
        Self {
            count: 10,
            names: Vec::new(),
        }
    }
}

impl WorkspacesConfig {
    /// Display name of workspace `index`
    pub fn name(&self, index: usize) -> String {
        self.names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("{}", index + 1))
    }
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            refresh_rate: 60.0,
        }
    }
}

impl OutputConfig {
    fn default_enable() -> bool {
        true
    }

    fn default_scale() -> f64 {
        1.0
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enable: true,
            x: 0,
            y: 0,
            scale: 1.0,
            transform: OutputTransform::Normal,
            mode: ModeConfig::default(),
            modes: Vec::new(),
        }
    }
}

impl ClothConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Path::new(&home).join(path.strip_prefix("~").unwrap_or(path))
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: ClothConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", expanded_path.display()))?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> EngineResult<()> {
        if self.workspaces.count == 0 || self.workspaces.count > MAX_WORKSPACES {
            return Err(EngineError::Config(format!(
                "workspace count {} must be between 1 and {}",
                self.workspaces.count, MAX_WORKSPACES
            )));
        }

        let headless = &self.headless;
        if headless.width <= 0 || headless.height <= 0 || headless.refresh_rate < 0.0 {
            return Err(EngineError::Config(format!(
                "headless output {}x{}@{}",
                headless.width, headless.height, headless.refresh_rate
            )));
        }

        for output in &self.outputs {
            if output.scale <= 0.0 {
                return Err(EngineError::Config(format!(
                    "scale for {} must be positive",
                    output.name
                )));
            }
            let configured = output.modes.iter().chain(
                Some(&output.mode).filter(|m| m.is_set()),
            );
            for mode in configured {
                if mode.width <= 0 || mode.height <= 0 {
                    return Err(EngineError::Config(format!(
                        "mode {}x{} for {}: dimensions must be non-zero",
                        mode.width, mode.height, output.name
                    )));
                }
                if mode.refresh_rate < 0.0 {
                    return Err(EngineError::Config(format!(
                        "refresh rate for {} must not be negative",
                        output.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Settings for the output called `name`, if any
    pub fn get_output(&self, name: &str) -> Option<&OutputConfig> {
        self.outputs.iter().find(|o| o.name == name)
    }
}


#[cfg(test)]
mod property_tests;
