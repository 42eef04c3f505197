//! # Settings Module
//!
//! ## Purpose
//! Configuration of the engine: which reference files to load instead of the built-in tables,
//! which nutrients and fertilizers form the dose system, the EC heuristic factor and the log
//! level of the binary.
//!
//! ## Configuration Format
//! ```json
//! {
//!   "fertilizers": "my_salts.json",
//!   "profiles": null,
//!   "deficiency_rules": null,
//!   "atomic_weights": null,
//!   "nutrient_order": ["N", "P", "K", "Ca", "Mg"],
//!   "selected_fertilizers": ["CalciumNitrate", "PotassiumNitrate", "MonopotassiumPhosphate",
//!                            "MagnesiumSulfate", "AmmoniumNitrate"],
//!   "ec_factor": 1.0,
//!   "max_condition_number": 1e6,
//!   "log_level": "info"
//! }
//! ```
//! Every field is optional; a missing `nutrichem_config.json` means defaults everywhere.
use crate::Dosing::dose_solver::{DEFAULT_EC_FACTOR, DEFAULT_MAX_CONDITION};
use crate::errors::ChemError;
use log::{LevelFilter, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "nutrichem_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// file paths; `None` selects the table compiled into the crate
    pub fertilizers: Option<String>,
    pub profiles: Option<String>,
    pub deficiency_rules: Option<String>,
    pub atomic_weights: Option<String>,
    /// rows of the dose system
    pub nutrient_order: Vec<String>,
    /// columns of the dose system, as many as nutrients
    pub selected_fertilizers: Vec<String>,
    pub ec_factor: f64,
    /// dose systems with a worse condition number are rejected as singular
    pub max_condition_number: f64,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fertilizers: None,
            profiles: None,
            deficiency_rules: None,
            atomic_weights: None,
            nutrient_order: ["N", "P", "K", "Ca", "Mg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            selected_fertilizers: [
                "CalciumNitrate",
                "PotassiumNitrate",
                "MonopotassiumPhosphate",
                "MagnesiumSulfate",
                "AmmoniumNitrate",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            ec_factor: DEFAULT_EC_FACTOR,
            max_condition_number: DEFAULT_MAX_CONDITION,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Reads `config_file`; a missing file gives the defaults, a malformed one is an error.
    pub fn load(config_file: &str) -> Result<Self, ChemError> {
        if !Path::new(config_file).exists() {
            info!("no '{}' found, using default configuration", config_file);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(config_file).map_err(|e| {
            ChemError::InvalidReferenceTable(format!("cannot read '{}': {}", config_file, e))
        })?;
        let config: EngineConfig = serde_json::from_str(&content).map_err(|e| {
            ChemError::InvalidReferenceTable(format!("configuration '{}': {}", config_file, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// `nutrichem_config.json` in the working directory, defaults when it cannot be used
    pub fn from_default_file() -> Self {
        match Self::load(CONFIG_FILE) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; falling back to the default configuration", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, config_file: &str) -> Result<(), ChemError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ChemError::Computation(e.to_string()))?;
        fs::write(config_file, content).map_err(|e| {
            ChemError::InvalidReferenceTable(format!("cannot write '{}': {}", config_file, e))
        })
    }

    pub fn validate(&self) -> Result<(), ChemError> {
        if !self.ec_factor.is_finite() || self.ec_factor < 0.0 {
            return Err(ChemError::InvalidReferenceTable(format!(
                "ec_factor must be a non-negative number, got {}",
                self.ec_factor
            )));
        }
        if !self.max_condition_number.is_finite() || self.max_condition_number <= 1.0 {
            return Err(ChemError::InvalidReferenceTable(format!(
                "max_condition_number must be a finite number above 1, got {}",
                self.max_condition_number
            )));
        }
        if self.nutrient_order.len() != self.selected_fertilizers.len() {
            return Err(ChemError::InvalidReferenceTable(format!(
                "{} nutrients but {} selected fertilizers",
                self.nutrient_order.len(),
                self.selected_fertilizers.len()
            )));
        }
        Ok(())
    }

    pub fn log_level_filter(&self) -> LevelFilter {
        match self.log_level.to_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        }
    }

    /// Points several tables to new files at once. Nothing changes unless every file exists
    /// and every key is known.
    pub fn update_libraries(&mut self, updates: HashMap<&str, &str>) -> Result<(), ChemError> {
        for (key, path) in &updates {
            if !Path::new(path).exists() {
                return Err(ChemError::InvalidReferenceTable(format!(
                    "File does not exist: {}",
                    path
                )));
            }
            if !matches!(
                *key,
                "fertilizers" | "profiles" | "deficiency_rules" | "atomic_weights"
            ) {
                return Err(ChemError::InvalidReferenceTable(format!(
                    "Unknown library key: {}",
                    key
                )));
            }
        }
        for (key, path) in updates {
            let slot = match key {
                "fertilizers" => &mut self.fertilizers,
                "profiles" => &mut self.profiles,
                "deficiency_rules" => &mut self.deficiency_rules,
                _ => &mut self.atomic_weights,
            };
            *slot = Some(path.to_string());
        }
        Ok(())
    }

    /// back to the built-in tables
    pub fn reset_libraries(&mut self) {
        self.fertilizers = None;
        self.profiles = None;
        self.deficiency_rules = None;
        self.atomic_weights = None;
    }
}
