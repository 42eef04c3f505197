//! # Library Manager Module
//!
//! ## Purpose
//! Owns the reference tables every computation reads: atomic weights, the fertilizer table, the
//! square fertilizer set of the dose system, the profile book and the deficiency rules.
//!
//! ## Lifecycle
//! - Tables are built once from an `EngineConfig`; the square fertilizer set is validated here,
//!   so a request never meets a rectangular system.
//! - The process-wide copy lives behind `OnceLock<RwLock<Arc<_>>>`. Readers clone the `Arc` and
//!   keep a consistent snapshot for the whole call.
//! - A reload builds a complete new `ReferenceTables` and swaps the `Arc`; tables are never
//!   patched in place.
//!
//! ## Usage Patterns
//! ```rust
//! use NutriChem::library_manager::with_reference_tables;
//!
//! let n_fertilizers = with_reference_tables(|tables| tables.fertilizers.len()).unwrap();
//! assert!(n_fertilizers >= 5);
//! ```
use crate::Dosing::deficiency::DeficiencyRules;
use crate::Dosing::fertilizers::{FertilizerSet, FertilizerTable};
use crate::Dosing::profiles::ProfileBook;
use crate::Stoichiometry::molmass::AtomicWeights;
use crate::Utils::load_from_file::LoadData;
use crate::errors::ChemError;
use crate::settings::EngineConfig;
use log::info;
use std::sync::{Arc, OnceLock, RwLock};

#[derive(Debug, Clone)]
pub struct ReferenceTables {
    pub weights: AtomicWeights,
    pub fertilizers: FertilizerTable,
    pub fertilizer_set: FertilizerSet,
    pub profiles: ProfileBook,
    pub deficiency_rules: DeficiencyRules,
    pub nutrient_order: Vec<String>,
    pub ec_factor: f64,
    pub max_condition_number: f64,
}

impl ReferenceTables {
    /// tables compiled into the crate with the default dose system
    pub fn builtin() -> Result<Self, ChemError> {
        Self::from_config(&EngineConfig::default())
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ChemError> {
        config.validate()?;
        let load = |path: &Option<String>| path.as_ref().map(|p| LoadData::new(p.clone()));

        let weights = match load(&config.atomic_weights) {
            Some(data) => data.load_atomic_weights()?,
            None => AtomicWeights::standard().clone(),
        };
        let fertilizers = match load(&config.fertilizers) {
            Some(data) => data.load_fertilizers()?,
            None => FertilizerTable::builtin()?,
        };
        let profiles = match load(&config.profiles) {
            Some(data) => data.load_profiles()?,
            None => ProfileBook::builtin()?,
        };
        let deficiency_rules = match load(&config.deficiency_rules) {
            Some(data) => data.load_deficiency_rules()?,
            None => DeficiencyRules::builtin()?,
        };
        let fertilizer_set = fertilizers.select(&config.nutrient_order, &config.selected_fertilizers)?;
        info!(
            "reference tables ready: {} fertilizers, {} profiles, {} deficiency rules",
            fertilizers.len(),
            profiles.len(),
            deficiency_rules.len()
        );
        Ok(Self {
            weights,
            fertilizers,
            fertilizer_set,
            profiles,
            deficiency_rules,
            nutrient_order: config.nutrient_order.clone(),
            ec_factor: config.ec_factor,
            max_condition_number: config.max_condition_number,
        })
    }
}

static GLOBAL_REFERENCE_TABLES: OnceLock<RwLock<Arc<ReferenceTables>>> = OnceLock::new();

fn snapshot(lock: &RwLock<Arc<ReferenceTables>>) -> Arc<ReferenceTables> {
    match lock.read() {
        Ok(guard) => Arc::clone(&guard),
        Err(poisoned) => Arc::clone(&poisoned.into_inner()),
    }
}

/// Current process-wide tables, built from the built-in data on first use.
pub fn reference_tables() -> Result<Arc<ReferenceTables>, ChemError> {
    if let Some(lock) = GLOBAL_REFERENCE_TABLES.get() {
        return Ok(snapshot(lock));
    }
    let tables = Arc::new(ReferenceTables::builtin()?);
    Ok(snapshot(
        GLOBAL_REFERENCE_TABLES.get_or_init(|| RwLock::new(tables)),
    ))
}

/// Swaps in a complete new set of tables. Calls already holding a snapshot keep the old one.
pub fn replace_reference_tables(tables: ReferenceTables) {
    let tables = Arc::new(tables);
    let lock = GLOBAL_REFERENCE_TABLES.get_or_init(|| RwLock::new(Arc::clone(&tables)));
    let mut guard = match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = tables;
}

/// Builds the tables from `config` and installs them.
pub fn reload_from_config(config: &EngineConfig) -> Result<(), ChemError> {
    replace_reference_tables(ReferenceTables::from_config(config)?);
    Ok(())
}

pub fn with_reference_tables<F, R>(f: F) -> Result<R, ChemError>
where
    F: FnOnce(&ReferenceTables) -> R,
{
    let tables = reference_tables()?;
    Ok(f(&tables))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_tables() {
        let tables = ReferenceTables::builtin().unwrap();
        assert_eq!(tables.fertilizer_set.dimension(), 5);
        assert_eq!(tables.nutrient_order[0], "N");
        assert_eq!(tables.weights.get("O"), Some(15.999));
        assert_eq!(tables.profiles.len(), 3);
        assert_eq!(tables.ec_factor, 1.0);
        assert_eq!(tables.max_condition_number, 1e6);
    }

    #[test]
    fn test_tables_from_files() {
        let mut salts = NamedTempFile::new().unwrap();
        salts
            .write_all(
                br#"{"KNO3": {"formula": "KNO3", "N": 13.0, "K": 38.0},
                     "AN": {"formula": "NH4NO3", "N": 34.0}}"#,
            )
            .unwrap();
        let config = EngineConfig {
            fertilizers: Some(salts.path().to_str().unwrap().to_string()),
            nutrient_order: vec!["N".to_string(), "K".to_string()],
            selected_fertilizers: vec!["KNO3".to_string(), "AN".to_string()],
            ..EngineConfig::default()
        };
        let tables = ReferenceTables::from_config(&config).unwrap();
        assert_eq!(tables.fertilizers.len(), 2);
        assert_eq!(tables.fertilizer_set.fertilizers()[1].name, "AN");
    }

    #[test]
    fn test_selection_is_validated_at_load() {
        let config = EngineConfig {
            selected_fertilizers: vec![
                "CalciumNitrate".to_string(),
                "PotassiumNitrate".to_string(),
                "MonopotassiumPhosphate".to_string(),
                "MagnesiumSulfate".to_string(),
                "Unobtainium".to_string(),
            ],
            ..EngineConfig::default()
        };
        assert!(matches!(
            ReferenceTables::from_config(&config),
            Err(ChemError::InvalidReferenceTable(_))
        ));
    }

    #[test]
    fn test_global_replace_is_atomic() {
        let before = reference_tables().unwrap();
        let mut changed = ReferenceTables::builtin().unwrap();
        changed.ec_factor = 0.5;
        replace_reference_tables(changed);
        // the old snapshot is untouched
        assert_eq!(before.ec_factor, 1.0);
        assert_eq!(with_reference_tables(|t| t.ec_factor).unwrap(), 0.5);
        reload_from_config(&EngineConfig::default()).unwrap();
        assert_eq!(reference_tables().unwrap().ec_factor, 1.0);
    }
}
