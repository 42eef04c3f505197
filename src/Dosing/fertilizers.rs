//! # Fertilizers
//!
//! A `Fertilizer` is a commercial salt described by its mass percentage of each nutrient and a
//! display formula. The JSON form mirrors the reference file shipped in `data/fertilizers.json`:
//! ```json
//! { "PotassiumNitrate": { "formula": "KNO3", "N": 13.0, "K": 38.0 } }
//! ```
//! `FertilizerTable` holds every known salt by name. `FertilizerSet` is the ordered, square
//! selection (as many fertilizers as nutrients) the dose solver works on; it can only be built
//! through validation so a solver never sees a rectangular system.
use crate::errors::ChemError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const DEFAULT_FORMULA_LABEL: &str = "Salt";

fn default_formula_label() -> String {
    DEFAULT_FORMULA_LABEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fertilizer {
    /// filled from the key of the table
    #[serde(skip)]
    pub name: String,
    #[serde(default = "default_formula_label")]
    pub formula: String,
    /// nutrient symbol -> mass percentage 0..=100
    #[serde(flatten)]
    pub nutrients: BTreeMap<String, f64>,
}

impl Fertilizer {
    pub fn new(name: &str, formula: &str, nutrients: &[(&str, f64)]) -> Self {
        Self {
            name: name.to_string(),
            formula: formula.to_string(),
            nutrients: nutrients
                .iter()
                .map(|(symbol, pct)| (symbol.to_string(), *pct))
                .collect(),
        }
    }

    /// mass percentage of `nutrient`, 0 when the salt does not carry it
    pub fn percent(&self, nutrient: &str) -> f64 {
        self.nutrients.get(nutrient).copied().unwrap_or(0.0)
    }

    /// ppm of `nutrient` delivered by 1 g of the salt per liter
    pub fn ppm_per_gram_per_liter(&self, nutrient: &str) -> f64 {
        self.percent(nutrient) * 10.0
    }

    fn validate(&self) -> Result<(), ChemError> {
        for (nutrient, pct) in &self.nutrients {
            if !pct.is_finite() || *pct < 0.0 || *pct > 100.0 {
                return Err(ChemError::InvalidReferenceTable(format!(
                    "fertilizer '{}' has {} % of {}, expected a value in 0..=100",
                    self.name, pct, nutrient
                )));
            }
        }
        let total: f64 = self.nutrients.values().sum();
        if total > 100.0 {
            return Err(ChemError::InvalidReferenceTable(format!(
                "nutrient percentages of fertilizer '{}' add up to {} %",
                self.name, total
            )));
        }
        if self.nutrients.is_empty() {
            warn!("fertilizer '{}' carries no nutrients", self.name);
        }
        Ok(())
    }
}

/// every known fertilizer by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FertilizerTable {
    fertilizers: BTreeMap<String, Fertilizer>,
}

impl FertilizerTable {
    pub fn from_fertilizers(fertilizers: Vec<Fertilizer>) -> Result<Self, ChemError> {
        let mut table = BTreeMap::new();
        for fertilizer in fertilizers {
            fertilizer.validate()?;
            if table.contains_key(&fertilizer.name) {
                return Err(ChemError::InvalidReferenceTable(format!(
                    "fertilizer '{}' is defined twice",
                    fertilizer.name
                )));
            }
            table.insert(fertilizer.name.clone(), fertilizer);
        }
        Ok(Self { fertilizers: table })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ChemError> {
        let raw: BTreeMap<String, Fertilizer> = serde_json::from_str(json)
            .map_err(|e| ChemError::InvalidReferenceTable(format!("fertilizer table: {}", e)))?;
        let fertilizers = raw
            .into_iter()
            .map(|(name, mut fertilizer)| {
                fertilizer.name = name;
                fertilizer
            })
            .collect();
        Self::from_fertilizers(fertilizers)
    }

    /// table compiled into the binary from `data/fertilizers.json`
    pub fn builtin() -> Result<Self, ChemError> {
        Self::from_json_str(include_str!("../../data/fertilizers.json"))
    }

    pub fn get(&self, name: &str) -> Option<&Fertilizer> {
        self.fertilizers.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.fertilizers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.fertilizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fertilizers.is_empty()
    }

    /// Picks `selected` out of the table in the given order and pairs them with `nutrients`.
    pub fn select(&self, nutrients: &[String], selected: &[String]) -> Result<FertilizerSet, ChemError> {
        let fertilizers = selected
            .iter()
            .map(|name| {
                self.get(name).cloned().ok_or_else(|| {
                    ChemError::InvalidReferenceTable(format!(
                        "selected fertilizer '{}' is not in the fertilizer table",
                        name
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        FertilizerSet::new(nutrients.to_vec(), fertilizers)
    }
}

/// Ordered nutrients and an equally long ordered list of fertilizers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FertilizerSet {
    nutrients: Vec<String>,
    fertilizers: Vec<Fertilizer>,
}

impl FertilizerSet {
    pub fn new(nutrients: Vec<String>, fertilizers: Vec<Fertilizer>) -> Result<Self, ChemError> {
        if nutrients.is_empty() {
            return Err(ChemError::InvalidReferenceTable(
                "the nutrient list is empty".to_string(),
            ));
        }
        if nutrients.len() != fertilizers.len() {
            return Err(ChemError::InvalidReferenceTable(format!(
                "{} nutrients need exactly {} fertilizers, got {}",
                nutrients.len(),
                nutrients.len(),
                fertilizers.len()
            )));
        }
        let mut seen = BTreeSet::new();
        for nutrient in &nutrients {
            if !seen.insert(nutrient.as_str()) {
                return Err(ChemError::InvalidReferenceTable(format!(
                    "nutrient '{}' is listed twice",
                    nutrient
                )));
            }
        }
        let mut seen = BTreeSet::new();
        for fertilizer in &fertilizers {
            fertilizer.validate()?;
            if !seen.insert(fertilizer.name.as_str()) {
                return Err(ChemError::InvalidReferenceTable(format!(
                    "fertilizer '{}' is selected twice",
                    fertilizer.name
                )));
            }
        }
        for nutrient in &nutrients {
            if fertilizers.iter().all(|f| f.percent(nutrient) == 0.0) {
                warn!("no selected fertilizer supplies {}", nutrient);
            }
        }
        Ok(Self {
            nutrients,
            fertilizers,
        })
    }

    pub fn nutrients(&self) -> &[String] {
        &self.nutrients
    }

    pub fn fertilizers(&self) -> &[Fertilizer] {
        &self.fertilizers
    }

    pub fn dimension(&self) -> usize {
        self.nutrients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builtin_table() {
        let table = FertilizerTable::builtin().unwrap();
        let cn = table.get("CalciumNitrate").unwrap();
        assert_eq!(cn.name, "CalciumNitrate");
        assert_eq!(cn.formula, "Ca(NO3)2·4H2O");
        assert_eq!(cn.percent("N"), 15.5);
        assert_eq!(cn.percent("K"), 0.0);
        assert_eq!(cn.ppm_per_gram_per_liter("Ca"), 190.0);
        assert!(table.len() >= 5);
    }

    #[test]
    fn test_missing_formula_gets_label() {
        let table = FertilizerTable::from_json_str(r#"{"Mystery": {"N": 10.0}}"#).unwrap();
        assert_eq!(table.get("Mystery").unwrap().formula, "Salt");
    }

    #[test]
    fn test_invalid_percentages_are_rejected() {
        for json in [
            r#"{"Bad": {"N": 120.0}}"#,
            r#"{"Bad": {"N": -1.0}}"#,
            r#"{"Bad": {"N": 60.0, "K": 60.0}}"#,
            r#"{"Bad": {"N": "lots"}}"#,
        ] {
            assert!(matches!(
                FertilizerTable::from_json_str(json),
                Err(ChemError::InvalidReferenceTable(_))
            ));
        }
    }

    #[test]
    fn test_square_selection() {
        let table = FertilizerTable::builtin().unwrap();
        let set = table
            .select(
                &names(&["N", "P", "K", "Ca", "Mg"]),
                &names(&[
                    "CalciumNitrate",
                    "PotassiumNitrate",
                    "MonopotassiumPhosphate",
                    "MagnesiumSulfate",
                    "AmmoniumNitrate",
                ]),
            )
            .unwrap();
        assert_eq!(set.dimension(), 5);
        assert_eq!(set.fertilizers()[2].name, "MonopotassiumPhosphate");

        let rectangular = table.select(&names(&["N", "P"]), &names(&["CalciumNitrate"]));
        assert!(matches!(rectangular, Err(ChemError::InvalidReferenceTable(_))));
        let unknown = table.select(&names(&["N"]), &names(&["Unobtainium"]));
        assert!(matches!(unknown, Err(ChemError::InvalidReferenceTable(_))));
        let twice = table.select(
            &names(&["N", "K"]),
            &names(&["PotassiumNitrate", "PotassiumNitrate"]),
        );
        assert!(matches!(twice, Err(ChemError::InvalidReferenceTable(_))));
        assert!(FertilizerSet::new(vec![], vec![]).is_err());
    }
}
