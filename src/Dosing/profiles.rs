//! Target nutrient profiles and where they come from.
//!
//! A profile store is an outside collaborator: anything that can answer "which targets belong to
//! this name" implements `ProfileSource`. The crate ships `ProfileBook`, a read-only book of crop
//! profiles loaded from JSON, and `LayeredProfiles`, which asks an external source first and the
//! built-in book second.
use crate::errors::ChemError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// nutrient symbol -> target ppm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub name: String,
    pub targets: BTreeMap<String, f64>,
}

impl NutrientProfile {
    pub fn new(name: &str, targets: &[(&str, f64)]) -> Self {
        Self {
            name: name.to_string(),
            targets: targets
                .iter()
                .map(|(symbol, ppm)| (symbol.to_string(), *ppm))
                .collect(),
        }
    }

    /// target ppm of `nutrient`; nutrients the profile does not name target 0
    pub fn ppm(&self, nutrient: &str) -> f64 {
        self.targets.get(nutrient).copied().unwrap_or(0.0)
    }

    pub fn validate(&self) -> Result<(), ChemError> {
        for (nutrient, ppm) in &self.targets {
            if !ppm.is_finite() || *ppm < 0.0 {
                return Err(ChemError::Computation(format!(
                    "profile '{}' targets {} ppm of {}, expected a non-negative number",
                    self.name, ppm, nutrient
                )));
            }
        }
        Ok(())
    }
}

pub trait ProfileSource {
    /// None when the source does not know `name`
    fn lookup(&self, name: &str) -> Option<NutrientProfile>;

    fn profile_names(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileBook {
    profiles: BTreeMap<String, NutrientProfile>,
}

impl ProfileBook {
    pub fn new(profiles: Vec<NutrientProfile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.name.clone(), p)).collect(),
        }
    }

    /// `{"Lettuce (vegetative)": {"N": 140, "P": 40, ...}, ...}`
    pub fn from_json_str(json: &str) -> Result<Self, ChemError> {
        let raw: BTreeMap<String, BTreeMap<String, f64>> = serde_json::from_str(json)
            .map_err(|e| ChemError::InvalidReferenceTable(format!("profile book: {}", e)))?;
        let profiles = raw
            .into_iter()
            .map(|(name, targets)| {
                let profile = NutrientProfile { name, targets };
                profile
                    .validate()
                    .map_err(|e| ChemError::InvalidReferenceTable(e.to_string()))?;
                Ok(profile)
            })
            .collect::<Result<Vec<_>, ChemError>>()?;
        Ok(Self::new(profiles))
    }

    pub fn builtin() -> Result<Self, ChemError> {
        Self::from_json_str(include_str!("../../data/profiles.json"))
    }

    pub fn get(&self, name: &str) -> Option<&NutrientProfile> {
        self.profiles.get(name)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ProfileSource for ProfileBook {
    fn lookup(&self, name: &str) -> Option<NutrientProfile> {
        self.get(name).cloned()
    }

    fn profile_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }
}

pub struct LayeredProfiles<'a> {
    external: Option<&'a dyn ProfileSource>,
    builtin: &'a ProfileBook,
}

impl<'a> LayeredProfiles<'a> {
    pub fn new(external: Option<&'a dyn ProfileSource>, builtin: &'a ProfileBook) -> Self {
        Self { external, builtin }
    }

    pub fn resolve(&self, name: &str) -> Result<NutrientProfile, ChemError> {
        self.lookup(name)
            .ok_or_else(|| ChemError::UnknownProfile(name.to_string()))
    }
}

impl ProfileSource for LayeredProfiles<'_> {
    fn lookup(&self, name: &str) -> Option<NutrientProfile> {
        self.external
            .and_then(|source| source.lookup(name))
            .or_else(|| self.builtin.lookup(name))
    }

    fn profile_names(&self) -> Vec<String> {
        let mut names = self.builtin.profile_names();
        if let Some(source) = self.external {
            names.extend(source.profile_names());
        }
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct GreenhouseStore;

    impl ProfileSource for GreenhouseStore {
        fn lookup(&self, name: &str) -> Option<NutrientProfile> {
            match name {
                "Basil" => Some(NutrientProfile::new("Basil", &[("N", 160.0), ("K", 210.0)])),
                "Lettuce (vegetative)" => {
                    Some(NutrientProfile::new("Lettuce (vegetative)", &[("N", 120.0)]))
                }
                _ => None,
            }
        }

        fn profile_names(&self) -> Vec<String> {
            vec!["Basil".to_string(), "Lettuce (vegetative)".to_string()]
        }
    }

    #[test]
    fn test_builtin_book() {
        let book = ProfileBook::builtin().unwrap();
        assert_eq!(book.len(), 3);
        let lettuce = book.get("Lettuce (vegetative)").unwrap();
        assert_eq!(lettuce.ppm("N"), 140.0);
        assert_eq!(lettuce.ppm("Mg"), 50.0);
        assert_eq!(lettuce.ppm("Fe"), 0.0);
    }

    #[test]
    fn test_invalid_targets() {
        assert!(ProfileBook::from_json_str(r#"{"x": {"N": -5}}"#).is_err());
        assert!(ProfileBook::from_json_str(r#"{"x": ["N"]}"#).is_err());
        let nan = NutrientProfile::new("nan", &[("N", f64::NAN)]);
        assert!(matches!(nan.validate(), Err(ChemError::Computation(_))));
    }

    #[test]
    fn test_layered_lookup() {
        let book = ProfileBook::builtin().unwrap();
        let store = GreenhouseStore;
        let layered = LayeredProfiles::new(Some(&store), &book);
        assert_eq!(layered.resolve("Basil").unwrap().ppm("K"), 210.0);
        // the external store shadows the book
        assert_eq!(layered.resolve("Lettuce (vegetative)").unwrap().ppm("N"), 120.0);
        assert_eq!(layered.resolve("Tomato (flowering)").unwrap().ppm("N"), 180.0);
        assert_eq!(
            layered.resolve("Cactus"),
            Err(ChemError::UnknownProfile("Cactus".to_string()))
        );
        assert_eq!(layered.profile_names().len(), 4);

        let builtin_only = LayeredProfiles::new(None, &book);
        assert!(builtin_only.resolve("Basil").is_err());
    }
}
