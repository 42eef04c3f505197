//! Symptom driven corrections: a `DeficiencyRule` names the nutrients to raise and the salts
//! to raise them with; `build_correction_plan` turns it into grams for a given tank volume.
use super::fertilizers::FertilizerTable;
use crate::Stoichiometry::concentration::{StoichiometricConverter, round_to};
use crate::errors::ChemError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeficiencyRule {
    #[serde(skip)]
    pub symptom: String,
    pub primary_nutrients: Vec<String>,
    #[serde(default)]
    pub secondary_nutrients: Vec<String>,
    pub description: String,
    pub recommendation: String,
    /// nutrient -> ppm to add
    pub target_delta_ppm: BTreeMap<String, f64>,
    /// tried in this order
    pub preferred_fertilizers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeficiencyRules {
    rules: BTreeMap<String, DeficiencyRule>,
}

impl DeficiencyRules {
    pub fn from_json_str(json: &str) -> Result<Self, ChemError> {
        let raw: BTreeMap<String, DeficiencyRule> = serde_json::from_str(json)
            .map_err(|e| ChemError::InvalidReferenceTable(format!("deficiency rules: {}", e)))?;
        let mut rules = BTreeMap::new();
        for (symptom, mut rule) in raw {
            if let Some((nutrient, delta)) = rule
                .target_delta_ppm
                .iter()
                .find(|(_, delta)| !delta.is_finite() || **delta < 0.0)
            {
                return Err(ChemError::InvalidReferenceTable(format!(
                    "rule '{}' raises {} by {} ppm",
                    symptom, nutrient, delta
                )));
            }
            rule.symptom = symptom.clone();
            rules.insert(symptom, rule);
        }
        Ok(Self { rules })
    }

    pub fn builtin() -> Result<Self, ChemError> {
        Self::from_json_str(include_str!("../../data/deficiency_rules.json"))
    }

    pub fn find(&self, symptom: &str) -> Result<&DeficiencyRule, ChemError> {
        self.rules
            .get(symptom)
            .ok_or_else(|| ChemError::UnknownSymptom(symptom.to_string()))
    }

    pub fn symptoms(&self) -> Vec<String> {
        self.rules.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub nutrient: String,
    pub delta_ppm: f64,
    pub fertilizer: Option<String>,
    pub grams: Option<f64>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionPlan {
    pub symptom: String,
    pub description: String,
    pub recommendation: String,
    pub volume_l: f64,
    pub corrections: Vec<Correction>,
}

pub fn build_correction_plan(
    rule: &DeficiencyRule,
    table: &FertilizerTable,
    volume_l: f64,
) -> Result<CorrectionPlan, ChemError> {
    if !(volume_l > 0.0) || !volume_l.is_finite() {
        return Err(ChemError::InvalidVolume(volume_l));
    }
    let converter = StoichiometricConverter::new();
    let mut corrections = Vec::with_capacity(rule.target_delta_ppm.len());
    for (nutrient, delta) in &rule.target_delta_ppm {
        let supplier = rule
            .preferred_fertilizers
            .iter()
            .filter_map(|name| table.get(name))
            .find(|fertilizer| fertilizer.percent(nutrient) > 0.0);
        let correction = match supplier {
            Some(fertilizer) => {
                let grams = converter.grams_of_salt_for_delta_ppm(
                    *delta,
                    volume_l,
                    fertilizer.percent(nutrient) / 100.0,
                )?;
                Correction {
                    nutrient: nutrient.clone(),
                    delta_ppm: *delta,
                    fertilizer: Some(fertilizer.name.clone()),
                    grams: Some(round_to(grams, 2)),
                    warning: None,
                }
            }
            None => {
                let warning = format!("no preferred fertilizer supplies {}", nutrient);
                warn!("{} for symptom '{}'", warning, rule.symptom);
                Correction {
                    nutrient: nutrient.clone(),
                    delta_ppm: *delta,
                    fertilizer: None,
                    grams: None,
                    warning: Some(warning),
                }
            }
        };
        corrections.push(correction);
    }
    Ok(CorrectionPlan {
        symptom: rule.symptom.clone(),
        description: rule.description.clone(),
        recommendation: rule.recommendation.clone(),
        volume_l,
        corrections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_builtin_rules() {
        let rules = DeficiencyRules::builtin().unwrap();
        assert_eq!(rules.len(), 4);
        let rule = rules.find("chlorosis_old_leaves").unwrap();
        assert_eq!(rule.symptom, "chlorosis_old_leaves");
        assert_eq!(rule.primary_nutrients, vec!["N".to_string()]);
        assert_eq!(
            rules.find("wilting").err(),
            Some(ChemError::UnknownSymptom("wilting".to_string()))
        );
    }

    #[test]
    fn test_plan_uses_first_supplier() {
        let rules = DeficiencyRules::builtin().unwrap();
        let table = FertilizerTable::builtin().unwrap();
        let plan = build_correction_plan(rules.find("chlorosis_old_leaves").unwrap(), &table, 100.0)
            .unwrap();
        assert_eq!(plan.corrections.len(), 1);
        let n = &plan.corrections[0];
        assert_eq!(n.fertilizer.as_deref(), Some("CalciumNitrate"));
        // 30 ppm / 0.155 = 193.55 mg/L over 100 L
        assert_relative_eq!(n.grams.unwrap(), 19.35);
        assert!(n.warning.is_none());

        let plan = build_correction_plan(rules.find("purple_stems").unwrap(), &table, 50.0).unwrap();
        assert_eq!(plan.corrections[0].fertilizer.as_deref(), Some("MonopotassiumPhosphate"));
        assert_relative_eq!(plan.corrections[0].grams.unwrap(), 4.41);
    }

    #[test]
    fn test_plan_skips_salts_without_the_nutrient() {
        let rules = DeficiencyRules::from_json_str(
            r#"{"odd": {
                "primary_nutrients": ["K", "Fe"],
                "description": "d",
                "recommendation": "r",
                "target_delta_ppm": {"K": 19.0, "Fe": 2.0},
                "preferred_fertilizers": ["CalciumNitrate", "Unlisted", "PotassiumNitrate"]
            }}"#,
        )
        .unwrap();
        let table = FertilizerTable::builtin().unwrap();
        let plan = build_correction_plan(rules.find("odd").unwrap(), &table, 10.0).unwrap();
        // sorted by nutrient
        assert_eq!(plan.corrections[0].nutrient, "Fe");
        assert!(plan.corrections[0].fertilizer.is_none());
        assert!(plan.corrections[0].grams.is_none());
        assert!(plan.corrections[0].warning.is_some());
        assert_eq!(plan.corrections[1].fertilizer.as_deref(), Some("PotassiumNitrate"));
        assert_relative_eq!(plan.corrections[1].grams.unwrap(), 0.5);

        assert_eq!(
            build_correction_plan(rules.find("odd").unwrap(), &table, 0.0),
            Err(ChemError::InvalidVolume(0.0))
        );
    }
}
