//! Elemental analysis of a water or nutrient solution described as dissolved compounds, compared
//! against agronomic ranges.
use crate::Stoichiometry::concentration::{Compound, round_to};
use crate::Stoichiometry::molmass::FormulaParser;
use crate::errors::ChemError;
use log::info;
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// a compound dissolved at `ppm`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterSample {
    pub formula: String,
    pub ppm: f64,
}

impl WaterSample {
    pub fn new(formula: &str, ppm: f64) -> Self {
        Self {
            formula: formula.to_string(),
            ppm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityStatus {
    Deficit,
    Optimal,
    Excess,
}

impl NutrientRange {
    pub fn classify(&self, ppm: f64) -> QualityStatus {
        if ppm < self.min {
            QualityStatus::Deficit
        } else if ppm > self.max {
            QualityStatus::Excess
        } else {
            QualityStatus::Optimal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityNote {
    pub nutrient: String,
    pub ppm: f64,
    pub status: QualityStatus,
    pub range: NutrientRange,
}

impl fmt::Display for QualityNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            QualityStatus::Deficit => write!(
                f,
                "{} deficit: {} ppm (minimum {})",
                self.nutrient, self.ppm, self.range.min
            ),
            QualityStatus::Excess => write!(
                f,
                "{} excess: {} ppm (maximum {})",
                self.nutrient, self.ppm, self.range.max
            ),
            QualityStatus::Optimal => write!(f, "{} optimal: {} ppm", self.nutrient, self.ppm),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterAnalysis {
    /// ppm per nutrient, in the analyzer's nutrient order
    pub nutrients: Vec<(String, f64)>,
    pub notes: Vec<QualityNote>,
}

impl WaterAnalysis {
    pub fn ppm(&self, nutrient: &str) -> Option<f64> {
        self.nutrients
            .iter()
            .find(|(n, _)| n == nutrient)
            .map(|(_, ppm)| *ppm)
    }

    pub fn status(&self, nutrient: &str) -> Option<QualityStatus> {
        self.notes
            .iter()
            .find(|note| note.nutrient == nutrient)
            .map(|note| note.status)
    }

    pub fn pretty_print(&self) {
        let mut table = Table::new();
        table.add_row(row!["nutrient", "ppm", "range", "status"]);
        for note in &self.notes {
            table.add_row(row![
                note.nutrient,
                note.ppm,
                format!("{}-{}", note.range.min, note.range.max),
                format!("{:?}", note.status)
            ]);
        }
        table.printstd();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaterAnalyzer {
    nutrients: Vec<String>,
    ranges: BTreeMap<String, NutrientRange>,
}

impl Default for WaterAnalyzer {
    fn default() -> Self {
        let ranges = [
            ("N", 100.0, 250.0),
            ("P", 30.0, 80.0),
            ("K", 150.0, 350.0),
            ("Ca", 100.0, 200.0),
            ("Mg", 30.0, 80.0),
        ];
        Self {
            nutrients: ranges.iter().map(|(n, _, _)| n.to_string()).collect(),
            ranges: ranges
                .iter()
                .map(|(n, min, max)| (n.to_string(), NutrientRange { min: *min, max: *max }))
                .collect(),
        }
    }
}

impl WaterAnalyzer {
    /// Analyzer over `nutrients` in that order; nutrients without a known range are totalled
    /// but get no note.
    pub fn with_nutrients(nutrients: &[String]) -> Self {
        let default = Self::default();
        Self {
            nutrients: nutrients.to_vec(),
            ranges: default.ranges,
        }
    }

    pub fn analyze(
        &self,
        parser: &FormulaParser,
        samples: &[WaterSample],
    ) -> Result<WaterAnalysis, ChemError> {
        let compounds = samples
            .iter()
            .map(|s| Compound::dissolved(parser, &s.formula, s.ppm))
            .collect::<Result<Vec<_>, _>>()?;

        let mut nutrients = Vec::with_capacity(self.nutrients.len());
        let mut notes = Vec::new();
        for nutrient in &self.nutrients {
            let total = compounds.iter().try_fold(0.0, |acc, c| {
                c.contribution_ppm(parser, nutrient).map(|ppm| acc + ppm)
            })?;
            let total = round_to(total, 2);
            nutrients.push((nutrient.clone(), total));
            if let Some(range) = self.ranges.get(nutrient) {
                notes.push(QualityNote {
                    nutrient: nutrient.clone(),
                    ppm: total,
                    status: range.classify(total),
                    range: *range,
                });
            }
        }
        info!("water analysis of {} compounds done", samples.len());
        Ok(WaterAnalysis { nutrients, notes })
    }
}
