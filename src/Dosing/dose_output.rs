//! Presentation of dose results: the flat payload handed to an API or UI layer and terminal
//! tables.
use super::deficiency::CorrectionPlan;
use super::dose_solver::DoseReport;
use crate::errors::{ErrorKind, Outcome};
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadDose {
    pub name: String,
    pub grams: f64,
    pub formula: String,
}

/// Flat form of an `Outcome<DoseReport>`. On failure every numeric field is zero and the
/// collections are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DosePayload {
    pub success: bool,
    pub message: String,
    pub error_kind: Option<ErrorKind>,
    pub doses: Vec<PayloadDose>,
    pub achieved: BTreeMap<String, f64>,
    pub clamped: Vec<String>,
    pub ec_estimate: f64,
}

impl From<Outcome<DoseReport>> for DosePayload {
    fn from(outcome: Outcome<DoseReport>) -> Self {
        match outcome {
            Outcome::Success(report) => Self {
                success: true,
                message: report.message,
                error_kind: None,
                doses: report
                    .doses
                    .into_iter()
                    .map(|d| PayloadDose {
                        name: d.name,
                        grams: d.grams,
                        formula: d.formula,
                    })
                    .collect(),
                achieved: report.achieved,
                clamped: report.clamped,
                ec_estimate: report.ec_estimate,
            },
            Outcome::Failure { kind, message } => Self {
                success: false,
                message,
                error_kind: Some(kind),
                doses: Vec::new(),
                achieved: BTreeMap::new(),
                clamped: Vec::new(),
                ec_estimate: 0.0,
            },
        }
    }
}

impl DoseReport {
    pub fn pretty_print(&self) {
        println!("profile: {}, volume: {} L", self.profile, self.volume_l);
        let mut doses = Table::new();
        doses.add_row(row!["fertilizer", "formula", "g/L", "grams"]);
        for dose in &self.doses {
            doses.add_row(row![
                dose.name,
                dose.formula,
                format!("{:.4}", dose.grams_per_liter),
                dose.grams
            ]);
        }
        doses.printstd();

        let mut achieved = Table::new();
        achieved.add_row(row!["nutrient", "achieved ppm", "deviation ppm"]);
        for (nutrient, ppm) in &self.achieved {
            let deviation = self.deviation.get(nutrient).copied().unwrap_or(0.0);
            achieved.add_row(row![nutrient, ppm, deviation]);
        }
        achieved.printstd();
        println!("EC estimate: {}", self.ec_estimate);
        println!("{}", self.message);
    }
}

impl CorrectionPlan {
    pub fn pretty_print(&self) {
        println!("symptom: {}", self.symptom);
        println!("{}", self.description);
        let mut table = Table::new();
        table.add_row(row!["nutrient", "+ppm", "fertilizer", "grams", "warning"]);
        for c in &self.corrections {
            table.add_row(row![
                c.nutrient,
                c.delta_ppm,
                c.fertilizer.as_deref().unwrap_or("-"),
                c.grams.map_or("-".to_string(), |g| g.to_string()),
                c.warning.as_deref().unwrap_or("")
            ]);
        }
        table.printstd();
        println!("recommendation: {}", self.recommendation);
    }
}
