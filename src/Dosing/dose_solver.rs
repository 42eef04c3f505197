//! # Dose solver
//!
//! For k nutrients and k fertilizers the ppm delivered by `x_j` grams per liter of each salt is
//! `A x`, with `A[i][j] = percent_j(nutrient_i) * 10`. The solver finds `x` with `A x = b` for
//! the target profile `b` by LU decomposition with partial pivoting.
//!
//! The system is rejected as singular when a pivot of `U` falls below
//! `k * f64::EPSILON * max|A|`, or when the 2-norm condition number `σ_max / σ_min` of `A`
//! exceeds `max_condition` (`DEFAULT_MAX_CONDITION = 1e6`).
//!
//! A square solve can return negative doses when the target is outside the cone spanned by the
//! fertilizers. Those doses are clamped to zero without solving again; the achieved profile is
//! then recomputed from the clamped doses and the deviation from the target is reported together
//! with the names of the clamped fertilizers.
use super::fertilizers::FertilizerSet;
use super::profiles::NutrientProfile;
use crate::Stoichiometry::concentration::round_to;
use crate::errors::ChemError;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_EC_FACTOR: f64 = 1.0;
pub const DEFAULT_MAX_CONDITION: f64 = 1e6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerDose {
    pub name: String,
    /// total grams for the whole tank
    pub grams: f64,
    pub grams_per_liter: f64,
    pub formula: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseReport {
    pub profile: String,
    pub volume_l: f64,
    pub doses: Vec<FertilizerDose>,
    /// ppm per nutrient recomputed from the clamped doses
    pub achieved: BTreeMap<String, f64>,
    /// achieved - target per nutrient
    pub deviation: BTreeMap<String, f64>,
    pub clamped: Vec<String>,
    pub ec_estimate: f64,
    pub message: String,
}

impl DoseReport {
    pub fn was_clamped(&self) -> bool {
        !self.clamped.is_empty()
    }

    pub fn grams_of(&self, fertilizer: &str) -> Option<f64> {
        self.doses
            .iter()
            .find(|d| d.name == fertilizer)
            .map(|d| d.grams)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoseSolver {
    ec_factor: f64,
    max_condition: f64,
}

impl Default for DoseSolver {
    fn default() -> Self {
        Self::new(DEFAULT_EC_FACTOR)
    }
}

impl DoseSolver {
    pub fn new(ec_factor: f64) -> Self {
        Self {
            ec_factor,
            max_condition: DEFAULT_MAX_CONDITION,
        }
    }

    /// largest condition number of the fertilizer matrix accepted as solvable
    pub fn with_max_condition(mut self, max_condition: f64) -> Self {
        self.max_condition = max_condition;
        self
    }

    pub fn ec_factor(&self) -> f64 {
        self.ec_factor
    }

    pub fn max_condition(&self) -> f64 {
        self.max_condition
    }

    /// ppm contributed per 1 g/L of each fertilizer, rows follow the nutrient order
    pub fn build_matrix(&self, set: &FertilizerSet) -> DMatrix<f64> {
        let k = set.dimension();
        DMatrix::from_fn(k, k, |i, j| {
            set.fertilizers()[j].ppm_per_gram_per_liter(&set.nutrients()[i])
        })
    }

    pub fn build_target(&self, set: &FertilizerSet, profile: &NutrientProfile) -> DVector<f64> {
        DVector::from_iterator(
            set.dimension(),
            set.nutrients().iter().map(|nutrient| profile.ppm(nutrient)),
        )
    }

    /// Unclamped grams per liter solving `A x = b` exactly.
    pub fn solve_exact(
        &self,
        set: &FertilizerSet,
        profile: &NutrientProfile,
    ) -> Result<DVector<f64>, ChemError> {
        profile.validate()?;
        let a = self.build_matrix(set);
        let b = self.build_target(set, profile);
        debug!("dose system A = {}, b = {}", a, b);

        let scale = a.amax();
        if !(scale > 0.0) || !scale.is_finite() {
            return Err(ChemError::SingularSystem(
                "the fertilizer matrix carries no nutrients".to_string(),
            ));
        }
        let sigma = a.singular_values();
        let condition = sigma.max() / sigma.min();
        let lu = a.lu();
        let tolerance = set.dimension() as f64 * f64::EPSILON * scale;
        let u = lu.u();
        if let Some((column, pivot)) = u
            .diagonal()
            .iter()
            .enumerate()
            .find(|(_, pivot)| pivot.abs() <= tolerance)
        {
            return Err(ChemError::SingularSystem(format!(
                "pivot {} of column {} ({}) is below {}",
                pivot,
                column,
                set.fertilizers()[column].name,
                tolerance
            )));
        }
        // sigma_min == 0 gives an infinite condition, NaN means the SVD did not converge
        if !(condition <= self.max_condition) {
            return Err(ChemError::SingularSystem(format!(
                "condition number {:e} of the fertilizer matrix exceeds {:e}",
                condition, self.max_condition
            )));
        }
        debug!("condition number of the dose system: {:e}", condition);
        let x = lu.solve(&b).ok_or_else(|| {
            ChemError::SingularSystem("LU decomposition could not be solved".to_string())
        })?;
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ChemError::Computation(format!(
                "dose solution is not finite: {}",
                x
            )));
        }
        Ok(x)
    }

    pub fn solve(
        &self,
        set: &FertilizerSet,
        profile: &NutrientProfile,
        volume_l: f64,
    ) -> Result<DoseReport, ChemError> {
        if !(volume_l > 0.0) || !volume_l.is_finite() {
            return Err(ChemError::InvalidVolume(volume_l));
        }
        let x = self.solve_exact(set, profile)?;

        let mut clamped = Vec::new();
        let clamped_x = DVector::from_iterator(
            x.len(),
            x.iter().zip(set.fertilizers()).map(|(dose, fertilizer)| {
                if *dose < 0.0 {
                    clamped.push(fertilizer.name.clone());
                    0.0
                } else {
                    *dose
                }
            }),
        );
        let achieved_vec = self.build_matrix(set) * &clamped_x;

        let mut achieved = BTreeMap::new();
        let mut deviation = BTreeMap::new();
        for (nutrient, ppm) in set.nutrients().iter().zip(achieved_vec.iter()) {
            achieved.insert(nutrient.clone(), round_to(*ppm, 2));
            deviation.insert(nutrient.clone(), round_to(ppm - profile.ppm(nutrient), 2));
        }
        if achieved_vec.iter().any(|v| !v.is_finite()) {
            return Err(ChemError::Computation(
                "achieved profile is not finite".to_string(),
            ));
        }

        let doses: Vec<FertilizerDose> = set
            .fertilizers()
            .iter()
            .zip(clamped_x.iter())
            .map(|(fertilizer, g_per_l)| FertilizerDose {
                name: fertilizer.name.clone(),
                grams: round_to(g_per_l * volume_l, 2),
                grams_per_liter: *g_per_l,
                formula: fertilizer.formula.clone(),
            })
            .collect();
        let ec_estimate = round_to(clamped_x.sum() * self.ec_factor, 2);

        let message = if clamped.is_empty() {
            "Optimal calculation completed".to_string()
        } else {
            warn!(
                "negative doses clamped to zero for {:?}, deviation {:?}",
                clamped, deviation
            );
            format!(
                "Calculation completed; negative doses clamped to zero for {}, the achieved profile deviates from the target",
                clamped.join(", ")
            )
        };
        info!(
            "dose for '{}' in {} L solved, EC estimate {}",
            profile.name, volume_l, ec_estimate
        );
        Ok(DoseReport {
            profile: profile.name.clone(),
            volume_l,
            doses,
            achieved,
            deviation,
            clamped,
            ec_estimate,
            message,
        })
    }
}
