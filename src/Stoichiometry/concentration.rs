//! # Concentration and unit algebra
//!
//! Conversions between ppm, g/L, molarity and grams of salt for aqueous solutions.
//! The solution density is taken as 1 kg/L, so 1 ppm is 1 mg of solute per liter.
//!
//! - `StoichiometricConverter`: stateless unit conversions and per-nutrient dose math
//! - `Compound`: parsed formula with molar mass and an optional dissolved concentration
//! - `MolarSolution`: mass of compound needed for a solution of given molarity and volume
use super::molmass::{Composition, FormulaParser};
use crate::errors::ChemError;
use serde::{Deserialize, Serialize};

const MG_PER_G: f64 = 1000.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct StoichiometricConverter;

impl StoichiometricConverter {
    pub fn new() -> Self {
        Self
    }

    /// 1 ppm ~= 1 mg/L in water
    pub fn ppm_to_mg_per_l(&self, ppm: f64) -> f64 {
        ppm
    }

    pub fn mg_per_l_to_ppm(&self, mg_per_l: f64) -> f64 {
        mg_per_l
    }

    pub fn ppm_to_g_per_l(&self, ppm: f64) -> f64 {
        ppm / MG_PER_G
    }

    pub fn g_per_l_to_ppm(&self, g_per_l: f64) -> f64 {
        g_per_l * MG_PER_G
    }

    /// ppm = mol/L * g/mol * 1000 mg/g
    pub fn molarity_to_ppm(&self, molarity: f64, molar_mass: f64) -> Result<f64, ChemError> {
        check_molar_mass(molar_mass)?;
        Ok(molarity * molar_mass * MG_PER_G)
    }

    /// mol/L = (mg/L) / (1000 mg/g * g/mol)
    pub fn ppm_to_molarity(&self, ppm: f64, molar_mass: f64) -> Result<f64, ChemError> {
        check_molar_mass(molar_mass)?;
        Ok(ppm / (MG_PER_G * molar_mass))
    }

    pub fn grams_to_moles(&self, grams: f64, molar_mass: f64) -> Result<f64, ChemError> {
        check_molar_mass(molar_mass)?;
        Ok(grams / molar_mass)
    }

    pub fn moles_to_grams(&self, moles: f64, molar_mass: f64) -> f64 {
        moles * molar_mass
    }

    /// Grams of a salt to add to `volume_l` liters to raise one nutrient by `delta_ppm`.
    ///
    /// `nutrient_fraction` is the mass fraction of the nutrient in the salt, e.g. 0.155 for
    /// calcium nitrate with 15.5 % N.
    pub fn grams_of_salt_for_delta_ppm(
        &self,
        delta_ppm: f64,
        volume_l: f64,
        nutrient_fraction: f64,
    ) -> Result<f64, ChemError> {
        if !(nutrient_fraction > 0.0) {
            return Err(ChemError::InvalidFraction(nutrient_fraction));
        }
        let mg_per_l_salt = delta_ppm / nutrient_fraction;
        Ok(self.ppm_to_g_per_l(mg_per_l_salt) * volume_l)
    }

    /// ppm of the nutrient obtained by dissolving `grams` of a salt in `volume_l` liters
    pub fn ppm_from_salt_grams(
        &self,
        grams: f64,
        volume_l: f64,
        nutrient_fraction: f64,
    ) -> Result<f64, ChemError> {
        if !(volume_l > 0.0) {
            return Err(ChemError::InvalidVolume(volume_l));
        }
        let g_per_l_nutrient = grams * nutrient_fraction / volume_l;
        Ok(self.g_per_l_to_ppm(g_per_l_nutrient))
    }
}

fn check_molar_mass(molar_mass: f64) -> Result<(), ChemError> {
    if !molar_mass.is_finite() || molar_mass <= 0.0 {
        return Err(ChemError::Computation(format!(
            "molar mass must be positive, got {}",
            molar_mass
        )));
    }
    Ok(())
}

/// A parsed chemical compound, optionally dissolved at `concentration_ppm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compound {
    pub formula: String,
    pub composition: Composition,
    pub molar_mass: f64,
    pub concentration_ppm: Option<f64>,
}

impl Compound {
    pub fn new(parser: &FormulaParser, formula: &str) -> Result<Self, ChemError> {
        let composition = parser.parse(formula)?;
        let molar_mass = parser.molar_mass(&composition)?;
        Ok(Self {
            formula: formula.to_string(),
            composition,
            molar_mass,
            concentration_ppm: None,
        })
    }

    pub fn dissolved(
        parser: &FormulaParser,
        formula: &str,
        concentration_ppm: f64,
    ) -> Result<Self, ChemError> {
        if !concentration_ppm.is_finite() || concentration_ppm < 0.0 {
            return Err(ChemError::Computation(format!(
                "concentration of {} must be a non-negative number, got {}",
                formula, concentration_ppm
            )));
        }
        let mut compound = Self::new(parser, formula)?;
        compound.concentration_ppm = Some(concentration_ppm);
        Ok(compound)
    }

    /// Mass fraction of `element` in the compound, 0 when absent.
    pub fn mass_fraction(&self, parser: &FormulaParser, element: &str) -> Result<f64, ChemError> {
        match self.composition.get(element) {
            None => Ok(0.0),
            Some(count) => {
                let element_mass = parser.weights().weight(element)? * *count as f64;
                Ok(element_mass / self.molar_mass)
            }
        }
    }

    /// ppm of `element` supplied by the dissolved compound:
    /// concentration * (atomic weight * count) / molar mass
    pub fn contribution_ppm(&self, parser: &FormulaParser, element: &str) -> Result<f64, ChemError> {
        let concentration = self.concentration_ppm.unwrap_or(0.0);
        Ok(concentration * self.mass_fraction(parser, element)?)
    }
}

/// Mass of compound needed to prepare a solution of given molarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MolarSolution {
    pub formula: String,
    pub molar_mass: f64,
    pub molarity: f64,
    pub volume_l: f64,
    pub grams: f64,
}

/// grams = molarity * volume * molar mass
pub fn solution_molar(
    parser: &FormulaParser,
    formula: &str,
    molarity: f64,
    volume_l: f64,
) -> Result<MolarSolution, ChemError> {
    if !(volume_l > 0.0) || !volume_l.is_finite() {
        return Err(ChemError::InvalidVolume(volume_l));
    }
    if !molarity.is_finite() || molarity < 0.0 {
        return Err(ChemError::Computation(format!(
            "molarity must be a non-negative number, got {}",
            molarity
        )));
    }
    let molar_mass = parser.molar_mass_of_formula(formula)?;
    let grams = molarity * volume_l * molar_mass;
    Ok(MolarSolution {
        formula: formula.to_string(),
        molar_mass: round_to(molar_mass, 4),
        molarity,
        volume_l,
        grams: round_to(grams, 3),
    })
}

/// grams of compound for a 1 M solution of `volume_l` liters
pub fn prepare_molar_solution(
    parser: &FormulaParser,
    formula: &str,
    volume_l: f64,
) -> Result<MolarSolution, ChemError> {
    solution_molar(parser, formula, 1.0, volume_l)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
