//! # NutriEngine
//!
//! Facade over the parsing, dosing and balancing components. Every call works on one snapshot of
//! the reference tables and returns an `Outcome`: the typed result or a failure carrying the
//! error kind and message. Failures are logged where they are turned into outcomes.
use crate::Dosing::deficiency::{CorrectionPlan, build_correction_plan};
use crate::Dosing::dose_solver::{DoseReport, DoseSolver};
use crate::Dosing::profiles::{LayeredProfiles, NutrientProfile, ProfileSource};
use crate::Dosing::water_analysis::{WaterAnalysis, WaterAnalyzer, WaterSample};
use crate::Stoichiometry::concentration::{self, MolarSolution};
use crate::Stoichiometry::molmass::FormulaParser;
use crate::Stoichiometry::reaction_balancer::{BalancedReaction, ReactionBalancer};
use crate::errors::{ChemError, Outcome};
use crate::library_manager::{ReferenceTables, reference_tables};
use log::error;
use std::sync::Arc;

pub struct NutriEngine {
    tables: Arc<ReferenceTables>,
}

fn into_outcome<T>(operation: &str, result: Result<T, ChemError>) -> Outcome<T> {
    if let Err(e) = &result {
        error!("{} failed: {}", operation, e);
    }
    Outcome::from(result)
}

impl NutriEngine {
    pub fn new(tables: Arc<ReferenceTables>) -> Self {
        Self { tables }
    }

    /// engine over the current process-wide tables
    pub fn global() -> Result<Self, ChemError> {
        Ok(Self::new(reference_tables()?))
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    fn parser(&self) -> FormulaParser<'_> {
        FormulaParser::new(&self.tables.weights)
    }

    fn solver(&self) -> DoseSolver {
        DoseSolver::new(self.tables.ec_factor)
            .with_max_condition(self.tables.max_condition_number)
    }

    /// Doses for a named profile, looked up in `external` first and in the built-in book second.
    pub fn calculate_dose(
        &self,
        profile_name: &str,
        volume_l: f64,
        external: Option<&dyn ProfileSource>,
    ) -> Outcome<DoseReport> {
        let result = LayeredProfiles::new(external, &self.tables.profiles)
            .resolve(profile_name)
            .and_then(|profile| {
                self.solver()
                    .solve(&self.tables.fertilizer_set, &profile, volume_l)
            });
        into_outcome("dose calculation", result)
    }

    pub fn calculate_dose_inline(
        &self,
        profile: &NutrientProfile,
        volume_l: f64,
    ) -> Outcome<DoseReport> {
        let result = self
            .solver()
            .solve(&self.tables.fertilizer_set, profile, volume_l);
        into_outcome("dose calculation", result)
    }

    pub fn balance_reaction<S: AsRef<str>>(
        &self,
        reactants: &[S],
        products: &[S],
    ) -> Outcome<BalancedReaction> {
        let balancer = ReactionBalancer::new(self.parser());
        into_outcome("balancing", balancer.balance(reactants, products))
    }

    pub fn balance_equation(&self, equation: &str) -> Outcome<BalancedReaction> {
        let balancer = ReactionBalancer::new(self.parser());
        into_outcome("balancing", balancer.balance_equation(equation))
    }

    /// grams for a 1 M solution
    pub fn prepare_molar_solution(&self, formula: &str, volume_l: f64) -> Outcome<MolarSolution> {
        into_outcome(
            "molar solution",
            concentration::prepare_molar_solution(&self.parser(), formula, volume_l),
        )
    }

    pub fn solution_molar(
        &self,
        formula: &str,
        molarity: f64,
        volume_l: f64,
    ) -> Outcome<MolarSolution> {
        into_outcome(
            "molar solution",
            concentration::solution_molar(&self.parser(), formula, molarity, volume_l),
        )
    }

    pub fn analyze_water(&self, samples: &[WaterSample]) -> Outcome<WaterAnalysis> {
        let analyzer = WaterAnalyzer::with_nutrients(&self.tables.nutrient_order);
        into_outcome("water analysis", analyzer.analyze(&self.parser(), samples))
    }

    pub fn build_correction_plan(&self, symptom: &str, volume_l: f64) -> Outcome<CorrectionPlan> {
        let result = self
            .tables
            .deficiency_rules
            .find(symptom)
            .and_then(|rule| build_correction_plan(rule, &self.tables.fertilizers, volume_l));
        into_outcome("correction plan", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dosing::dose_output::DosePayload;
    use crate::errors::ErrorKind;
    use approx::assert_relative_eq;

    fn engine() -> NutriEngine {
        NutriEngine::new(Arc::new(ReferenceTables::builtin().unwrap()))
    }

    struct OneProfile;

    impl ProfileSource for OneProfile {
        fn lookup(&self, name: &str) -> Option<NutrientProfile> {
            (name == "Potassium only").then(|| NutrientProfile::new(name, &[("K", 100.0)]))
        }

        fn profile_names(&self) -> Vec<String> {
            vec!["Potassium only".to_string()]
        }
    }

    #[test]
    fn test_dose_for_builtin_profile() {
        let outcome = engine().calculate_dose("Lettuce (vegetative)", 10.0, None);
        let report = outcome.success().unwrap();
        assert_eq!(report.doses.len(), 5);
        assert_eq!(report.clamped, vec!["AmmoniumNitrate".to_string()]);
        assert_relative_eq!(report.achieved["K"], 200.0, epsilon = 0.01);
    }

    #[test]
    fn test_dose_with_external_profile() {
        let store = OneProfile;
        let report = engine()
            .calculate_dose("Potassium only", 1.0, Some(&store))
            .success()
            .unwrap();
        assert_relative_eq!(report.achieved["K"], 100.0, epsilon = 0.01);
        // potassium nitrate brings nitrogen the profile does not ask for
        assert!(report.deviation["N"] > 0.0);
    }

    #[test]
    fn test_condition_bound_from_tables() {
        let mut tables = ReferenceTables::builtin().unwrap();
        tables.max_condition_number = 1.0;
        let outcome =
            NutriEngine::new(Arc::new(tables)).calculate_dose("Lettuce (vegetative)", 10.0, None);
        assert_eq!(outcome.failure_kind(), Some(ErrorKind::SingularSystem));
    }

    #[test]
    fn test_dose_failures_become_outcomes() {
        let unknown = engine().calculate_dose("Cactus", 10.0, None);
        assert_eq!(unknown.failure_kind(), Some(ErrorKind::UnknownProfile));
        assert_eq!(unknown.message(), Some("Plant profile 'Cactus' not found"));

        let profile = NutrientProfile::new("x", &[("N", 100.0)]);
        let outcome = engine().calculate_dose_inline(&profile, 0.0);
        assert_eq!(outcome.failure_kind(), Some(ErrorKind::InvalidVolume));
        let payload = DosePayload::from(outcome);
        assert!(!payload.success);
        assert_eq!(payload.ec_estimate, 0.0);
    }

    #[test]
    fn test_balancing_and_molar_solutions() {
        let e = engine();
        let balanced = e.balance_reaction(&["H2", "O2"], &["H2O"]).success().unwrap();
        assert_eq!(balanced.equation, "2 H2 + O2 -> 2 H2O");
        let balanced = e.balance_equation("Fe + O2 -> Fe2O3").success().unwrap();
        assert_eq!(balanced.equation, "4 Fe + 3 O2 -> 2 Fe2O3");
        assert_eq!(
            e.balance_reaction(&["H2"], &["O2"]).failure_kind(),
            Some(ErrorKind::NoSolution)
        );

        let solution = e.prepare_molar_solution("KNO3", 0.5).success().unwrap();
        assert_relative_eq!(solution.grams, 50.551, epsilon = 1e-3);
        let solution = e.solution_molar("KNO3", 0.1, 1.0).success().unwrap();
        assert_relative_eq!(solution.grams, 10.110, epsilon = 1e-3);
        assert_eq!(
            e.prepare_molar_solution("K(NO3", 1.0).failure_kind(),
            Some(ErrorKind::MalformedFormula)
        );
    }

    #[test]
    fn test_water_analysis_and_correction_plan() {
        let e = engine();
        let analysis = e
            .analyze_water(&[WaterSample::new("KNO3", 400.0)])
            .success()
            .unwrap();
        assert_eq!(analysis.nutrients.len(), 5);
        assert!(analysis.ppm("K").unwrap() > 150.0);

        let plan = e.build_correction_plan("leaf_edge_necrosis", 100.0).success().unwrap();
        assert_eq!(plan.corrections[0].fertilizer.as_deref(), Some("PotassiumNitrate"));
        assert_relative_eq!(plan.corrections[0].grams.unwrap(), 5.26);
        assert_eq!(
            e.build_correction_plan("wilting", 100.0).failure_kind(),
            Some(ErrorKind::UnknownSymptom)
        );
    }
}
