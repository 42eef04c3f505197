/// Fertilizer salts, the table of all of them and the square selection used for dosing
pub mod fertilizers;
/// Target nutrient profiles, the `ProfileSource` seam and the built-in profile book
pub mod profiles;
/// Solves grams of each fertilizer for a target profile and a tank volume
/// # Examples
/// ```
/// use NutriChem::Dosing::dose_solver::DoseSolver;
/// use NutriChem::Dosing::fertilizers::{Fertilizer, FertilizerSet};
/// use NutriChem::Dosing::profiles::NutrientProfile;
/// let set = FertilizerSet::new(
///     vec!["N".to_string(), "K".to_string()],
///     vec![
///         Fertilizer::new("PotassiumNitrate", "KNO3", &[("N", 13.0), ("K", 38.0)]),
///         Fertilizer::new("AmmoniumNitrate", "NH4NO3", &[("N", 34.0)]),
///     ],
/// )
/// .unwrap();
/// let profile = NutrientProfile::new("test", &[("N", 100.0), ("K", 190.0)]);
/// let report = DoseSolver::default().solve(&set, &profile, 10.0).unwrap();
/// assert_eq!(report.grams_of("PotassiumNitrate"), Some(5.0));
/// ```
pub mod dose_solver;
/// payload for presentation layers and terminal tables
pub mod dose_output;
pub mod water_analysis;
/// symptom rules and correction plans
pub mod deficiency;
