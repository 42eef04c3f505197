/// Parsing of chemical formulae, atomic weights and molar masses.
/// Formulae may contain nested groups `Ca3(PO4)2`, `K4[Fe(CN)6]`, hydrates `CuSO4·5H2O` and phase marks `H2O(g)`.
pub mod molmass;
/// Unit algebra for aqueous solutions: ppm, g/L, molarity, grams of salt per nutrient, molar solutions
/// and the elemental contribution of a dissolved compound.
pub mod concentration;
/// exact rational linear algebra used by the balancer
pub mod rational_nullspace;
/// Balancing of chemical equations with minimal positive integer coefficients
/// # Examples
/// ```
/// use NutriChem::Stoichiometry::molmass::{AtomicWeights, FormulaParser};
/// use NutriChem::Stoichiometry::reaction_balancer::ReactionBalancer;
/// let balancer = ReactionBalancer::new(FormulaParser::new(AtomicWeights::standard()));
/// let balanced = balancer.balance(&["NH3", "O2"], &["NO", "H2O"]).unwrap();
/// assert_eq!(balanced.equation, "4 NH3 + 5 O2 -> 4 NO + 6 H2O");
/// ```
pub mod reaction_balancer;
mod reaction_balancer_tests;
