#[cfg(test)]
mod tests {
    use crate::Stoichiometry::molmass::{AtomicWeights, FormulaParser};
    use crate::Stoichiometry::reaction_balancer::{
        BalancedReaction, ReactionBalancer, Term, parse_equation,
    };
    use crate::errors::ChemError;
    use num_integer::Integer;

    fn balancer() -> ReactionBalancer<'static> {
        ReactionBalancer::new(FormulaParser::new(AtomicWeights::standard()))
    }

    fn assert_minimal_and_conserving(reactants: &[&str], products: &[&str]) {
        let parser = FormulaParser::new(AtomicWeights::standard());
        let balanced = balancer().balance(reactants, products).unwrap();
        let all: Vec<u64> = balanced
            .reactant_coefficients()
            .into_iter()
            .chain(balanced.product_coefficients())
            .collect();
        assert!(all.iter().all(|c| *c > 0), "{}", balanced);
        assert_eq!(all.iter().fold(0u64, |acc, c| acc.gcd(c)), 1, "{}", balanced);
        for (element, (left, right)) in balanced.atom_balance(&parser).unwrap() {
            assert_eq!(left, right, "{} in {}", element, balanced);
        }
    }

    #[test]
    fn test_ammonia_oxidation() {
        let parser = FormulaParser::new(AtomicWeights::standard());
        let balanced = balancer()
            .balance(&["NH3", "O2"], &["NO", "H2O"])
            .unwrap();
        assert_eq!(balanced.reactant_coefficients(), vec![4, 5]);
        assert_eq!(balanced.product_coefficients(), vec![4, 6]);
        assert_eq!(balanced.equation, "4 NH3 + 5 O2 -> 4 NO + 6 H2O");

        let atoms = balanced.atom_balance(&parser).unwrap();
        assert_eq!(atoms["N"], (4, 4));
        assert_eq!(atoms["H"], (12, 12));
        assert_eq!(atoms["O"], (10, 10));
    }

    #[test]
    fn test_identity_reaction() {
        let balanced = balancer().balance(&["H2"], &["H2"]).unwrap();
        assert_eq!(balanced.reactant_coefficients(), vec![1]);
        assert_eq!(balanced.product_coefficients(), vec![1]);
        assert_eq!(balanced.equation, "H2 -> H2");
    }

    #[test]
    fn test_order_is_preserved() {
        let balanced = balancer()
            .balance(&["O2", "C3H8"], &["H2O", "CO2"])
            .unwrap();
        assert_eq!(balanced.reactants[0].formula, "O2");
        assert_eq!(balanced.reactant_coefficients(), vec![5, 1]);
        assert_eq!(balanced.product_coefficients(), vec![4, 3]);
    }

    #[test]
    fn test_various_reactions_are_minimal() {
        assert_minimal_and_conserving(&["C6H12O6", "O2"], &["CO2", "H2O"]);
        assert_minimal_and_conserving(&["Ca(OH)2", "H3PO4"], &["Ca3(PO4)2", "H2O"]);
        assert_minimal_and_conserving(&["KMnO4", "HCl"], &["KCl", "MnCl2", "H2O", "Cl2"]);
        assert_minimal_and_conserving(&["Fe2O3", "CO"], &["Fe", "CO2"]);
        assert_minimal_and_conserving(&["NH3", "HNO3"], &["NH4NO3"]);
        assert_minimal_and_conserving(&["K4[Fe(CN)6]", "KMnO4", "H2SO4"], &[
            "KHSO4",
            "Fe2(SO4)3",
            "MnSO4",
            "HNO3",
            "CO2",
            "H2O",
        ]);
    }

    #[test]
    fn test_large_coefficients() {
        let balanced = balancer()
            .balance(&["K4[Fe(CN)6]", "KMnO4", "H2SO4"], &[
                "KHSO4",
                "Fe2(SO4)3",
                "MnSO4",
                "HNO3",
                "CO2",
                "H2O",
            ])
            .unwrap();
        assert_eq!(balanced.reactant_coefficients(), vec![10, 122, 299]);
        assert_eq!(balanced.product_coefficients(), vec![162, 5, 122, 60, 60, 188]);
    }

    #[test]
    fn test_multidimensional_nullspace_is_deterministic() {
        let first = balancer()
            .balance(&["H2", "O2"], &["H2O", "H2O2"])
            .unwrap();
        assert_eq!(first.reactant_coefficients(), vec![3, 2]);
        assert_eq!(first.product_coefficients(), vec![2, 1]);
        let second = balancer()
            .balance(&["H2", "O2"], &["H2O", "H2O2"])
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_basis_vector_positive_on_its_own() {
        // basis (2, -1, 1, 0) and (-2, 2, 0, 1), neither positive on its own
        let balanced = balancer().balance(&["CO", "CO2"], &["C", "O2"]).unwrap();
        assert_eq!(balanced.reactant_coefficients(), vec![2, 1]);
        assert_eq!(balanced.product_coefficients(), vec![3, 2]);
        assert_eq!(balanced.equation, "2 CO + CO2 -> 3 C + 2 O2");
        assert_minimal_and_conserving(&["CO", "CO2"], &["C", "O2"]);
    }

    #[test]
    fn test_reversed_multidimensional_reaction() {
        let balanced = balancer().balance(&["C", "O2"], &["CO", "CO2"]).unwrap();
        assert_eq!(balanced.reactant_coefficients(), vec![3, 2]);
        assert_eq!(balanced.product_coefficients(), vec![2, 1]);
        assert_eq!(balanced.equation, "3 C + 2 O2 -> 2 CO + CO2");
    }

    #[test]
    fn test_black_powder_needs_larger_weights() {
        let balanced = balancer()
            .balance(&["KNO3", "C", "S"], &["K2CO3", "K2SO4", "CO2", "N2"])
            .unwrap();
        assert_eq!(balanced.reactant_coefficients(), vec![6, 6, 1]);
        assert_eq!(balanced.product_coefficients(), vec![2, 1, 4, 3]);
        assert_minimal_and_conserving(&["KNO3", "C", "S"], &["K2CO3", "K2SO4", "CO2", "N2"]);
    }

    #[test]
    fn test_multidimensional_without_positive_balance() {
        // He stays at zero in every combination, so the search runs out
        assert!(matches!(
            balancer().balance(&["H2", "O2"], &["H2O", "H2O2", "He"]),
            Err(ChemError::NoSolution(_))
        ));
    }

    #[test]
    fn test_atom_balance_overflow() {
        let parser = FormulaParser::new(AtomicWeights::standard());
        let huge = BalancedReaction {
            reactants: vec![Term {
                formula: "H2".to_string(),
                coefficient: u64::MAX,
            }],
            products: vec![Term {
                formula: "H2".to_string(),
                coefficient: u64::MAX,
            }],
            equation: "H2 -> H2".to_string(),
        };
        assert!(matches!(
            huge.atom_balance(&parser),
            Err(ChemError::Computation(_))
        ));

        let summed = BalancedReaction {
            reactants: vec![
                Term {
                    formula: "H".to_string(),
                    coefficient: u64::MAX,
                },
                Term {
                    formula: "H".to_string(),
                    coefficient: 1,
                },
            ],
            products: vec![],
            equation: String::new(),
        };
        assert!(matches!(
            summed.atom_balance(&parser),
            Err(ChemError::Computation(_))
        ));
    }

    #[test]
    fn test_unbalanceable_reactions() {
        assert!(matches!(
            balancer().balance(&["H2"], &["O2"]),
            Err(ChemError::NoSolution(_))
        ));
        // He can only get a zero coefficient
        assert!(matches!(
            balancer().balance(&["H2", "O2"], &["H2O", "He"]),
            Err(ChemError::NoSolution(_))
        ));
        let empty: [&str; 0] = [];
        assert!(matches!(
            balancer().balance(&empty, &empty),
            Err(ChemError::NoSolution(_))
        ));
    }

    #[test]
    fn test_parse_errors_propagate() {
        assert_eq!(
            balancer().balance(&["Qz2"], &["Qz"]),
            Err(ChemError::UnknownElement("Qz".to_string()))
        );
        assert!(matches!(
            balancer().balance(&["Ca(OH"], &["CaO", "H2O"]),
            Err(ChemError::MalformedFormula { .. })
        ));
    }

    #[test]
    fn test_parse_equation() {
        let (reactants, products) = parse_equation("2 H2 + O2 -> 2H2O").unwrap();
        assert_eq!(reactants, vec!["H2", "O2"]);
        assert_eq!(products, vec!["H2O"]);

        let (reactants, products) = parse_equation("CH4+2O2 = CO2 + 2 H2O").unwrap();
        assert_eq!(reactants, vec!["CH4", "O2"]);
        assert_eq!(products, vec!["CO2", "H2O"]);

        assert!(parse_equation("H2 + O2").is_err());
        assert!(parse_equation("H2 -> H2O -> O2").is_err());
        assert!(parse_equation("H2 + -> H2O").is_err());

        let balanced = balancer().balance_equation("NH3 + O2 → NO + H2O").unwrap();
        assert_eq!(balanced.equation, "4 NH3 + 5 O2 -> 4 NO + 6 H2O");
    }
}
