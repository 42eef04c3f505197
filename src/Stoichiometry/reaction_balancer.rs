//! # Reaction balancer
//!
//! Balances a chemical equation given as ordered reactant and product formulae.
//!
//! Each formula becomes a column of the atom conservation matrix `M` (rows are the sorted
//! elements; reactant counts enter with `+`, product counts with `-`), so that every balanced
//! set of coefficients satisfies `M c = 0`. The null space of `M` is computed exactly over
//! rationals and normalized to the smallest positive integers with gcd 1.
//!
//! When the null space has more than one dimension the equation admits several independent
//! balances, and often none of the basis vectors is positive on its own. The balancer then
//! searches integer combinations `Σ λ_i n_i` of the normalized basis vectors `n_i` shell by
//! shell: shell `L` holds the weight tuples with `max |λ_i| = L`, visited in lexicographic
//! order from `-L` to `L`. The first shell that yields a strictly positive normalized
//! combination decides; inside it the smallest coefficient sum wins and the first tuple wins
//! ties. The search gives up after `MAX_COMBINATION_WEIGHT` shells or `MAX_COMBINATIONS`
//! examined tuples.
use super::molmass::{Composition, FormulaParser, create_elem_composition_matrix};
use super::rational_nullspace::{
    from_integer_rows, normalize_integers, nullspace, to_minimal_integers,
};
use crate::errors::ChemError;
use log::{debug, info};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use prettytable::{Table, row};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// one formula with its stoichiometric coefficient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub formula: String,
    pub coefficient: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancedReaction {
    pub reactants: Vec<Term>,
    pub products: Vec<Term>,
    pub equation: String,
}

fn side_to_string(side: &[Term]) -> String {
    side.iter()
        .map(|t| match t.coefficient {
            1 => t.formula.clone(),
            c => format!("{} {}", c, t.formula),
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

impl BalancedReaction {
    fn new(reactants: Vec<Term>, products: Vec<Term>) -> Self {
        let equation = format!(
            "{} -> {}",
            side_to_string(&reactants),
            side_to_string(&products)
        );
        Self {
            reactants,
            products,
            equation,
        }
    }

    pub fn reactant_coefficients(&self) -> Vec<u64> {
        self.reactants.iter().map(|t| t.coefficient).collect()
    }

    pub fn product_coefficients(&self) -> Vec<u64> {
        self.products.iter().map(|t| t.coefficient).collect()
    }

    /// element -> (atoms on the reactant side, atoms on the product side)
    pub fn atom_balance(
        &self,
        parser: &FormulaParser,
    ) -> Result<BTreeMap<String, (u64, u64)>, ChemError> {
        let mut balance: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for (side, is_reactant) in [(&self.reactants, true), (&self.products, false)] {
            for term in side.iter() {
                for (element, count) in parser.parse(&term.formula)? {
                    let overflow = || {
                        ChemError::Computation(format!(
                            "atom count of {} in {} {} overflows 64 bits",
                            element, term.coefficient, term.formula
                        ))
                    };
                    let atoms = term
                        .coefficient
                        .checked_mul(count as u64)
                        .ok_or_else(overflow)?;
                    let entry = balance.entry(element.clone()).or_insert((0, 0));
                    let total = if is_reactant { &mut entry.0 } else { &mut entry.1 };
                    *total = total.checked_add(atoms).ok_or_else(overflow)?;
                }
            }
        }
        Ok(balance)
    }

    pub fn pretty_print(&self) {
        let mut table = Table::new();
        table.add_row(row!["side", "formula", "coefficient"]);
        for term in &self.reactants {
            table.add_row(row!["reactant", term.formula, term.coefficient]);
        }
        for term in &self.products {
            table.add_row(row!["product", term.formula, term.coefficient]);
        }
        table.printstd();
        println!("{}", self.equation);
    }
}

impl fmt::Display for BalancedReaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.equation)
    }
}

pub struct ReactionBalancer<'a> {
    parser: FormulaParser<'a>,
}

impl<'a> ReactionBalancer<'a> {
    pub fn new(parser: FormulaParser<'a>) -> Self {
        Self { parser }
    }

    pub fn balance<S: AsRef<str>>(
        &self,
        reactants: &[S],
        products: &[S],
    ) -> Result<BalancedReaction, ChemError> {
        let n_reactants = reactants.len();
        let formulas: Vec<&str> = reactants
            .iter()
            .chain(products.iter())
            .map(|f| f.as_ref())
            .collect();
        if formulas.is_empty() {
            return Err(ChemError::NoSolution("reaction has no substances".to_string()));
        }
        let compositions = formulas
            .iter()
            .map(|f| self.parser.parse(f))
            .collect::<Result<Vec<Composition>, ChemError>>()?;

        let (counts, elements) = create_elem_composition_matrix(&compositions);
        let signed_rows: Vec<Vec<i64>> = counts
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(column, count)| {
                        let count = *count as i64;
                        if column < n_reactants { count } else { -count }
                    })
                    .collect()
            })
            .collect();
        debug!("conservation matrix over {:?}: {:?}", elements, signed_rows);

        let basis = nullspace(&from_integer_rows(&signed_rows), formulas.len());
        if basis.is_empty() {
            return Err(ChemError::NoSolution(
                "only the trivial solution exists".to_string(),
            ));
        }
        let coefficients = select_coefficients(&basis)?;

        let terms: Vec<Term> = formulas
            .iter()
            .zip(coefficients)
            .map(|(formula, coefficient)| Term {
                formula: formula.to_string(),
                coefficient,
            })
            .collect();
        let mut reactant_terms = terms;
        let product_terms = reactant_terms.split_off(n_reactants);
        let balanced = BalancedReaction::new(reactant_terms, product_terms);
        info!("balanced reaction: {}", balanced.equation);
        Ok(balanced)
    }

    /// Balances an equation written as text, e.g. "NH3 + O2 -> NO + H2O".
    pub fn balance_equation(&self, equation: &str) -> Result<BalancedReaction, ChemError> {
        let (reactants, products) = parse_equation(equation)?;
        self.balance(&reactants, &products)
    }
}

/// Largest weight magnitude tried on a basis vector.
pub const MAX_COMBINATION_WEIGHT: i64 = 64;
/// Weight tuples examined before the search gives up.
pub const MAX_COMBINATIONS: usize = 200_000;

fn is_strictly_positive(v: &[BigInt]) -> bool {
    v.iter().all(|x| x.is_positive())
}

fn select_coefficients(basis: &[Vec<BigRational>]) -> Result<Vec<u64>, ChemError> {
    let vectors: Vec<Vec<BigInt>> = basis.iter().map(|v| to_minimal_integers(v)).collect();
    let best = match vectors.as_slice() {
        [single] => Some(single.clone()).filter(|v| is_strictly_positive(v)),
        _ => search_combinations(&vectors),
    };
    let Some(coefficients) = best else {
        return Err(ChemError::NoSolution(
            "no set of positive coefficients conserves every element".to_string(),
        ));
    };
    coefficients
        .iter()
        .map(|c| {
            c.to_u64().ok_or_else(|| {
                ChemError::Computation(format!("coefficient {} does not fit in 64 bits", c))
            })
        })
        .collect()
}

/// Smallest positive combination of the first shell that has one.
fn search_combinations(vectors: &[Vec<BigInt>]) -> Option<Vec<BigInt>> {
    let n = vectors.first().map_or(0, |v| v.len());
    let mut examined = 0usize;
    for bound in 1..=MAX_COMBINATION_WEIGHT {
        let mut weights = vec![-bound; vectors.len()];
        let mut best: Option<(BigInt, Vec<BigInt>)> = None;
        loop {
            if weights.iter().any(|w| w.abs() == bound) {
                examined += 1;
                let combined: Vec<BigInt> = (0..n)
                    .map(|i| {
                        vectors
                            .iter()
                            .zip(&weights)
                            .fold(BigInt::zero(), |acc, (v, w)| acc + &v[i] * BigInt::from(*w))
                    })
                    .collect();
                let candidate = normalize_integers(combined);
                if is_strictly_positive(&candidate) {
                    let total: BigInt = candidate.iter().sum();
                    if best.as_ref().is_none_or(|(b, _)| total < *b) {
                        best = Some((total, candidate));
                    }
                }
                if examined >= MAX_COMBINATIONS {
                    break;
                }
            }
            let Some(pos) = weights.iter().rposition(|w| *w < bound) else {
                break;
            };
            weights[pos] += 1;
            for w in weights[pos + 1..].iter_mut() {
                *w = -bound;
            }
        }
        if let Some((_, coefficients)) = best {
            debug!(
                "positive balance found with weights up to {} after {} combinations",
                bound, examined
            );
            return Some(coefficients);
        }
        if examined >= MAX_COMBINATIONS {
            break;
        }
    }
    debug!("no positive balance after {} combinations", examined);
    None
}

/// Splits "2 H2 + O2 -> 2 H2O" into reactant and product formulae. `->`, `=>`, `→` and `=`
/// are accepted as arrow; leading coefficients are dropped.
pub fn parse_equation(equation: &str) -> Result<(Vec<String>, Vec<String>), ChemError> {
    let regex_error = |e: regex::Error| ChemError::Computation(e.to_string());
    let arrow = Regex::new(r"->|=>|→|=").map_err(regex_error)?;
    let coefficient = Regex::new(r"^\d+\s*([A-Z(\[])").map_err(regex_error)?;

    let sides: Vec<&str> = arrow.split(equation).collect();
    if sides.len() != 2 {
        return Err(ChemError::malformed(
            equation,
            "equation must contain exactly one arrow",
        ));
    }
    let split_side = |side: &str| -> Result<Vec<String>, ChemError> {
        side.split('+')
            .map(|term| {
                let term = term.trim();
                if term.is_empty() {
                    return Err(ChemError::malformed(equation, "empty term in equation"));
                }
                Ok(coefficient.replace(term, "$1").to_string())
            })
            .collect()
    };
    Ok((split_side(sides[0])?, split_side(sides[1])?))
}
