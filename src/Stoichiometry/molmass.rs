/// Module to parse chemical formulae into their atomic composition and to calculate molar masses
///
/// Supported notation: element symbols with optional subscripts, nested groups in parentheses or
/// square brackets with multipliers (`Ca3(PO4)2`, `K4[Fe(CN)6]`), hydrate parts with a leading
/// multiplier (`CuSO4·5H2O`, `MgSO4*7H2O`) and trailing phase marks (`H2O(g)`, `NaCl(aq)`).
use crate::errors::ChemError;
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

/// element symbol -> number of atoms
pub type Composition = BTreeMap<String, usize>;

// Define a struct to hold element data
pub struct Element {
    name: &'static str,
    atomic_mass: f64,
}

// standard atomic weights, g/mol
const ELEMENTS: &[Element] = &[
    Element { name: "H", atomic_mass: 1.008 },
    Element { name: "He", atomic_mass: 4.0026 },
    Element { name: "Li", atomic_mass: 6.94 },
    Element { name: "Be", atomic_mass: 9.0122 },
    Element { name: "B", atomic_mass: 10.81 },
    Element { name: "C", atomic_mass: 12.011 },
    Element { name: "N", atomic_mass: 14.007 },
    Element { name: "O", atomic_mass: 15.999 },
    Element { name: "F", atomic_mass: 18.998 },
    Element { name: "Ne", atomic_mass: 20.18 },
    Element { name: "Na", atomic_mass: 22.99 },
    Element { name: "Mg", atomic_mass: 24.305 },
    Element { name: "Al", atomic_mass: 26.982 },
    Element { name: "Si", atomic_mass: 28.085 },
    Element { name: "P", atomic_mass: 30.974 },
    Element { name: "S", atomic_mass: 32.065 },
    Element { name: "Cl", atomic_mass: 35.453 },
    Element { name: "Ar", atomic_mass: 39.948 },
    Element { name: "K", atomic_mass: 39.098 },
    Element { name: "Ca", atomic_mass: 40.078 },
    Element { name: "Sc", atomic_mass: 44.956 },
    Element { name: "Ti", atomic_mass: 47.867 },
    Element { name: "V", atomic_mass: 50.942 },
    Element { name: "Cr", atomic_mass: 51.996 },
    Element { name: "Mn", atomic_mass: 54.938 },
    Element { name: "Fe", atomic_mass: 55.845 },
    Element { name: "Co", atomic_mass: 58.933 },
    Element { name: "Ni", atomic_mass: 58.693 },
    Element { name: "Cu", atomic_mass: 63.546 },
    Element { name: "Zn", atomic_mass: 65.38 },
    Element { name: "Ga", atomic_mass: 69.723 },
    Element { name: "Ge", atomic_mass: 72.63 },
    Element { name: "As", atomic_mass: 74.922 },
    Element { name: "Se", atomic_mass: 78.971 },
    Element { name: "Br", atomic_mass: 79.904 },
    Element { name: "Kr", atomic_mass: 83.798 },
    Element { name: "Rb", atomic_mass: 85.468 },
    Element { name: "Sr", atomic_mass: 87.62 },
    Element { name: "Y", atomic_mass: 88.906 },
    Element { name: "Zr", atomic_mass: 91.224 },
    Element { name: "Nb", atomic_mass: 92.906 },
    Element { name: "Mo", atomic_mass: 95.95 },
    Element { name: "Tc", atomic_mass: 98.0 },
    Element { name: "Ru", atomic_mass: 101.07 },
    Element { name: "Rh", atomic_mass: 102.906 },
    Element { name: "Pd", atomic_mass: 106.42 },
    Element { name: "Ag", atomic_mass: 107.868 },
    Element { name: "Cd", atomic_mass: 112.414 },
    Element { name: "In", atomic_mass: 114.818 },
    Element { name: "Sn", atomic_mass: 118.71 },
    Element { name: "Sb", atomic_mass: 121.76 },
    Element { name: "Te", atomic_mass: 127.6 },
    Element { name: "I", atomic_mass: 126.904 },
    Element { name: "Xe", atomic_mass: 131.293 },
    Element { name: "Cs", atomic_mass: 132.905 },
    Element { name: "Ba", atomic_mass: 137.327 },
    Element { name: "W", atomic_mass: 183.84 },
    Element { name: "Pt", atomic_mass: 195.084 },
    Element { name: "Au", atomic_mass: 196.967 },
    Element { name: "Hg", atomic_mass: 200.592 },
    Element { name: "Pb", atomic_mass: 207.2 },
];

const PHASE_MARKS: [&str; 4] = ["(aq)", "(s)", "(l)", "(g)"];
const HYDRATE_SEPARATORS: [char; 3] = ['·', '*', '.'];

/// Immutable table element symbol -> standard atomic mass (g/mol).
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicWeights {
    masses: HashMap<String, f64>,
}

impl AtomicWeights {
    /// built-in table, created once per process
    pub fn standard() -> &'static AtomicWeights {
        static STANDARD: OnceLock<AtomicWeights> = OnceLock::new();
        STANDARD.get_or_init(|| AtomicWeights {
            masses: ELEMENTS
                .iter()
                .map(|e| (e.name.to_string(), e.atomic_mass))
                .collect(),
        })
    }

    pub fn from_map(masses: HashMap<String, f64>) -> Result<Self, ChemError> {
        for (symbol, mass) in &masses {
            if !mass.is_finite() || *mass <= 0.0 {
                return Err(ChemError::InvalidReferenceTable(format!(
                    "atomic weight of {} must be a positive number, got {}",
                    symbol, mass
                )));
            }
        }
        Ok(Self { masses })
    }

    /// standard table with some weights replaced or added
    pub fn with_overrides(overrides: HashMap<String, f64>) -> Result<Self, ChemError> {
        let mut masses = Self::standard().masses.clone();
        masses.extend(overrides);
        Self::from_map(masses)
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.masses.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.masses.contains_key(symbol)
    }

    pub fn weight(&self, symbol: &str) -> Result<f64, ChemError> {
        self.get(symbol)
            .ok_or_else(|| ChemError::UnknownElement(symbol.to_string()))
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }
}

fn filter_phases_marks(formula: &str) -> &str {
    for phase in PHASE_MARKS {
        if let Some(stripped) = formula.strip_suffix(phase) {
            return stripped;
        }
    }
    formula
}

/// Recursive descent over one hydrate part of a formula.
struct Cursor<'a> {
    formula: &'a str,
    chars: Vec<char>,
    pos: usize,
    weights: &'a AtomicWeights,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// reads a run of digits; None if there is no digit at the cursor
    fn read_number(&mut self) -> Result<Option<usize>, ChemError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(None);
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        let n: usize = digits.parse().map_err(|_| {
            ChemError::malformed(self.formula, format!("number {} is too large", digits))
        })?;
        if n == 0 {
            return Err(ChemError::malformed(
                self.formula,
                format!("zero multiplier at position {}", start),
            ));
        }
        Ok(Some(n))
    }

    fn parse_group(&mut self, closing: Option<char>) -> Result<Composition, ChemError> {
        let mut counts = Composition::new();
        loop {
            let Some(c) = self.peek() else {
                if let Some(close) = closing {
                    return Err(ChemError::malformed(
                        self.formula,
                        format!("missing closing '{}'", close),
                    ));
                }
                return Ok(counts);
            };
            match c {
                '(' | '[' => {
                    self.pos += 1;
                    let close = if c == '(' { ')' } else { ']' };
                    let inner = self.parse_group(Some(close))?;
                    if inner.is_empty() {
                        return Err(ChemError::malformed(self.formula, "empty group"));
                    }
                    let multiplier = self.read_number()?.unwrap_or(1);
                    merge_scaled(&mut counts, &inner, multiplier, self.formula)?;
                }
                ')' | ']' => {
                    if closing == Some(c) {
                        self.pos += 1;
                        return Ok(counts);
                    }
                    return Err(ChemError::malformed(
                        self.formula,
                        format!("unmatched '{}' at position {}", c, self.pos),
                    ));
                }
                c if c.is_ascii_uppercase() => {
                    let mut symbol = c.to_string();
                    self.pos += 1;
                    if let Some(next) = self.peek() {
                        if next.is_ascii_lowercase() {
                            symbol.push(next);
                            self.pos += 1;
                        }
                    }
                    if !self.weights.contains(&symbol) {
                        return Err(ChemError::UnknownElement(symbol));
                    }
                    let count = self.read_number()?.unwrap_or(1);
                    let single = Composition::from([(symbol, count)]);
                    merge_scaled(&mut counts, &single, 1, self.formula)?;
                }
                other => {
                    return Err(ChemError::malformed(
                        self.formula,
                        format!("unexpected character '{}' at position {}", other, self.pos),
                    ));
                }
            }
        }
    }
}

fn merge_scaled(
    target: &mut Composition,
    source: &Composition,
    multiplier: usize,
    formula: &str,
) -> Result<(), ChemError> {
    for (element, count) in source {
        let added = count
            .checked_mul(multiplier)
            .and_then(|scaled| scaled.checked_add(*target.get(element).unwrap_or(&0)))
            .ok_or_else(|| ChemError::malformed(formula, "atom count overflow"))?;
        target.insert(element.clone(), added);
    }
    Ok(())
}

/// Parser bound to an atomic weight table; every symbol it accepts is present in that table.
#[derive(Debug, Clone, Copy)]
pub struct FormulaParser<'a> {
    weights: &'a AtomicWeights,
}

impl<'a> FormulaParser<'a> {
    pub fn new(weights: &'a AtomicWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &'a AtomicWeights {
        self.weights
    }

    pub fn parse(&self, formula: &str) -> Result<Composition, ChemError> {
        let compact: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
        let compact = filter_phases_marks(&compact);
        if compact.is_empty() {
            return Err(ChemError::malformed(formula, "empty formula"));
        }
        let mut total = Composition::new();
        for part in compact.split(|c| HYDRATE_SEPARATORS.contains(&c)) {
            if part.is_empty() {
                return Err(ChemError::malformed(formula, "empty hydrate part"));
            }
            let mut cursor = Cursor {
                formula,
                chars: part.chars().collect(),
                pos: 0,
                weights: self.weights,
            };
            let multiplier = cursor.read_number()?.unwrap_or(1);
            let counts = cursor.parse_group(None)?;
            if counts.is_empty() {
                return Err(ChemError::malformed(formula, "no elements found"));
            }
            merge_scaled(&mut total, &counts, multiplier, formula)?;
        }
        debug!("parsed formula {} into {:?}", formula, total);
        Ok(total)
    }

    /// Sum of count * atomic weight over the composition
    pub fn molar_mass(&self, composition: &Composition) -> Result<f64, ChemError> {
        let mut molar_mass = 0.0;
        for (element, count) in composition {
            molar_mass += self.weights.weight(element)? * *count as f64;
        }
        Ok(molar_mass)
    }

    pub fn molar_mass_of_formula(&self, formula: &str) -> Result<f64, ChemError> {
        let composition = self.parse(formula)?;
        self.molar_mass(&composition)
    }
}

/// Parses against the built-in atomic weight table.
pub fn parse_formula(formula: &str) -> Result<Composition, ChemError> {
    FormulaParser::new(AtomicWeights::standard()).parse(formula)
}

// Function to calculate the molar mass of a substance given its chemical formula
pub fn calculate_molar_mass(formula: &str) -> Result<(f64, Composition), ChemError> {
    let parser = FormulaParser::new(AtomicWeights::standard());
    let counts = parser.parse(formula)?;
    let molar_mass = parser.molar_mass(&counts)?;
    Ok((molar_mass, counts))
}

/// Writes a composition back as a formula in Hill order: C first, H second, then alphabetical.
/// Without carbon every element, H included, is alphabetical.
pub fn render_formula(composition: &Composition) -> String {
    let mut order: Vec<&String> = Vec::with_capacity(composition.len());
    let has_carbon = composition.contains_key("C");
    if has_carbon {
        for first in ["C", "H"] {
            if let Some((key, _)) = composition.get_key_value(first) {
                order.push(key);
            }
        }
    }
    order.extend(
        composition
            .keys()
            .filter(|k| !(has_carbon && (k.as_str() == "C" || k.as_str() == "H"))),
    );
    order
        .into_iter()
        .map(|element| match composition[element] {
            1 => element.clone(),
            n => format!("{}{}", element, n),
        })
        .collect()
}

/// Element-by-substance count matrix. Rows follow the sorted union of elements, columns follow
/// the input order of the compositions.
pub fn create_elem_composition_matrix(
    compositions: &[Composition],
) -> (Vec<Vec<usize>>, Vec<String>) {
    let elements: BTreeSet<&String> = compositions.iter().flat_map(|c| c.keys()).collect();
    let elements: Vec<String> = elements.into_iter().cloned().collect();
    let matrix = elements
        .iter()
        .map(|element| {
            compositions
                .iter()
                .map(|c| c.get(element).copied().unwrap_or(0))
                .collect()
        })
        .collect();
    (matrix, elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn comp(pairs: &[(&str, usize)]) -> Composition {
        pairs.iter().map(|(e, n)| (e.to_string(), *n)).collect()
    }

    #[test]
    fn test_parse_formula() {
        assert_eq!(
            parse_formula("C6H8O6").unwrap(),
            comp(&[("C", 6), ("H", 8), ("O", 6)])
        );
        assert_eq!(
            parse_formula("Na(NO3)2").unwrap(),
            comp(&[("Na", 1), ("N", 2), ("O", 6)])
        );
        assert_eq!(parse_formula("H2O").unwrap(), comp(&[("H", 2), ("O", 1)]));
        assert_eq!(
            parse_formula("C5H6OOH").unwrap(),
            comp(&[("C", 5), ("H", 7), ("O", 2)])
        );
        assert_eq!(parse_formula("CaCl2").unwrap(), comp(&[("Ca", 1), ("Cl", 2)]));
    }

    #[test]
    fn test_nested_groups() {
        assert_eq!(
            parse_formula("Ca3(PO4)2").unwrap(),
            comp(&[("Ca", 3), ("P", 2), ("O", 8)])
        );
        assert_eq!(
            parse_formula("K4[Fe(CN)6]").unwrap(),
            comp(&[("K", 4), ("Fe", 1), ("C", 6), ("N", 6)])
        );
        assert_eq!(
            parse_formula("((CH3)3C)2O").unwrap(),
            comp(&[("C", 8), ("H", 18), ("O", 1)])
        );
        assert_eq!(
            parse_formula("(NH4)2HPO4").unwrap(),
            comp(&[("N", 2), ("H", 9), ("P", 1), ("O", 4)])
        );
    }

    #[test]
    fn test_hydrates_and_phase_marks() {
        assert_eq!(
            parse_formula("CuSO4·5H2O").unwrap(),
            comp(&[("Cu", 1), ("S", 1), ("O", 9), ("H", 10)])
        );
        assert_eq!(
            parse_formula("Ca(NO3)2*4H2O").unwrap(),
            comp(&[("Ca", 1), ("N", 2), ("O", 10), ("H", 8)])
        );
        assert_eq!(parse_formula("H2O(g)").unwrap(), comp(&[("H", 2), ("O", 1)]));
        assert_eq!(parse_formula(" Na Cl (aq)").unwrap(), comp(&[("Na", 1), ("Cl", 1)]));
    }

    #[test]
    fn test_malformed_formulas() {
        for bad in ["Ca(NO3", "CaNO3)2", "K4[Fe(CN)6)", "", "H2O·", "()", "H0", "h2o", "Na-Cl"] {
            match parse_formula(bad) {
                Err(ChemError::MalformedFormula { .. }) => {}
                other => panic!("{:?} should be malformed, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_unknown_element() {
        assert_eq!(
            parse_formula("XyO2"),
            Err(ChemError::UnknownElement("Xy".to_string()))
        );
        assert_eq!(
            parse_formula("CL2"),
            Err(ChemError::UnknownElement("L".to_string()))
        );
    }

    #[test]
    fn test_calculate_molar_mass() {
        let (molar_mass, counts) = calculate_molar_mass("H2O").unwrap();
        assert_relative_eq!(molar_mass, 18.015, epsilon = 1e-2);
        assert_eq!(counts, comp(&[("H", 2), ("O", 1)]));

        let (molar_mass, counts) = calculate_molar_mass("CaCl2").unwrap();
        assert_relative_eq!(molar_mass, 110.984, epsilon = 1e-2);
        assert_eq!(counts, comp(&[("Ca", 1), ("Cl", 2)]));

        let (molar_mass, _) = calculate_molar_mass("Ca(NO3)2").unwrap();
        assert_relative_eq!(molar_mass, 164.088, epsilon = 1e-2);
        let (molar_mass, _) = calculate_molar_mass("NaCl").unwrap();
        assert_relative_eq!(molar_mass, 58.44, epsilon = 1e-2);
    }

    #[test]
    fn test_render_round_trip() {
        for formula in ["H2O", "CaCl2", "Ca(NO3)2", "C6H12O6", "KH2PO4", "MgSO4·7H2O", "CH3COOH"] {
            let parsed = parse_formula(formula).unwrap();
            let rendered = render_formula(&parsed);
            assert_eq!(parse_formula(&rendered).unwrap(), parsed, "{}", rendered);
        }
        assert_eq!(render_formula(&parse_formula("CH3COOH").unwrap()), "C2H4O2");
        assert_eq!(render_formula(&parse_formula("Ca(NO3)2").unwrap()), "CaN2O6");
    }

    #[test]
    fn test_custom_weights() {
        let weights =
            AtomicWeights::with_overrides(HashMap::from([("D".to_string(), 2.014)])).unwrap();
        let parser = FormulaParser::new(&weights);
        assert_relative_eq!(
            parser.molar_mass_of_formula("D2O").unwrap(),
            20.027,
            epsilon = 1e-3
        );
        assert!(parse_formula("D2O").is_err());
        assert!(AtomicWeights::from_map(HashMap::from([("X".to_string(), -1.0)])).is_err());
    }

    #[test]
    fn test_element_matrix() {
        let compositions: Vec<Composition> = ["H2O", "NaCl", "C3H8", "CH4"]
            .iter()
            .map(|f| parse_formula(f).unwrap())
            .collect();
        let (matrix, elements) = create_elem_composition_matrix(&compositions);
        assert_eq!(elements, vec!["C", "Cl", "H", "Na", "O"]);
        assert_eq!(matrix.len(), 5);
        assert_eq!(matrix[2], vec![2, 0, 8, 4]);
    }
}
