//! Loading of reference tables from files.
//!
//! A file is either plain JSON or a text document where the JSON of a table follows a header
//! line such as `FERTILIZERS`, `PROFILES`, `DEFICIENCY RULES` or `ATOMIC WEIGHTS` and runs until
//! the next all-uppercase header. One document can therefore hold every table of a setup.
use crate::Dosing::deficiency::DeficiencyRules;
use crate::Dosing::fertilizers::FertilizerTable;
use crate::Dosing::profiles::ProfileBook;
use crate::Stoichiometry::molmass::AtomicWeights;
use crate::errors::ChemError;
use log::{error, info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct LoadData {
    pub file_name: String,
}

impl LoadData {
    pub fn new(file_name: String) -> Self {
        LoadData { file_name }
    }
    pub fn load_fertilizers(&self) -> Result<FertilizerTable, ChemError> {
        load_and_validate_fertilizers(&self.file_name)
    }
    pub fn load_profiles(&self) -> Result<ProfileBook, ChemError> {
        load_and_validate_profiles(&self.file_name)
    }
    pub fn load_deficiency_rules(&self) -> Result<DeficiencyRules, ChemError> {
        load_and_validate_deficiency_rules(&self.file_name)
    }
    pub fn load_atomic_weights(&self) -> Result<AtomicWeights, ChemError> {
        load_atomic_weight_overrides(&self.file_name)
    }
}

fn is_header(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.chars().any(|c| c.is_alphabetic())
        && trimmed
            .chars()
            .all(|c| c.is_uppercase() || c == '_' || c == ' ')
}

/// Returns the JSON text of the table announced by one of `headers`, or the whole file when the
/// file has no header at all. Also returns the line offset of the section inside the file.
pub fn read_json_section(file_name: &str, headers: &[&str]) -> Result<(String, usize), ChemError> {
    let path = Path::new(file_name);
    if !path.exists() {
        return Err(ChemError::InvalidReferenceTable(format!(
            "File '{}' does not exist",
            file_name
        )));
    }
    let content = fs::read_to_string(path).map_err(|e| {
        ChemError::InvalidReferenceTable(format!("Failed to open file '{}': {}", file_name, e))
    })?;
    let lines: Vec<&str> = content.lines().collect();

    let start_index = lines.iter().position(|line| {
        let trimmed = line.trim().to_uppercase();
        headers.iter().any(|h| trimmed == *h)
    });
    let Some(start_index) = start_index.map(|i| i + 1) else {
        if lines.iter().any(|line| is_header(line)) {
            return Err(ChemError::InvalidReferenceTable(format!(
                "No '{}' header found in file '{}'",
                headers.join("' or '"),
                file_name
            )));
        }
        return Ok((content, 0));
    };
    let end_index = lines[start_index..]
        .iter()
        .position(|line| is_header(line))
        .map_or(lines.len(), |i| start_index + i);
    Ok((lines[start_index..end_index].join("\n"), start_index))
}

fn parse_section<T: serde::de::DeserializeOwned>(
    file_name: &str,
    section: &str,
    offset: usize,
) -> Result<T, ChemError> {
    serde_json::from_str(section).map_err(|e| {
        let actual_line = offset + e.line();
        let error_msg = format!(
            "Error parsing '{}' at line {}, column {} (line {} in file): {}",
            file_name,
            e.line(),
            e.column(),
            actual_line,
            e
        );
        error!("{}", error_msg);
        if let Some(problem_line) = section.lines().nth(e.line().saturating_sub(1)) {
            error!("Problematic line: {}", problem_line);
            if e.column() >= 1 && e.column() <= problem_line.len() {
                error!("{}", " ".repeat(e.column() - 1) + "^");
            }
        }
        ChemError::InvalidReferenceTable(error_msg)
    })
}

pub fn load_and_validate_fertilizers(file_name: &str) -> Result<FertilizerTable, ChemError> {
    let (section, offset) = read_json_section(file_name, &["FERTILIZERS"])?;
    // syntax errors are reported with positions before the table is validated
    let _: serde_json::Value = parse_section(file_name, &section, offset)?;
    let table = FertilizerTable::from_json_str(&section)?;
    if table.is_empty() {
        warn!("Loaded fertilizer table from '{}' is empty", file_name);
    }
    info!(
        "Loaded and validated {} fertilizers from file '{}'",
        table.len(),
        file_name
    );
    Ok(table)
}

pub fn load_and_validate_profiles(file_name: &str) -> Result<ProfileBook, ChemError> {
    let (section, offset) = read_json_section(file_name, &["PROFILES", "NUTRIENT PROFILES"])?;
    let _: serde_json::Value = parse_section(file_name, &section, offset)?;
    let book = ProfileBook::from_json_str(&section)?;
    if book.is_empty() {
        warn!("Loaded profile book from '{}' is empty", file_name);
    }
    info!("Loaded {} profiles from file '{}'", book.len(), file_name);
    Ok(book)
}

pub fn load_and_validate_deficiency_rules(file_name: &str) -> Result<DeficiencyRules, ChemError> {
    let (section, offset) = read_json_section(file_name, &["DEFICIENCY RULES", "SYMPTOMS"])?;
    let _: serde_json::Value = parse_section(file_name, &section, offset)?;
    let rules = DeficiencyRules::from_json_str(&section)?;
    if rules.is_empty() {
        warn!("Loaded deficiency rules from '{}' are empty", file_name);
    }
    info!(
        "Loaded {} deficiency rules from file '{}'",
        rules.len(),
        file_name
    );
    Ok(rules)
}

/// Standard atomic weights with the entries of the file replacing or adding symbols.
pub fn load_atomic_weight_overrides(file_name: &str) -> Result<AtomicWeights, ChemError> {
    let (section, offset) = read_json_section(file_name, &["ATOMIC WEIGHTS"])?;
    let overrides: HashMap<String, f64> = parse_section(file_name, &section, offset)?;
    for symbol in overrides.keys() {
        if AtomicWeights::standard().contains(symbol) {
            warn!("atomic weight of {} is overridden by '{}'", symbol, file_name);
        }
    }
    let weights = AtomicWeights::with_overrides(overrides)?;
    info!("Loaded atomic weights from file '{}'", file_name);
    Ok(weights)
}
