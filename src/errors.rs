//! # Errors
//!
//! One error type for the whole crate. Every failure of the parsing, conversion, dose solving and
//! balancing code is a `ChemError`; the facade turns it into a `Failure` outcome with the matching
//! `ErrorKind` and the `Display` text as message.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// error types of the chemistry engine
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChemError {
    #[error("Malformed formula '{formula}': {reason}")]
    MalformedFormula { formula: String, reason: String },
    #[error("Unknown element: {0}")]
    UnknownElement(String),
    #[error("No exact solution found (singular matrix): {0}")]
    SingularSystem(String),
    #[error("Reaction cannot be balanced: {0}")]
    NoSolution(String),
    #[error("Nutrient fraction must be > 0, got {0}")]
    InvalidFraction(f64),
    #[error("Volume must be greater than zero, got {0}")]
    InvalidVolume(f64),
    #[error("Plant profile '{0}' not found")]
    UnknownProfile(String),
    #[error("Computation error: {0}")]
    Computation(String),
    #[error("Invalid reference table: {0}")]
    InvalidReferenceTable(String),
    #[error("Symptom '{0}' is not registered in the deficiency rules")]
    UnknownSymptom(String),
}

impl ChemError {
    pub fn malformed(formula: &str, reason: impl Into<String>) -> Self {
        ChemError::MalformedFormula {
            formula: formula.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChemError::MalformedFormula { .. } => ErrorKind::MalformedFormula,
            ChemError::UnknownElement(_) => ErrorKind::UnknownElement,
            ChemError::SingularSystem(_) => ErrorKind::SingularSystem,
            ChemError::NoSolution(_) => ErrorKind::NoSolution,
            ChemError::InvalidFraction(_) => ErrorKind::InvalidFraction,
            ChemError::InvalidVolume(_) => ErrorKind::InvalidVolume,
            ChemError::UnknownProfile(_) => ErrorKind::UnknownProfile,
            ChemError::Computation(_) => ErrorKind::Computation,
            ChemError::InvalidReferenceTable(_) => ErrorKind::InvalidReferenceTable,
            ChemError::UnknownSymptom(_) => ErrorKind::UnknownSymptom,
        }
    }
}

/// serializable tag of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedFormula,
    UnknownElement,
    SingularSystem,
    NoSolution,
    InvalidFraction,
    InvalidVolume,
    UnknownProfile,
    Computation,
    InvalidReferenceTable,
    UnknownSymptom,
}

/// Result of a facade call: a typed payload or a failure with kind and message, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Outcome<T> {
    Success(T),
    Failure { kind: ErrorKind, message: String },
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure { message, .. } => Some(message.as_str()),
        }
    }
}

impl<T> From<Result<T, ChemError>> for Outcome<T> {
    fn from(result: Result<T, ChemError>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(e) => Outcome::Failure {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}
