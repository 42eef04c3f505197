#[allow(non_snake_case)]
pub mod Dosing;
#[allow(non_snake_case)]
pub mod Stoichiometry;
#[allow(non_snake_case)]
pub mod Utils;
pub mod cli;
pub mod engine;
pub mod errors;
pub mod library_manager;
pub mod settings;
