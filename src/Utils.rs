/// reads reference tables from JSON files or sectioned text documents
pub mod load_from_file;
