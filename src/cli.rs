/// terminal menus over the engine
pub mod cli_chemistry;
pub mod cli_dosing;
pub mod cli_main;
