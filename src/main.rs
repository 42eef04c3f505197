use NutriChem::cli::cli_main::run_interactive_menu;
use NutriChem::engine::NutriEngine;
use NutriChem::library_manager::reload_from_config;
use NutriChem::settings::EngineConfig;
use log::error;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

pub fn main() {
    let config = EngineConfig::from_default_file();
    let _ = TermLogger::init(
        config.log_level_filter(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
    if let Err(e) = reload_from_config(&config) {
        error!("cannot load reference tables: {}", e);
        return;
    }
    match NutriEngine::global() {
        Ok(engine) => run_interactive_menu(&engine),
        Err(e) => error!("{}", e),
    }
}
