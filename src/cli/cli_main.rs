use super::cli_chemistry::chemistry_menu;
use super::cli_dosing::dosing_menu;
use crate::engine::NutriEngine;
use std::io::{self, Write};

pub fn run_interactive_menu(engine: &NutriEngine) {
    loop {
        show_main_menu();
        let choice = get_user_input();

        match choice.trim() {
            "1" => dosing_menu(engine),
            "2" => chemistry_menu(engine),
            "0" | "" => {
                println!("Goodbye!");
                break;
            }
            _ => println!("Invalid choice. Please try again."),
        }
    }
}
/* colors
Blue (\x1b[34m) - header text
Yellow (\x1b[33m) - menu options
Cyan (\x1b[36m) - prompts
Reset (\x1b[0m) - back to normal after each colored section
*/
fn show_main_menu() {
    println!(
        "\x1b[34m\n NutriChem: hydroponic nutrient dosing and stoichiometry \n \x1b[0m"
    );
    println!("\x1b[33m1. Dosing, water analysis and deficiencies\x1b[0m");
    println!("\x1b[33m2. Formulas, molar solutions and reaction balancing\x1b[0m");
    println!("\x1b[33m0. Exit\x1b[0m");
    print!("\x1b[36mEnter your choice: \x1b[0m");
    let _ = io::stdout().flush();
}

/// one line from stdin; empty on end of input
pub(crate) fn get_user_input() -> String {
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        input.clear();
    }
    input
}

pub(crate) fn prompt(text: &str) -> String {
    print!("\x1b[36m{}: \x1b[0m", text);
    let _ = io::stdout().flush();
    get_user_input().trim().to_string()
}

pub(crate) fn prompt_f64(text: &str) -> Option<f64> {
    let answer = prompt(text);
    match answer.replace(',', ".").parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            println!("'{}' is not a number", answer);
            None
        }
    }
}
