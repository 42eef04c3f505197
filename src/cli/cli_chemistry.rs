use super::cli_main::{get_user_input, prompt, prompt_f64};
use crate::Stoichiometry::molmass::{FormulaParser, render_formula};
use crate::engine::NutriEngine;
use crate::errors::Outcome;
use std::io::{self, Write};

pub fn chemistry_menu(engine: &NutriEngine) {
    loop {
        println!("\n=== Chemistry ===");
        println!("1. Molar mass and composition");
        println!("2. Balance an equation");
        println!("3. Molar solution");
        println!("0. Back to main menu");
        print!("Enter your choice: ");
        let _ = io::stdout().flush();

        let choice = get_user_input();
        match choice.trim() {
            "1" => molar_mass(engine),
            "2" => balance(engine),
            "3" => molar_solution(engine),
            "0" | "" => break,
            _ => println!("Invalid choice. Please try again."),
        }
    }
}

fn molar_mass(engine: &NutriEngine) {
    let formula = prompt("Formula (e.g. Ca(NO3)2·4H2O)");
    let parser = FormulaParser::new(&engine.tables().weights);
    match parser
        .parse(&formula)
        .and_then(|composition| Ok((parser.molar_mass(&composition)?, composition)))
    {
        Ok((mass, composition)) => {
            println!("{} = {}", formula, render_formula(&composition));
            for (element, count) in &composition {
                println!("  {}: {}", element, count);
            }
            println!("molar mass: {:.4} g/mol", mass);
        }
        Err(e) => println!("{}", e),
    }
}

fn balance(engine: &NutriEngine) {
    let equation = prompt("Equation (e.g. NH3 + O2 -> NO + H2O)");
    match engine.balance_equation(&equation) {
        Outcome::Success(balanced) => balanced.pretty_print(),
        Outcome::Failure { message, .. } => println!("{}", message),
    }
}

fn molar_solution(engine: &NutriEngine) {
    let formula = prompt("Formula");
    let Some(molarity) = prompt_f64("Molarity, mol/L") else {
        return;
    };
    let Some(volume_l) = prompt_f64("Volume, L") else {
        return;
    };
    match engine.solution_molar(&formula, molarity, volume_l) {
        Outcome::Success(solution) => println!(
            "{:.3} g of {} ({} g/mol) for {} L of {} M solution",
            solution.grams, solution.formula, solution.molar_mass, solution.volume_l, solution.molarity
        ),
        Outcome::Failure { message, .. } => println!("{}", message),
    }
}
