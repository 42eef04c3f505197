use super::cli_main::{get_user_input, prompt, prompt_f64};
use crate::Dosing::dose_output::DosePayload;
use crate::Dosing::profiles::ProfileSource;
use crate::Dosing::water_analysis::WaterSample;
use crate::engine::NutriEngine;
use crate::errors::Outcome;
use std::io::{self, Write};

pub fn dosing_menu(engine: &NutriEngine) {
    loop {
        println!("\n=== Dosing ===");
        println!("1. Dose for a crop profile");
        println!("2. Water analysis");
        println!("3. Deficiency correction plan");
        println!("4. Dose payload as JSON");
        println!("0. Back to main menu");
        print!("Enter your choice: ");
        let _ = io::stdout().flush();

        let choice = get_user_input();
        match choice.trim() {
            "1" => dose(engine, false),
            "2" => water_analysis(engine),
            "3" => correction_plan(engine),
            "4" => dose(engine, true),
            "0" | "" => break,
            _ => println!("Invalid choice. Please try again."),
        }
    }
}

fn choose_profile(engine: &NutriEngine) -> Option<String> {
    let names = engine.tables().profiles.profile_names();
    for (i, name) in names.iter().enumerate() {
        println!("{}. {}", i + 1, name);
    }
    let answer = prompt("Profile number or name");
    match answer.parse::<usize>() {
        Ok(i) if i >= 1 && i <= names.len() => Some(names[i - 1].clone()),
        _ if !answer.is_empty() => Some(answer),
        _ => None,
    }
}

fn dose(engine: &NutriEngine, as_json: bool) {
    let Some(profile) = choose_profile(engine) else {
        return;
    };
    let Some(volume_l) = prompt_f64("Tank volume, L") else {
        return;
    };
    let outcome = engine.calculate_dose(&profile, volume_l, None);
    if as_json {
        match serde_json::to_string_pretty(&DosePayload::from(outcome)) {
            Ok(json) => println!("{}", json),
            Err(e) => println!("{}", e),
        }
        return;
    }
    match outcome {
        Outcome::Success(report) => report.pretty_print(),
        Outcome::Failure { message, .. } => println!("{}", message),
    }
}

fn water_analysis(engine: &NutriEngine) {
    println!("Enter dissolved compounds as 'formula ppm', an empty line ends the list");
    let mut samples = Vec::new();
    loop {
        let line = prompt("compound");
        if line.is_empty() {
            break;
        }
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next().map(|p| p.parse::<f64>())) {
            (Some(formula), Some(Ok(ppm))) => samples.push(WaterSample::new(formula, ppm)),
            _ => println!("expected 'formula ppm', e.g. 'KNO3 250'"),
        }
    }
    if samples.is_empty() {
        return;
    }
    match engine.analyze_water(&samples) {
        Outcome::Success(analysis) => analysis.pretty_print(),
        Outcome::Failure { message, .. } => println!("{}", message),
    }
}

fn correction_plan(engine: &NutriEngine) {
    for symptom in engine.tables().deficiency_rules.symptoms() {
        println!("  {}", symptom);
    }
    let symptom = prompt("Symptom");
    let Some(volume_l) = prompt_f64("Tank volume, L") else {
        return;
    };
    match engine.build_correction_plan(&symptom, volume_l) {
        Outcome::Success(plan) => plan.pretty_print(),
        Outcome::Failure { message, .. } => println!("{}", message),
    }
}
