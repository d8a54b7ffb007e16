//! List command - describe the available targets

use anyhow::Result;
use appforge_build::Target;
use colored::*;
use serde_json::{json, Value};

/// Run the list command
pub fn run(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&targets_json())?);
        return Ok(());
    }

    let width = Target::ALL
        .iter()
        .map(|t| t.name().len())
        .max()
        .unwrap_or(0);
    for target in Target::ALL {
        println!(
            "  {}  {}",
            format!("{:<width$}", target.name(), width = width).cyan().bold(),
            describe(target)
        );
    }
    Ok(())
}

/// Description line, with composition for composite targets
fn describe(target: Target) -> String {
    if target.is_composite() {
        let steps: Vec<&str> = target.steps().iter().map(Target::name).collect();
        format!("{} ({})", target.description(), steps.join(", "))
    } else {
        target.description().to_string()
    }
}

fn targets_json() -> Value {
    Value::Array(
        Target::ALL
            .iter()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "steps": t.steps().iter().map(Target::name).collect::<Vec<_>>(),
                })
            })
            .collect(),
    )
}
