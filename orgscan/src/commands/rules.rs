// orgscan/src/commands/rules.rs
//
// USE CASE: Show the score rule table.

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};

use orgscan_core::domain::scoring::{ScoreRule, ScoringEngine};

pub fn execute(id: Option<u32>) -> anyhow::Result<()> {
    let engine = ScoringEngine::default();
    let rules: Vec<&ScoreRule> = match id {
        Some(id) => match engine.get_rule(id) {
            Ok(rule) => vec![rule],
            Err(e) => {
                // Rendered through miette so the help text reaches the user.
                eprintln!("{:?}", miette::Report::new(e));
                std::process::exit(1);
            }
        },
        None => engine.get_all_rules().iter().collect(),
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Id", "Description", "Field", "Applies to"]);
    for rule in rules {
        let types: Vec<&str> = rule.applicable_types.iter().map(|t| t.as_str()).collect();
        table.add_row(vec![
            rule.id.to_string(),
            rule.description.to_string(),
            rule.bad_field.to_string(),
            types.join(", "),
        ]);
    }
    println!("{table}");
    Ok(())
}
