//! Rules command - inspect the prioritized rule table.

use std::sync::Arc;

use clap::Args;
use console::style;

use stmtx_core::{LineItemMatcher, RuleSpec, RuleTable, StatementType};

use super::{load_config, DictionaryArg, StatementArg};

/// Arguments for the rules command.
#[derive(Args)]
pub struct RulesArgs {
    /// Label dictionary (overrides the config)
    #[arg(short, long, value_enum)]
    dictionary: Option<DictionaryArg>,

    /// Only list rules for fields of this statement
    #[arg(short, long, value_enum)]
    statement: Option<StatementArg>,

    /// Show which rule a row label matches instead of listing rules
    #[arg(short = 'm', long = "match", value_name = "LABEL")]
    label: Option<String>,

    /// Print rules as JSON (loadable as `rules.extra`)
    #[arg(long)]
    json: bool,
}

pub async fn run(args: RulesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dictionary) = args.dictionary {
        config.extraction.dictionary = dictionary.into();
    }

    let table = Arc::new(RuleTable::from_config(&config)?);
    let statement = args.statement.map(StatementType::from);

    if let Some(label) = &args.label {
        return show_match(LineItemMatcher::new(table), label, statement);
    }

    let rules: Vec<_> = match statement {
        Some(statement) => table.for_statement(statement).collect(),
        None => table.iter().collect(),
    };

    if args.json {
        let specs: Vec<RuleSpec> = rules
            .iter()
            .map(|rule| {
                RuleSpec::new(rule.pattern(), rule.field())
                    .excluding(rule.excluded_terms().iter().map(|t| t.to_string()))
                    .with_priority(rule.priority())
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&specs)?);
        return Ok(());
    }

    println!(
        "{:>8}  {:<30} {:<40} {}",
        style("priority").bold(),
        style("field").bold(),
        style("pattern").bold(),
        style("excluded").bold()
    );
    for rule in &rules {
        let excluded: Vec<String> = rule.excluded_terms().iter().map(|t| t.to_string()).collect();
        println!(
            "{:>8}  {:<30} {:<40} {}",
            rule.priority(),
            rule.field().as_str(),
            rule.pattern(),
            excluded.join(", ")
        );
    }
    println!();
    println!("{} {} rules", style("ℹ").blue(), rules.len());

    Ok(())
}

fn show_match(matcher: LineItemMatcher, label: &str, statement: Option<StatementType>) -> anyhow::Result<()> {
    let matched = match statement {
        Some(statement) => matcher.match_in(label, statement),
        None => matcher.match_label(label),
    };

    let Some(matched) = matched else {
        anyhow::bail!("No rule matches label: {}", label);
    };

    println!(
        "{} {} -> {} (pattern '{}', priority {})",
        style("✓").green(),
        label,
        matched.field.as_str(),
        matched.rule.pattern(),
        matched.rule.priority()
    );

    Ok(())
}
