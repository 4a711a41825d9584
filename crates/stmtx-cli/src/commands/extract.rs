//! Extract command - extract the statements of a single located document.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info, warn};

use stmtx_core::extract::PeriodSeries;
use stmtx_core::{
    Document, DocumentExtractor, DocumentReport, ExtractMode, FieldSet, PlaceholderSource,
    RuleBasedExtractor, StatementType,
};

use super::{load_config, DictionaryArg, OutputFormat};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Located document (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Report of the same period one year earlier (JSON), for growth rates
    #[arg(long)]
    prior: Option<PathBuf>,

    /// Label dictionary (overrides the config)
    #[arg(short, long, value_enum)]
    dictionary: Option<DictionaryArg>,

    /// Report every period column of the matched rows
    #[arg(long)]
    all_periods: bool,

    /// Emit a degraded placeholder result instead of failing
    #[arg(long)]
    degrade: bool,

    /// Show per-statement confidence and issues in text output
    #[arg(long)]
    show_confidence: bool,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(dictionary) = args.dictionary {
        config.extraction.dictionary = dictionary.into();
    }
    if args.all_periods {
        config.extraction.mode = ExtractMode::AllPeriods;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let document = read_document(&args.input)?;
    let prior = args.prior.as_deref().map(read_prior).transpose()?;

    let extractor = RuleBasedExtractor::from_config(&config)?;
    let report = if args.degrade {
        extractor.extract_or_degrade(&document, prior.as_ref(), &PlaceholderSource)
    } else {
        extractor.extract_document(&document, prior.as_ref())?
    };

    if !report.decision.is_accept() {
        warn!("{}: {}", report.key, report.decision);
    }

    let series = match config.extraction.mode {
        ExtractMode::AllPeriods => Some(extractor.period_series(&document, &report)),
        ExtractMode::Latest => None,
    };

    let content = match args.format {
        OutputFormat::Json => format_report_json(&report, series.as_ref())?,
        OutputFormat::Csv => format_report_csv(&report, series.as_ref())?,
        OutputFormat::Text => format_report_text(&report, series.as_ref(), args.show_confidence),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &content)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", content);
    }

    info!("Extracted {} in {:?}", report.key, start.elapsed());

    Ok(())
}

/// Parse a located document from a JSON file.
pub fn read_document(path: &Path) -> anyhow::Result<Document> {
    let content = fs::read_to_string(path)?;
    let document = Document::from_json(&content)
        .map_err(|e| anyhow::anyhow!("Invalid document {}: {}", path.display(), e))?;
    debug!(
        "Loaded {} ({} tables) from {}",
        document.entity_id,
        document.tables.len(),
        path.display()
    );
    Ok(document)
}

fn read_prior(path: &Path) -> anyhow::Result<FieldSet> {
    let content = fs::read_to_string(path)?;
    let report: DocumentReport = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid prior report {}: {}", path.display(), e))?;
    Ok(report.fields)
}

pub fn format_report_json(report: &DocumentReport, series: Option<&PeriodSeries>) -> anyhow::Result<String> {
    let content = match series {
        Some(series) => serde_json::to_string_pretty(&serde_json::json!({
            "report": report,
            "periods": series,
        }))?,
        None => serde_json::to_string_pretty(report)?,
    };
    Ok(content)
}

/// One row per field, ratio and (optionally) period value.
pub fn format_report_csv(report: &DocumentReport, series: Option<&PeriodSeries>) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "section",
        "name",
        "period",
        "value",
        "table_id",
        "row_index",
        "label",
        "rule",
        "priority",
    ])?;

    for statement in StatementType::ALL {
        for field in statement.fields() {
            let value = report.fields.get(field).map(|v| v.to_string()).unwrap_or_default();
            let origin = report.statement(statement).and_then(|s| s.provenance(field));

            match origin {
                Some(origin) => wtr.write_record([
                    statement.as_str(),
                    field.as_str(),
                    "",
                    &value,
                    &origin.source_row.table_id,
                    &origin.source_row.row_index.to_string(),
                    &origin.source_row.label,
                    &origin.rule_used.pattern,
                    &origin.rule_used.priority.to_string(),
                ])?,
                None => wtr.write_record([statement.as_str(), field.as_str(), "", &value, "", "", "", "", ""])?,
            }
        }
    }

    for (ratio, value) in report.ratios.iter() {
        let value = value.map(|v| v.to_string()).unwrap_or_default();
        wtr.write_record(["ratio", ratio.as_str(), "", &value, "", "", "", "", ""])?;
    }

    if let Some(series) = series {
        for (field, values) in series {
            for period in values {
                wtr.write_record([
                    "period",
                    field.as_str(),
                    &period.period,
                    &period.value.to_string(),
                    "",
                    "",
                    "",
                    "",
                    "",
                ])?;
            }
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

pub fn format_report_text(report: &DocumentReport, series: Option<&PeriodSeries>, show_confidence: bool) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Report:     {}", report.key));
    if let Some(date) = report.report_date {
        lines.push(format!("Date:       {}", date));
    }
    lines.push(format!("Decision:   {}", report.decision));
    lines.push(format!("Confidence: {:.1}%", report.confidence * 100.0));
    if report.tier == stmtx_core::ResultTier::Degraded {
        lines.push(format!("Tier:       {}", style("degraded").yellow()));
    }

    for statement in StatementType::ALL {
        lines.push(String::new());
        let Some(result) = report.statement(statement) else {
            lines.push(format!("{} {}", style(statement).bold(), style("(not found)").dim()));
            continue;
        };

        if show_confidence {
            lines.push(format!(
                "{} (confidence {:.1}%, unit x{})",
                style(statement).bold(),
                result.confidence() * 100.0,
                result.unit_multiplier()
            ));
        } else {
            lines.push(style(statement).bold().to_string());
        }

        for field in statement.fields() {
            if let Some(value) = result.get(field) {
                let label = result
                    .provenance(field)
                    .map(|origin| format!("  ({})", origin.source_row.label))
                    .unwrap_or_default();
                lines.push(format!("  {:<32} {:>20}{}", field.as_str(), value, label));
            }
        }

        if show_confidence {
            for issue in result.issues() {
                lines.push(format!("  {} {}", style("!").yellow(), issue));
            }
        }
    }

    let ratios: Vec<_> = report.ratios.iter().filter_map(|(r, v)| v.map(|v| (r, v))).collect();
    if !ratios.is_empty() {
        lines.push(String::new());
        lines.push(style("ratios").bold().to_string());
        for (ratio, value) in ratios {
            lines.push(format!("  {:<32} {:>20}", ratio.as_str(), value));
        }
    }

    if let Some(series) = series.filter(|s| !s.is_empty()) {
        lines.push(String::new());
        lines.push(style("periods").bold().to_string());
        for (field, values) in series {
            let cells: Vec<String> = values.iter().map(|p| format!("{}={}", p.period, p.value)).collect();
            lines.push(format!("  {:<32} {}", field.as_str(), cells.join("  ")));
        }
    }

    if show_confidence && !report.cross_issues.is_empty() {
        lines.push(String::new());
        for issue in &report.cross_issues {
            lines.push(format!("{} {}", style("!").yellow(), issue));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use stmtx_core::{CandidateTable, ReportPeriod};

    fn sample() -> (Document, RuleBasedExtractor) {
        let document = Document::new("ACME", 2024, ReportPeriod::Annual).with_table(
            CandidateTable::new("t1")
                .with_statement(StatementType::Income)
                .with_preceding_text("(in thousands)")
                .with_headers(["", "2024", "2023"])
                .with_row(["Total revenues", "1,000", "900"])
                .with_row(["Net income", "100", "80"]),
        );
        let extractor = RuleBasedExtractor::from_config(&Default::default()).unwrap();
        (document, extractor)
    }

    #[test]
    fn test_csv_lists_fields_and_ratios() {
        let (document, extractor) = sample();
        let report = extractor.extract_document(&document, None).unwrap();

        let csv = format_report_csv(&report, None).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("section,name,period,value,table_id,row_index,label,rule,priority")
        );
        assert!(csv.contains("income,revenue,,1000000,t1,0,Total revenues,"));
        assert!(csv.contains("ratio,net_margin,,0.1"));
    }

    #[test]
    fn test_json_with_periods() {
        let (document, extractor) = sample();
        let report = extractor.extract_document(&document, None).unwrap();
        let series = extractor.period_series(&document, &report);

        let json = format_report_json(&report, Some(&series)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["periods"]["revenue"][1]["period"], "2023");
        assert_eq!(value["report"]["key"]["entity_id"], "ACME");
    }

    #[test]
    fn test_text_marks_missing_statements() {
        let (document, extractor) = sample();
        let report = extractor.extract_document(&document, None).unwrap();

        let text = format_report_text(&report, None, true);
        assert!(text.contains("Report:     ACME_2024_annual"));
        assert!(text.contains("revenue"));
        assert!(text.contains("(not found)"));
    }
}
