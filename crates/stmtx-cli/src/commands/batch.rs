//! Batch processing command for multiple located documents.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use futures_util::stream::{self, StreamExt};
use glob::glob;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use stmtx_core::extract::PeriodSeries;
use stmtx_core::{
    CanonicalField, DegradeReason, Document, DocumentExtractor, DocumentReport, ExtractMode,
    FieldSet, JsonDirStore, PlaceholderSource, ReportKey, ResultStore, RuleBasedExtractor,
    RuleTable, UpsertOutcome,
};

use super::extract::{format_report_csv, format_report_json, format_report_text, read_document};
use super::{load_config, DictionaryArg, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Result store directory; reports are upserted and prior years feed growth rates
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Wall-clock budget per document, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Label dictionary (overrides the config)
    #[arg(short, long, value_enum)]
    dictionary: Option<DictionaryArg>,

    /// Substitute degraded placeholder results for failed documents
    #[arg(long)]
    degrade: bool,

    /// Report every period column of the matched rows
    #[arg(long)]
    all_periods: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    report: Option<DocumentReport>,
    periods: Option<PeriodSeries>,
    stored: Option<UpsertOutcome>,
    error: Option<String>,
    processing_time_ms: u64,
}

impl ProcessResult {
    fn failed(path: PathBuf, error: String, processing_time_ms: u64) -> Self {
        Self {
            path,
            report: None,
            periods: None,
            stored: None,
            error: Some(error),
            processing_time_ms,
        }
    }
}

/// A successfully processed document.
struct Processed {
    report: DocumentReport,
    periods: Option<PeriodSeries>,
    stored: Option<UpsertOutcome>,
}

/// Shared, read-only state of the worker pool.
struct Worker {
    extractor: RuleBasedExtractor,
    store: Option<JsonDirStore>,
    timeout: Option<Duration>,
    degrade: bool,
    mode: ExtractMode,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(dictionary) = args.dictionary {
        config.extraction.dictionary = dictionary.into();
    }
    if args.all_periods {
        config.extraction.mode = ExtractMode::AllPeriods;
    }

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            ext.eq_ignore_ascii_case("json")
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} documents to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    // One rule table for every worker
    let table = Arc::new(RuleTable::from_config(&config)?);
    let worker = Arc::new(Worker {
        extractor: RuleBasedExtractor::with_rule_table(table, &config),
        store: args.store.as_ref().map(JsonDirStore::open).transpose()?,
        timeout: args.timeout_secs.map(Duration::from_secs),
        degrade: args.degrade,
        mode: config.extraction.mode,
    });

    let multi_progress = MultiProgress::new();
    let overall_pb = multi_progress.add(ProgressBar::new(files.len() as u64));
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents")
            .unwrap()
            .progress_chars("=>-"),
    );

    // Each entity's years run in order inside one task so growth rates
    // see the prior year regardless of the worker count
    let mut results = Vec::new();
    let mut entities: BTreeMap<String, Vec<(PathBuf, Document)>> = BTreeMap::new();
    for path in files {
        let file_start = Instant::now();
        match read_document(&path) {
            Ok(document) => entities
                .entry(document.entity_id.clone())
                .or_default()
                .push((path, document)),
            Err(e) => {
                let ms = file_start.elapsed().as_millis() as u64;
                let result = ProcessResult::failed(path, e.to_string(), ms);
                overall_pb.inc(1);
                check_failure(&result, args.continue_on_error, &overall_pb)?;
                results.push(result);
            }
        }
    }
    for documents in entities.values_mut() {
        documents.sort_by_key(|(_, document)| (document.fiscal_year, document.period));
    }
    debug!("{} entities to process", entities.len());

    let mut tasks = stream::iter(entities.into_values())
        .map(|documents| {
            let worker = Arc::clone(&worker);
            async move { process_entity(documents, worker).await }
        })
        .buffer_unordered(args.jobs.max(1));

    while let Some(batch) = tasks.next().await {
        for result in batch {
            overall_pb.inc(1);
            check_failure(&result, args.continue_on_error, &overall_pb)?;
            results.push(result);
        }
    }

    overall_pb.finish_with_message("Complete");

    // Completion order depends on scheduling
    results.sort_by(|a, b| a.path.cmp(&b.path));

    let successful: Vec<_> = results.iter().filter(|r| r.report.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    if let Some(output_dir) = &args.output_dir {
        for result in &successful {
            let Some(report) = &result.report else {
                continue;
            };

            let extension = match args.format {
                OutputFormat::Json => "json",
                OutputFormat::Csv => "csv",
                OutputFormat::Text => "txt",
            };
            let output_path = output_dir.join(format!("{}.{}", report.key, extension));

            let content = match args.format {
                OutputFormat::Json => format_report_json(report, result.periods.as_ref())?,
                OutputFormat::Csv => format_report_csv(report, result.periods.as_ref())?,
                OutputFormat::Text => format_report_text(report, result.periods.as_ref(), true),
            };

            fs::write(&output_path, content)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let degraded = successful
        .iter()
        .filter(|r| r.report.as_ref().is_some_and(|rep| !rep.decision.is_accept()))
        .count();

    println!();
    println!(
        "{} Processed {} documents in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful ({} degraded), {} failed",
        style(successful.len()).green(),
        style(degraded).yellow(),
        style(failed.len()).red()
    );

    if worker.store.is_some() {
        let count = |outcome: UpsertOutcome| results.iter().filter(|r| r.stored == Some(outcome)).count();
        println!(
            "   store: {} inserted, {} updated, {} unchanged",
            count(UpsertOutcome::Inserted),
            count(UpsertOutcome::Updated),
            count(UpsertOutcome::Unchanged)
        );
    }

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn check_failure(result: &ProcessResult, continue_on_error: bool, pb: &ProgressBar) -> anyhow::Result<()> {
    let Some(error_msg) = &result.error else {
        return Ok(());
    };

    if continue_on_error {
        warn!("Failed to process {}: {}", result.path.display(), error_msg);
        Ok(())
    } else {
        error!("Failed to process {}: {}", result.path.display(), error_msg);
        pb.abandon();
        anyhow::bail!("Processing failed: {}", error_msg)
    }
}

/// Process one entity's documents oldest first; each report becomes the prior of the next year.
async fn process_entity(documents: Vec<(PathBuf, Document)>, worker: Arc<Worker>) -> Vec<ProcessResult> {
    let mut seen: BTreeMap<ReportKey, FieldSet> = BTreeMap::new();
    let mut results = Vec::with_capacity(documents.len());

    for (path, document) in documents {
        let file_start = Instant::now();
        let outcome = process_document(document, &worker, &seen).await;
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(processed) => {
                seen.insert(processed.report.key.clone(), processed.report.fields.clone());
                ProcessResult {
                    path,
                    report: Some(processed.report),
                    periods: processed.periods,
                    stored: processed.stored,
                    error: None,
                    processing_time_ms,
                }
            }
            Err(e) => ProcessResult::failed(path, e.to_string(), processing_time_ms),
        };
        results.push(result);
    }

    results
}

async fn process_document(
    document: Document,
    worker: &Arc<Worker>,
    seen: &BTreeMap<ReportKey, FieldSet>,
) -> anyhow::Result<Processed> {
    let key = ReportKey::new(document.entity_id.clone(), document.fiscal_year, document.period);

    // Earlier years of this batch take precedence over the store
    let prior = match (seen.get(&key.prior_year()), &worker.store) {
        (Some(fields), _) => Some(fields.clone()),
        (None, Some(store)) => store.prior_fields(&key)?,
        (None, None) => None,
    };

    let task = {
        let worker = Arc::clone(worker);
        tokio::task::spawn_blocking(move || {
            let report = worker
                .extractor
                .extract_document(&document, prior.as_ref())
                .map_err(|e| e.to_string())?;
            let periods = match worker.mode {
                ExtractMode::AllPeriods => Some(worker.extractor.period_series(&document, &report)),
                ExtractMode::Latest => None,
            };
            Ok::<_, String>((report, periods))
        })
    };

    // An expired budget counts as a document format failure
    let extracted = match worker.timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined?,
            Err(_) => Err(format!("extraction timed out after {:?}", limit)),
        },
        None => task.await?,
    };

    let fallback = worker.extractor.fallback();
    let (report, periods) = match extracted {
        Ok((report, periods)) if report.decision.is_accept() || !worker.degrade => (report, periods),
        Ok((report, periods)) => (report.into_degraded(fallback.degraded_confidence_cap()), periods),
        Err(reason) if worker.degrade => {
            warn!("{}: {}; substituting placeholder", key, reason);
            let report = fallback.substitute(key, DegradeReason::UpstreamFailed, &PlaceholderSource);
            (report, None)
        }
        Err(reason) => anyhow::bail!(reason),
    };

    let stored = match &worker.store {
        Some(store) => Some(store.upsert(&report)?),
        None => None,
    };

    Ok(Processed { report, periods, stored })
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "entity_id",
        "fiscal_year",
        "period",
        "decision",
        "tier",
        "confidence",
        "revenue",
        "net_profit",
        "total_assets",
        "issues",
        "stored",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result.path.file_name().and_then(|s| s.to_str()).unwrap_or("");

        if let Some(report) = &result.report {
            let value = |field: CanonicalField| report.fields.get(field).map(|v| v.to_string()).unwrap_or_default();
            let tier = serde_json::to_value(report.tier)?;

            wtr.write_record([
                filename,
                "success",
                &report.key.entity_id,
                &report.key.fiscal_year.to_string(),
                report.key.period.as_str(),
                &report.decision.to_string(),
                tier.as_str().unwrap_or_default(),
                &format!("{:.3}", report.confidence),
                &value(CanonicalField::Revenue),
                &value(CanonicalField::NetProfit),
                &value(CanonicalField::TotalAssets),
                &report.issues().count().to_string(),
                &result.stored.map(|s| format!("{:?}", s).to_lowercase()).unwrap_or_default(),
                &result.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
