use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use survey_facets::aggregate::{self, RankEntry, RankMetric, Summary, TimeSeries};
use survey_facets::config::{self, EngineConfig, RankScope, SpeciesKey};
use survey_facets::facets::{FacetDomain, FacetRegistry};
use survey_facets::filter;
use survey_facets::metrics::METRICS;
use survey_facets::normalizer::{self, NormalizeOutcome};
use survey_facets::parallel::{self, ParallelProcessor};
use survey_facets::parsers::csv_parser;
use survey_facets::query::{self, QueryFilters};
use survey_facets::report::DatasetReport;
use survey_facets::utils::parse_date;
use survey_facets::validation::AdmissionPolicy;

#[derive(Parser, Debug)]
#[command(name = "survey_facets")]
#[command(about = "Faceted filtering and summaries for bird survey observations", long_about = None)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true, env = "SURVEY_FACETS_CONFIG")]
    config: Option<PathBuf>,

    /// Drop rows whose initial_three_min_cnt is missing or unparsable
    #[arg(long, global = true)]
    require_count: bool,

    /// Single-character CSV delimiter
    #[arg(long, global = true)]
    delimiter: Option<String>,

    /// Rank and filter species by "Common Name (Scientific Name)"
    #[arg(long, global = true)]
    full_names: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the facets a file supports and their domains
    Facets {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Filter a file and print summary, daily series and ranking
    Query(QueryArgs),
    /// Summary reports for many files, processed in parallel
    Report {
        /// Files, directories or glob patterns
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long)]
        json: bool,
        /// Worker threads (defaults to the number of CPUs)
        #[arg(long)]
        workers: Option<usize>,
    },
}

#[derive(Args, Debug)]
struct QueryArgs {
    file: PathBuf,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    species: Option<String>,
    #[arg(long)]
    full_name: Option<String>,
    #[arg(long)]
    interval: Option<String>,
    #[arg(long)]
    id_method: Option<String>,
    #[arg(long)]
    site: Option<String>,
    #[arg(long)]
    observer: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    temp_min: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    temp_max: Option<f64>,
    #[arg(long)]
    humidity_min: Option<f64>,
    #[arg(long)]
    humidity_max: Option<f64>,
    /// First date to include
    #[arg(long)]
    from: Option<String>,
    /// Last date to include
    #[arg(long)]
    to: Option<String>,
    #[arg(long)]
    top_n: Option<usize>,
    #[arg(long, value_enum)]
    metric: Option<MetricArg>,
    /// Rank only the selected rows instead of the whole file
    #[arg(long)]
    rank_filtered: bool,
    /// Zero-fill the daily series between the first and last selected date
    #[arg(long)]
    zero_fill: bool,
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MetricArg {
    TotalCount,
    Occurrences,
}

impl From<MetricArg> for RankMetric {
    fn from(metric: MetricArg) -> Self {
        match metric {
            MetricArg::TotalCount => RankMetric::TotalCount,
            MetricArg::Occurrences => RankMetric::Occurrences,
        }
    }
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    rows_loaded: usize,
    rows_dropped: usize,
    summary: Summary,
    series: &'a TimeSeries,
    ranking: &'a [RankEntry],
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match &cli.command {
        Command::Facets { file, json } => run_facets(file, *json, &config),
        Command::Query(args) => run_query(args, &config),
        Command::Report {
            paths,
            json,
            workers,
        } => run_report(paths, *json, *workers, &config),
    }
}

fn resolve_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if cli.require_count {
        config.admission = AdmissionPolicy::RequireCount;
    }
    if let Some(delimiter) = &cli.delimiter {
        config.delimiter = delimiter.clone();
    }
    if cli.full_names {
        config.species_key = SpeciesKey::FullName;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn load_dataset(path: &Path, config: &EngineConfig) -> Result<NormalizeOutcome> {
    let loaded = csv_parser::read_csv(path, config.delimiter_byte()?)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let outcome = normalizer::normalize(&loaded.records, &config.normalize_options())
        .with_context(|| format!("Failed to normalize {}", path.display()))?;
    if outcome.dataset.is_empty() {
        log::warn!("No rows of {} survived admission", path.display());
    }
    Ok(outcome)
}

fn run_facets(file: &Path, json: bool, config: &EngineConfig) -> Result<()> {
    let outcome = load_dataset(file, config)?;
    let registry = FacetRegistry::from_dataset(&outcome.dataset);

    if json {
        println!("{}", serde_json::to_string_pretty(&registry)?);
        return Ok(());
    }

    println!(
        "{}: {} rows ({} dropped)",
        file.display(),
        outcome.dataset.len(),
        outcome.dropped
    );
    for facet in registry.iter() {
        let marker = if facet.is_inert() { " (no values)" } else { "" };
        println!("  {:<16} {:?}{}", facet.id.as_str(), facet.kind, marker);
        match &facet.domain {
            FacetDomain::Values { values } => println!("      {} values: {}", values.len(), preview(values)),
            FacetDomain::Years { years } => println!("      years: {:?}", years),
            FacetDomain::Numeric { min, max } => println!("      range: {} .. {}", min, max),
            FacetDomain::Dates { start, end } => println!("      dates: {} .. {}", start, end),
        }
    }
    Ok(())
}

fn preview(values: &[String]) -> String {
    const SHOWN: usize = 8;
    let head = values.iter().take(SHOWN).cloned().collect::<Vec<_>>().join(", ");
    if values.len() > SHOWN {
        format!("{}, ...", head)
    } else {
        head
    }
}

fn query_filters(args: &QueryArgs) -> Result<QueryFilters> {
    let date = |text: &Option<String>| -> Result<Option<NaiveDate>> {
        text.as_deref()
            .map(|t| parse_date(t).map_err(anyhow::Error::msg))
            .transpose()
    };
    Ok(QueryFilters {
        year: args.year,
        species: args.species.clone(),
        full_name: args.full_name.clone(),
        interval: args.interval.clone(),
        id_method: args.id_method.clone(),
        site: args.site.clone(),
        observer: args.observer.clone(),
        temp_min: args.temp_min,
        temp_max: args.temp_max,
        humidity_min: args.humidity_min,
        humidity_max: args.humidity_max,
        from: date(&args.from).context("Invalid --from date")?,
        to: date(&args.to).context("Invalid --to date")?,
    })
}

fn run_query(args: &QueryArgs, config: &EngineConfig) -> Result<()> {
    let top_n = args.top_n.unwrap_or(config.top_n);
    if top_n == 0 {
        bail!("--top-n must be greater than 0");
    }
    let metric = args.metric.map(RankMetric::from).unwrap_or(config.rank_metric);

    let outcome = load_dataset(&args.file, config)?;
    let dataset = &outcome.dataset;
    let registry = FacetRegistry::from_dataset(dataset);
    let filters = query_filters(args)?;
    let selection = query::build_selection(&filters, config.species_key, &registry);

    let view = filter::apply_checked(&registry, dataset, &selection)
        .context("Selection refers to a facet this file does not support")?;
    info!("{} of {} rows match the selection", view.len(), dataset.len());

    let summary = aggregate::summarize(&view);
    let mut series = aggregate::daily_series(&view);
    if args.zero_fill {
        if let (Some(first), Some(last)) = (series.points().first(), series.points().last()) {
            series = series.zero_filled(first.date, last.date);
        }
    }
    let scope = if args.rank_filtered {
        RankScope::Selection
    } else {
        config.rank_scope
    };
    let ranking = query::ranking(dataset, &view, scope, config.species_key.field(), metric, top_n);

    if args.json {
        let output = QueryOutput {
            rows_loaded: dataset.len(),
            rows_dropped: outcome.dropped,
            summary,
            series: &series,
            ranking: &ranking,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Observations: {}", summary.count);
    println!("Total initial three-minute count: {}", summary.total);
    println!("\nDaily totals:");
    for point in series.points() {
        println!("  {}  {}", point.date, point.total);
    }
    println!("\nTop {} species ({:?}, {:?}):", top_n, metric, scope);
    for (rank, entry) in ranking.iter().enumerate() {
        println!("  {:>2}. {:<40} {}", rank + 1, entry.key, entry.value);
    }
    Ok(())
}

fn run_report(
    inputs: &[String],
    json: bool,
    workers: Option<usize>,
    config: &EngineConfig,
) -> Result<()> {
    let start = Instant::now();
    let files = parallel::expand_inputs(inputs).context("Failed to expand input paths")?;
    if files.is_empty() {
        bail!("No input files matched {:?}", inputs);
    }

    let processor = match workers {
        Some(n) => ParallelProcessor::with_workers(n),
        None => ParallelProcessor::new(),
    };
    let results = processor.process_files(files, config);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            println!("\n=== {} ===", result.file_path);
            match (&result.report, &result.error) {
                (Some(report), _) => print_report(report),
                (None, Some(error)) => println!("  failed: {}", error),
                (None, None) => println!("  no report"),
            }
        }
    }

    METRICS.lock().print_summary();
    info!("Report run finished in {:.2?}", start.elapsed());

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    if failed == results.len() {
        bail!("All {} input files failed", failed);
    }
    Ok(())
}

fn print_report(report: &DatasetReport) {
    println!(
        "Shape: {} rows x {} columns ({} dropped)",
        report.rows, report.columns, report.dropped
    );
    println!("Total initial three-minute count: {}", report.summary.total);

    println!("\nMissing values:");
    for (column, missing) in &report.missing_values {
        println!("  {:<24} {}", column.as_str(), missing);
    }

    println!("\nTop species ({:?}):", report.species_metric);
    for entry in &report.top_species {
        println!("  {:<40} {}", entry.key, entry.value);
    }

    if let Some(richness) = &report.species_richness {
        println!("\nSpecies richness by site:");
        for site in richness {
            println!("  {:<32} {}", site.site_name, site.species);
        }
    }

    if let Some(observers) = &report.top_observers {
        println!("\nTop observers:");
        for entry in observers {
            println!("  {:<32} {}", entry.key, entry.value);
        }
    }

    println!("\nMonthly totals:");
    for row in &report.monthly_trend {
        let cells: Vec<String> = row.months.iter().map(|c| format!("{:>5}", c)).collect();
        println!("  {} {}", row.year, cells.join(" "));
    }

    match &report.weather_correlation {
        Some(matrix) => {
            println!("\nWeather correlation ({} rows):", matrix.samples);
            for (name, row) in matrix.variables.iter().zip(matrix.values.iter()) {
                let cells: Vec<String> = row
                    .iter()
                    .map(|v| v.map_or_else(|| "    -".to_string(), |v| format!("{:>5.2}", v)))
                    .collect();
                println!("  {:<24} {}", name, cells.join(" "));
            }
        }
        None => println!("\nWeather correlation: unavailable"),
    }
}
