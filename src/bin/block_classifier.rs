use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use url::Url;

use block_classifier::extractors::survey_groups;
use block_classifier::{
    run_pass, run_pass_concurrent, AsyncHttpClassifier, HttpClassifier, HttpDriver, MarkupQuery,
    PageDriver, PassConfig, Settings, StaticPage, TagName,
};

#[derive(Parser)]
#[command(
    name = "block_classifier",
    about = "Classify page content blocks into labels and export them as CSV"
)]
struct Cli {
    /// Settings file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PageArgs {
    /// Page to fetch over HTTP(S)
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    url: Option<String>,
    /// Local HTML file
    #[arg(long)]
    file: Option<PathBuf>,
    /// Tag whose elements are grouped (h1-h6, p, div, span, ...)
    #[arg(long)]
    tag: Option<TagName>,
    /// Attribute whose values are the grouping keys
    #[arg(long)]
    attribute: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify content blocks and write the table as CSV
    Run {
        #[command(flatten)]
        page: PageArgs,
        /// Candidate labels
        #[arg(short, long, num_args = 1..)]
        labels: Vec<String>,
        /// Minimum winning score for a block to be kept
        #[arg(long)]
        threshold: Option<f64>,
        /// Grouping keys to use instead of every value on the page
        #[arg(long, num_args = 1..)]
        keys: Vec<String>,
        /// Output CSV path
        #[arg(short, long, default_value = "Title.csv")]
        output: PathBuf,
        /// Zero-shot inference endpoint
        #[arg(long)]
        endpoint: Option<String>,
        /// Classification calls in flight
        #[arg(long)]
        concurrency: Option<usize>,
        /// Rows to preview on stdout
        #[arg(long, default_value = "10")]
        preview: usize,
    },
    /// List grouping keys and whether they look like content
    Groups {
        #[command(flatten)]
        page: PageArgs,
    },
    /// List the tag names used on the page
    Tags {
        #[command(flatten)]
        page: PageArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Commands::Run {
            page,
            labels,
            threshold,
            keys,
            output,
            endpoint,
            concurrency,
            preview,
        } => {
            apply_page_args(&mut settings.pass, &page);
            if !labels.is_empty() {
                settings.pass.labels = labels;
            }
            if let Some(threshold) = threshold {
                settings.pass.threshold = threshold;
            }
            if !keys.is_empty() {
                settings.pass.keys = Some(keys);
            }
            if let Some(endpoint) = endpoint {
                settings.classifier.url = endpoint;
            }
            if let Some(concurrency) = concurrency {
                settings.concurrency = concurrency;
            }

            // Configuration problems surface before any network traffic
            settings.validate()?;
            settings.pass.validate()?;

            let driver = open_page(&page, &settings)?;
            let result = if settings.concurrency > 1 {
                let classifier = AsyncHttpClassifier::new(settings.classifier.clone())?;
                let runtime = tokio::runtime::Runtime::new()?;
                runtime.block_on(run_pass_concurrent(
                    driver.as_ref(),
                    &settings.pass,
                    &classifier,
                    settings.concurrency,
                ))?
            } else {
                let classifier = HttpClassifier::new(settings.classifier.clone());
                run_pass(driver.as_ref(), &settings.pass, &classifier)?
            };

            for (name, bucket) in &result.buckets {
                info!(
                    bucket = %name,
                    source = %bucket.source_key,
                    occupancy = bucket.occupancy(),
                    rows = bucket.len(),
                    "bucket"
                );
            }

            if result.table.is_empty() {
                println!("No content block scored above {}.", settings.pass.threshold);
            } else {
                print!("{}", result.table.preview(preview));
            }

            result
                .table
                .write_csv_file(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Wrote {} columns x {} rows to {}",
                result.table.columns().len(),
                result.table.row_count(),
                output.display()
            );
        }
        Commands::Groups { page } => {
            apply_page_args(&mut settings.pass, &page);
            let driver = open_page(&page, &settings)?;
            let query = MarkupQuery::parse(&driver.current_page_markup()?);
            let reports = survey_groups(&query, &settings.pass);

            println!("{:<32} | {:>5} | {:>8} | {}", "Key", "Raw", "Accepted", "Rejection");
            println!("{}", "-".repeat(72));
            for r in &reports {
                let accepted = r.accepted.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
                let rejection = match &r.rejection {
                    Some(reason) => serde_json::to_string(reason)?,
                    None => String::new(),
                };
                println!(
                    "{:<32} | {:>5} | {:>8} | {}",
                    truncate(&r.key, 32),
                    r.raw,
                    accepted,
                    rejection
                );
            }
            let kept = reports.iter().filter(|r| r.accepted.is_some()).count();
            println!("\n{} keys, {} content blocks", reports.len(), kept);
        }
        Commands::Tags { page } => {
            let driver = open_page(&page, &settings)?;
            let query = MarkupQuery::parse(&driver.current_page_markup()?);
            for tag in query.tag_names() {
                let allowed = if tag.parse::<TagName>().is_ok() { "" } else { " (not groupable)" };
                println!("{}{}", tag, allowed);
            }
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    Ok(())
}

fn apply_page_args(pass: &mut PassConfig, page: &PageArgs) {
    if let Some(tag) = page.tag {
        pass.tag = tag;
    }
    if let Some(ref attribute) = page.attribute {
        pass.attribute = attribute.clone();
    }
}

fn open_page(page: &PageArgs, settings: &Settings) -> Result<Box<dyn PageDriver>> {
    if let Some(ref url) = page.url {
        let mut driver = HttpDriver::new(&settings.driver.user_agent, settings.driver.timeout_secs);
        driver.navigate(url)?;
        return Ok(Box::new(driver));
    }

    let path = page
        .file
        .as_deref()
        .ok_or_else(|| anyhow!("Either --url or --file is required"))?;
    let mut driver = StaticPage::default();
    driver.navigate(file_url(path)?.as_str())?;
    Ok(Box::new(driver))
}

fn file_url(path: &Path) -> Result<Url> {
    let absolute = fs::canonicalize(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Url::from_file_path(&absolute)
        .map_err(|_| anyhow!("Cannot express {} as a file URL", absolute.display()))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}
