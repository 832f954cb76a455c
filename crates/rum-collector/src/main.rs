use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rum_collector::pipeline::{self, FeedSource};
use rum_collector::{CollectorConfig, Overrides};
use rum_resolver::{agent_inputs, load_corpus, CorpusStats, MissingFieldAudit};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch (or load) the RUM feed, resolve errors and write the corpus files
    Collect {
        /// Read sessions from a saved feed dump instead of the bundle service
        #[arg(long)]
        feed_file: Option<PathBuf>,

        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for the corpus files (overrides RUM_OUTPUT_DIR)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Site domain to query (overrides RUM_DOMAIN)
        #[arg(long)]
        domain: Option<String>,

        /// Day to query, YYYY-MM-DD (overrides RUM_DATE)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Print URL and record counts for a corpus file
    Stats { corpus: PathBuf },

    /// List records missing line/column or code fields
    Audit { corpus: PathBuf },

    /// Export located records as agent inputs
    AgentInputs {
        corpus: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Skip records whose widest context line has this many tokens or more
        #[arg(long, default_value_t = rum_resolver::config::DEFAULT_MAX_CONTEXT_TOKENS)]
        max_tokens: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Collect {
            feed_file,
            config,
            output_dir,
            domain,
            date,
        } => {
            let mut settings = CollectorConfig::load(config.as_deref())?;
            settings.apply_overrides(&Overrides {
                domain,
                date,
                output_dir,
            });

            let source = match feed_file {
                Some(path) => FeedSource::File(path),
                None => FeedSource::Remote,
            };
            let outcome = pipeline::collect(&settings, &source).await?;
            info!(
                urls = outcome.stats.total_urls,
                records = outcome.stats.total_records,
                unsafe_sessions = outcome.report.unsafe_sessions,
                minified = outcome.report.minified_discarded,
                output = %settings.output_dir.display(),
                "corpus written"
            );
            println!("{}", outcome.stats);
        }
        Command::Stats { corpus } => {
            let corpus = load_corpus(&corpus)?;
            println!("{}", CorpusStats::of(&corpus));
        }
        Command::Audit { corpus } => {
            let corpus = load_corpus(&corpus)?;
            println!("{}", MissingFieldAudit::of(&corpus));
        }
        Command::AgentInputs {
            corpus,
            out,
            max_tokens,
        } => {
            let corpus = load_corpus(&corpus)?;
            let handoff = agent_inputs(&corpus, max_tokens);
            let json = serde_json::to_string_pretty(&handoff)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(
                        path = %path.display(),
                        inputs = handoff.len(),
                        missing_location = handoff.missing_location,
                        context_too_long = handoff.context_too_long,
                        "agent inputs written"
                    );
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}
