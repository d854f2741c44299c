//! Kumo-Sift main entry point
//!
//! This is the command-line interface for the Kumo-Sift crawler and
//! HTML reducer.

use anyhow::Context;
use clap::{Parser, Subcommand};
use kumo_sift::config::load_request;
use kumo_sift::crawler::Crawler;
use kumo_sift::fetch::HttpFetcher;
use kumo_sift::reduce::{reduce, ReduceOptions};
use kumo_sift::storage::QueueStore;
use kumo_sift::CrawlRequest;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const USER_AGENT: &str = concat!("kumo-sift/", env!("CARGO_PKG_VERSION"));

/// Kumo-Sift: a resumable web crawler with an HTML reduction pipeline
#[derive(Parser, Debug)]
#[command(name = "kumo-sift")]
#[command(version)]
#[command(about = "Crawl sites into a durable queue and reduce HTML documents", long_about = None)]
struct Cli {
    /// Path to the crawl database
    #[arg(long, global = true, default_value = "kumo-sift.db")]
    db: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a new crawl from a seed URL
    Crawl {
        /// The seed URL
        url: String,

        /// Path to a TOML configuration file (limits, patterns, settings)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum link-hops from the seed
        #[arg(long)]
        max_depth: Option<u32>,

        /// Maximum number of pages to fetch
        #[arg(long)]
        max_pages: Option<u32>,

        /// Number of concurrent workers (1-5)
        #[arg(long)]
        concurrency: Option<u32>,

        /// Follow links to other hosts
        #[arg(long)]
        external: bool,
    },

    /// Resume a paused or interrupted run
    Resume {
        /// The run to resume
        run_id: i64,
    },

    /// Pause a running run
    Pause {
        /// The run to pause
        run_id: i64,
    },

    /// Show a run's status and queue counts
    Status {
        /// The run to inspect
        run_id: i64,
    },

    /// Print a run's pages and event log
    Results {
        /// The run to inspect
        run_id: i64,

        /// Include fetched page bodies in the output
        #[arg(long)]
        include_html: bool,
    },

    /// Reduce an HTML file and print the result
    Reduce {
        /// Path to the HTML file
        file: PathBuf,

        /// Reduce only the first element matching this CSS selector
        #[arg(short, long)]
        selector: Option<String>,

        /// Print only the structural outlines
        #[arg(long)]
        outline_only: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Crawl {
            url,
            config,
            max_depth,
            max_pages,
            concurrency,
            external,
        } => {
            let mut request = match config {
                Some(path) => load_request(&path, &url)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => CrawlRequest::new(url),
            };
            if let Some(depth) = max_depth {
                request.limits.max_depth = depth;
            }
            if let Some(pages) = max_pages {
                request.limits.max_pages = pages;
            }
            if let Some(workers) = concurrency {
                request.limits.concurrency = workers;
            }
            if external {
                request.crawl_external = true;
            }

            let crawler = open_crawler(&cli.db)?;
            let run_id = crawler.start_crawl(request).await?;
            let report = crawler.status(run_id)?;
            println!(
                "Run {} {}: {} completed, {} failed, {} canceled",
                run_id,
                report.run.status.to_db_string(),
                report.stats.completed,
                report.stats.failed,
                report.stats.canceled,
            );
        }

        Command::Resume { run_id } => {
            let crawler = open_crawler(&cli.db)?;
            let status = crawler.resume(run_id).await?;
            println!("Run {} {}", run_id, status.to_db_string());
        }

        Command::Pause { run_id } => {
            let crawler = open_crawler(&cli.db)?;
            crawler.pause(run_id)?;
            println!("Run {} pause requested", run_id);
        }

        Command::Status { run_id } => {
            let crawler = open_crawler(&cli.db)?;
            let report = crawler.status(run_id)?;
            println!("Run {}: {}", report.run.id, report.run.status.to_db_string());
            println!("  Seed: {}", report.run.start_url);
            println!(
                "  Limits: depth {}, pages {}, concurrency {}",
                report.run.max_depth, report.run.max_pages, report.run.concurrency
            );
            println!("  Queue: {} total", report.stats.total);
            println!("    pending:    {}", report.stats.pending);
            println!("    processing: {}", report.stats.processing);
            println!("    completed:  {}", report.stats.completed);
            println!("    failed:     {}", report.stats.failed);
            println!("    canceled:   {}", report.stats.canceled);
        }

        Command::Results {
            run_id,
            include_html,
        } => {
            let crawler = open_crawler(&cli.db)?;
            let results = crawler.get_results(run_id, include_html)?;
            println!(
                "Run {} {} ({} pages)",
                results.run.id,
                results.run.status.to_db_string(),
                results.stats.completed,
            );
            for page in &results.pages {
                println!(
                    "  [{}] depth {} {} {}",
                    page.status.to_db_string(),
                    page.depth,
                    page.url,
                    page.page_title.as_deref().unwrap_or(""),
                );
                if let Some(html) = &page.response_html {
                    println!("{}", html);
                }
            }
            println!("Log:");
            for entry in &results.logs {
                println!("  {} [{}] {}", entry.created_at, entry.level, entry.message);
            }
        }

        Command::Reduce {
            file,
            selector,
            outline_only,
        } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let options = ReduceOptions {
                selector,
                ..ReduceOptions::default()
            };
            let result = reduce(&html, &options)?;
            if !outline_only {
                println!("{}", result.html);
            }
            println!("--- outline ---");
            print!("{}", result.outline);
            println!("--- outline (body, depth-limited) ---");
            print!("{}", result.outline_top);
            println!(
                "--- stats: {} -> {} bytes (ratio {:.4}), {} elements, max depth {}, {} at half depth ---",
                result.stats.input_len,
                result.stats.output_len,
                result.stats.compression_ratio,
                result.stats.element_count,
                result.stats.max_depth,
                result.stats.elements_at_half_depth,
            );
        }
    }

    Ok(())
}

fn open_crawler(db: &PathBuf) -> anyhow::Result<Crawler> {
    let store = Arc::new(
        QueueStore::open(db).with_context(|| format!("Failed to open {}", db.display()))?,
    );
    let fetcher = Arc::new(HttpFetcher::new(USER_AGENT)?);
    Ok(Crawler::new(store, fetcher))
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kumo_sift=info,warn"),
            1 => EnvFilter::new("kumo_sift=debug,info"),
            2 => EnvFilter::new("kumo_sift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
