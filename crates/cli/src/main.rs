//! LexCompare CLI - Command-line interface for the LexCompare daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use lexcompare_sdk::{CellStatus, LexCompareClient, Report, ResultsResponse};
use std::time::Duration;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9617";

#[derive(Parser)]
#[command(name = "lexcompare")]
#[command(about = "Article-by-article comparison of legal documents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "LEXCOMPARE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a comparison job over documents on the daemon's disk
    Submit {
        /// Primary document path
        primary: String,

        /// Comparison document paths
        #[arg(required = true)]
        comparisons: Vec<String>,
    },

    /// Submit a comparison job over documents in the daemon's demo directory
    Demo {
        /// Primary document file name
        primary: String,

        /// Comparison document file names
        #[arg(required = true)]
        comparisons: Vec<String>,
    },

    /// Show the current results of a job
    Results {
        job_id: String,

        /// Print the raw JSON payload
        #[arg(long)]
        json: bool,
    },

    /// Poll a job until it finishes
    Watch {
        job_id: String,

        /// Poll interval in seconds
        #[arg(short, long, default_value = "3")]
        interval: u64,
    },

    /// Show one base article with every matched article
    Row {
        job_id: String,

        /// Zero-based row index
        article_index: usize,
    },

    /// Show daemon status
    Status,
}

#[derive(Tabled)]
struct ReportLine {
    article: String,
    document: String,
    status: String,
    matches: String,
}

#[derive(Tabled)]
struct StateCount {
    state: String,
    jobs: i64,
}

fn report_lines(report: &Report) -> Vec<ReportLine> {
    report
        .rows()
        .iter()
        .flat_map(|row| {
            row.country_comparisons.iter().map(move |cell| ReportLine {
                article: row.base_article_info.article_number.clone(),
                document: cell.country_name.clone(),
                status: cell.status.to_string(),
                matches: match cell.status {
                    CellStatus::Completed => cell.similar_articles.len().to_string(),
                    CellStatus::Failed => cell.error.clone().unwrap_or_default(),
                    CellStatus::Pending => String::new(),
                },
            })
        })
        .collect()
}

fn print_results(response: &ResultsResponse) {
    let status = match response.status.as_str() {
        "done" => response.status.green().bold(),
        "failed" => response.status.red().bold(),
        _ => response.status.yellow().bold(),
    };
    println!("{} {} [{}]", "Job".bold(), response.job_id, status);

    if let Some(message) = &response.message {
        println!("  {}", message);
    }

    match &response.data {
        Some(Report::Failed(failure)) => {
            println!("  {} {}", "Details:".bold(), failure.error_details);
        }
        Some(report) => {
            let lines = report_lines(report);
            if !lines.is_empty() {
                println!();
                println!("{}", Table::new(lines));
            }
        }
        None => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = LexCompareClient::connect(&cli.rpc_url)
        .await
        .context("Failed to create RPC client")?;

    match cli.command {
        Commands::Submit {
            primary,
            comparisons,
        } => {
            let response = client
                .submit(primary, &comparisons)
                .await
                .context("Failed to submit job")?;

            println!("{}", "✓ Job submitted".green().bold());
            println!("  {} {}", "Job ID:".bold(), response.job_id);
        }

        Commands::Demo {
            primary,
            comparisons,
        } => {
            let response = client
                .submit_demo(primary, &comparisons)
                .await
                .context("Failed to submit demo job")?;

            println!("{}", "✓ Demo job submitted".green().bold());
            println!("  {} {}", "Job ID:".bold(), response.job_id);
        }

        Commands::Results { job_id, json } => {
            let response = client
                .results(&job_id)
                .await
                .context("Failed to fetch results")?;

            if json {
                let payload = response
                    .data
                    .as_ref()
                    .map(serde_json::to_string_pretty)
                    .transpose()?
                    .unwrap_or_else(|| "null".to_string());
                println!("{}", payload);
            } else {
                print_results(&response);
            }
        }

        Commands::Watch { job_id, interval } => loop {
            let response = client
                .results(&job_id)
                .await
                .context("Failed to fetch results")?;
            print_results(&response);

            if response.is_finished() {
                break;
            }
            println!();
            tokio::time::sleep(Duration::from_secs(interval.max(1))).await;
        },

        Commands::Row {
            job_id,
            article_index,
        } => {
            let row = client
                .row(&job_id, article_index)
                .await
                .context("Failed to fetch row")?;

            let base = &row.base_article;
            println!(
                "{} {}",
                base.article_number.cyan().bold(),
                base.article_title.as_deref().unwrap_or("")
            );
            println!("{}", base.article_text);

            if row.similar_articles.is_empty() {
                println!();
                println!("{}", "No similar articles".yellow());
            }
            for similar in &row.similar_articles {
                println!();
                println!(
                    "{} {}",
                    similar.matched_article_identifier.green().bold(),
                    similar.matched_article_title.as_deref().unwrap_or("")
                );
                println!("  {} {}", "Reason:".bold(), similar.reason_for_similarity);
                println!("  {}", similar.matched_article_full_text);
            }
        }

        Commands::Status => {
            println!("{}", "System Status".cyan().bold());
            println!();

            match client.stats().await {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!("  {} {}", "Total Jobs:".bold(), stats.total_jobs);
                    println!("  {} {}", "Running:".bold(), stats.running_jobs);
                    println!("  {} {} seconds", "Uptime:".bold(), stats.uptime_seconds);
                    println!();

                    let counts: Vec<StateCount> = stats
                        .jobs_by_state
                        .into_iter()
                        .map(|(state, jobs)| StateCount { state, jobs })
                        .collect();
                    println!("{}", Table::new(counts));
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }
    }

    Ok(())
}
