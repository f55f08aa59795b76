use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::{Client, Response};
use serde_json::json;

#[derive(Parser)]
#[command(name = "sfh-cli")]
#[command(about = "SF Health Analyzer CLI", long_about = None)]
struct Cli {
    #[arg(short, long, env = "SF_HEALTH_ENDPOINT", default_value = "http://localhost:8080")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health and insights readiness
    Health,

    /// Fetch AI insights
    Insights {
        /// day, week or month
        #[arg(short, long, default_value = "week")]
        range: String,
    },

    /// Create a health alert
    Alert {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: String,

        #[arg(short, long, default_value = "Salesforce")]
        source_system: String,

        #[arg(short, long)]
        category: Option<String>,

        /// Categorize the alert right after creating it
        #[arg(long)]
        categorize: bool,
    },

    /// List alerts
    List {
        #[arg(long, default_value = "0")]
        skip: usize,

        #[arg(short, long, default_value = "100")]
        limit: usize,

        #[arg(short, long)]
        unresolved_only: bool,
    },

    /// Categorize one alert
    Categorize {
        #[arg(value_name = "ALERT_ID")]
        id: u64,
    },

    /// Categorize every uncategorized alert
    CategorizeAll,

    /// Mark an alert resolved
    Resolve {
        #[arg(value_name = "ALERT_ID")]
        id: u64,

        /// Reopen instead of resolving
        #[arg(long)]
        reopen: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let endpoint = cli.endpoint.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Health => {
            let health = client.get(format!("{}/health", endpoint)).send().await;
            print_response(health.context("health request failed")?).await?;

            let ready = client.get(format!("{}/health/ready", endpoint)).send().await;
            print_response(ready.context("readiness request failed")?).await?;
        }

        Commands::Insights { range } => {
            let response = client
                .get(format!("{}/v1/insights", endpoint))
                .query(&[("time_range", range.as_str())])
                .send()
                .await
                .context("insights request failed")?;
            print_response(response).await?;
        }

        Commands::Alert {
            title,
            description,
            source_system,
            category,
            categorize,
        } => {
            let path = if categorize {
                "/v1/alerts/create-and-categorize"
            } else {
                "/v1/alerts"
            };
            let response = client
                .post(format!("{}{}", endpoint, path))
                .json(&json!({
                    "title": title,
                    "description": description,
                    "source_system": source_system,
                    "category": category,
                }))
                .send()
                .await
                .context("create alert request failed")?;
            print_response(response).await?;
        }

        Commands::List {
            skip,
            limit,
            unresolved_only,
        } => {
            let mut url = format!("{}/v1/alerts?skip={}&limit={}", endpoint, skip, limit);
            if unresolved_only {
                url.push_str("&unresolved_only=true");
            }
            let response = client.get(&url).send().await.context("list request failed")?;
            print_response(response).await?;
        }

        Commands::Categorize { id } => {
            let response = client
                .post(format!("{}/v1/alerts/{}/categorize", endpoint, id))
                .send()
                .await
                .with_context(|| format!("categorize request for alert {} failed", id))?;
            print_response(response).await?;
        }

        Commands::CategorizeAll => {
            let response = client
                .post(format!("{}/v1/alerts/categorize-all", endpoint))
                .send()
                .await
                .context("categorize-all request failed")?;
            print_response(response).await?;
        }

        Commands::Resolve { id, reopen } => {
            let response = client
                .post(format!("{}/v1/alerts/{}/resolve", endpoint, id))
                .query(&[("resolved", (!reopen).to_string())])
                .send()
                .await
                .with_context(|| format!("resolve request for alert {} failed", id))?;
            print_response(response).await?;
        }
    }

    Ok(())
}

async fn print_response(response: Response) -> Result<()> {
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .with_context(|| format!("server returned a non-JSON body (HTTP {})", status))?;
    if !status.is_success() {
        eprintln!("HTTP {}", status);
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
