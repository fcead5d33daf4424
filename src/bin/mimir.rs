//! mimir: model reconciliation CLI
//!
//! Runs one reconciliation pass against the configured sources and prints
//! the result as JSON.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;

use mimir::query::{self, CostEstimate, SortDirection, SortField, SortKey};
use mimir::{Config, MergedModel, Mimir};

/// Mimir model reconciliation engine
#[derive(Parser)]
#[command(name = "mimir")]
#[command(version = mimir::version::PKG_VERSION)]
#[command(about = "Reconcile LLM catalogs, pricing tables and leaderboards")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "MIMIR_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List reconciled models
    Models {
        /// Include catalog models that are not configured
        #[arg(long)]
        all: bool,
        /// Only models from this provider
        #[arg(long)]
        provider: Option<String>,
        /// Substring match on id, name or provider
        #[arg(long)]
        search: Option<String>,
        /// Sort expression, e.g. "input_price:desc" or "rating:code:desc"
        #[arg(long)]
        sort: Option<SortKey>,
    },

    /// Show one model by id
    Model {
        /// Model id (e.g. "openai/gpt-4o")
        id: String,
    },

    /// List priced models with an optional cost estimate
    Pricing {
        /// Sort expression (default: input_price)
        #[arg(long)]
        sort: Option<SortKey>,
        #[arg(long, default_value_t = 0)]
        input_tokens: u64,
        #[arg(long, default_value_t = 0)]
        output_tokens: u64,
        #[arg(long, default_value_t = 1)]
        requests: u64,
    },

    /// Flush cached source data and reload the model list
    Refresh,

    /// Run a pass and report health
    Health,
}

#[derive(Serialize)]
struct Listing<T> {
    data: Vec<T>,
    total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct PricedModel {
    #[serde(flatten)]
    model: MergedModel,
    calculated_cost: CostEstimate,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
    tracing::debug!(version = mimir::version::version_string(), "mimir starting");

    let mut config = Config::load_or_default(args.config.as_deref())?;
    config.apply_env()?;
    let mimir = Mimir::from_config(&config)?;

    match args.command {
        Command::Models {
            all,
            provider,
            search,
            sort,
        } => {
            let pass = mimir.get_all_models(all).await?;
            let mut models = pass.models;
            if let Some(provider) = provider {
                models = query::filter_by_provider(models, &provider);
            }
            if let Some(needle) = search {
                models = query::search(models, &needle);
            }
            if let Some(key) = sort {
                query::sort_models(&mut models, &key);
            }
            print_json(&Listing {
                total: models.len(),
                data: models,
                warnings: pass.warnings,
            })?;
        }

        Command::Model { id } => match mimir.get_model_by_id(&id).await? {
            Some(model) => print_json(&model)?,
            None => {
                eprintln!("model not found: {id}");
                process::exit(1);
            }
        },

        Command::Pricing {
            sort,
            input_tokens,
            output_tokens,
            requests,
        } => {
            let pass = mimir.get_all_models(false).await?;
            let mut models = query::priced(pass.models);
            let key = sort.unwrap_or(SortKey {
                field: SortField::InputPrice,
                direction: SortDirection::Ascending,
            });
            query::sort_models(&mut models, &key);
            let data: Vec<PricedModel> = models
                .into_iter()
                .map(|model| PricedModel {
                    calculated_cost: query::estimate_cost(
                        &model,
                        input_tokens,
                        output_tokens,
                        requests,
                    ),
                    model,
                })
                .collect();
            print_json(&Listing {
                total: data.len(),
                data,
                warnings: pass.warnings,
            })?;
        }

        Command::Refresh => {
            let summary = mimir.refresh().await?;
            print_json(&summary)?;
        }

        Command::Health => {
            mimir.get_all_models(false).await?;
            print_json(&mimir.health().await)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
