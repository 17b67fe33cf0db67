use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rebate_core::time::{parse_date, today_in};
use rebate_core::{RewardPreference, SpendLedger, TransactionContext, recommend, validate_card};
use rebate_planner::{
    Constraints, SpendProfile, allocate, parse_ledger_csv, parse_spend_arg, parse_spend_csv,
};

mod config;
mod render;
mod source;
mod state;

use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "rebate",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("REBATE_BUILD_SHA"), ")"),
    about = "Credit card reward calculator and card planner"
)]
struct Cli {
    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank every card for one transaction
    Recommend {
        /// Merchant or category, e.g. "壽司郎" or "dining"
        query: String,

        #[arg(long, short, default_value_t = 100.0)]
        amount: f64,

        /// e.g. apple_pay, alipay, online
        #[arg(long)]
        payment_method: Option<String>,

        /// Charged in a foreign currency
        #[arg(long)]
        foreign: bool,

        #[arg(long)]
        online: bool,

        /// Transaction date, YYYY-MM-DD (default: today in the configured timezone)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        limit: Option<usize>,

        /// Card ids you already hold; always listed
        #[arg(long, value_delimiter = ',')]
        owned: Vec<String>,

        /// Sort by cost per mile (miles) or net cash value (cash)
        #[arg(long)]
        prefer: Option<RewardPreference>,

        #[command(flatten)]
        input: InputArgs,

        #[arg(long)]
        json: bool,
    },

    /// Pick a set of cards for a monthly spend mix
    Plan {
        /// CSV with category,amount[,foreign]
        #[arg(long)]
        profile: Option<PathBuf>,

        /// category=amount, repeatable; overrides the profile
        #[arg(long = "spend")]
        spend: Vec<String>,

        #[arg(long)]
        max_cards: Option<usize>,

        #[arg(long)]
        no_annual_fee_only: bool,

        #[arg(long)]
        date: Option<String>,

        #[command(flatten)]
        input: InputArgs,

        #[arg(long)]
        json: bool,
    },

    /// Check the catalog for inconsistencies
    Validate {
        /// Catalog path or URL
        #[arg(long)]
        catalog: Option<String>,
    },

    /// Manage ~/.rebate/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Catalog path or URL
    #[arg(long)]
    catalog: Option<String>,

    /// Spend ledger CSV (card_id,cap_group,period,spent,rewarded)
    #[arg(long)]
    ledger: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config
    Show,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Recommend {
            query,
            amount,
            payment_method,
            foreign,
            online,
            date,
            limit,
            owned,
            prefer,
            input,
            json,
        } => {
            let cfg = config::load_config()?;
            let loaded =
                source::load_catalog(catalog_source(&cfg, input.catalog.as_deref())).await?;
            let ledger = load_ledger(&cfg, input.ledger)?;

            let date = transaction_date(&cfg, date.as_deref())?;
            let mut ctx =
                TransactionContext::new(&query, amount, date).resolved_with(&loaded.registry);
            if let Some(method) = payment_method {
                ctx = ctx.with_payment_method(method);
            }
            if foreign {
                ctx = ctx.foreign();
            }
            if online {
                ctx = ctx.online();
            }

            let mut options = cfg.engine_options();
            if let Some(limit) = limit {
                options.limit = limit;
            }
            if !owned.is_empty() {
                options.owned_cards = owned;
            }
            if let Some(prefer) = prefer {
                options.preference = prefer;
            }

            let rec = recommend(&loaded.snapshot, &ctx, &ledger, &options)?;
            if json {
                let out =
                    serde_json::to_string_pretty(&rec).context("serialize recommendation")?;
                println!("{out}");
            } else {
                let title = loaded.registry.display_name(&query);
                print!("{}", render::format_recommendation(&title, amount, &rec));
            }
        }

        Command::Plan {
            profile,
            spend,
            max_cards,
            no_annual_fee_only,
            date,
            input,
            json,
        } => {
            let cfg = config::load_config()?;
            let mut spend_profile = match profile {
                Some(path) => parse_spend_csv(&path)?,
                None => SpendProfile::default(),
            };
            for arg in &spend {
                spend_profile.set(parse_spend_arg(arg)?);
            }
            if spend_profile.entries.is_empty() {
                bail!("no spend given (pass --profile <csv> or --spend category=amount)");
            }

            let loaded =
                source::load_catalog(catalog_source(&cfg, input.catalog.as_deref())).await?;
            let ledger = load_ledger(&cfg, input.ledger)?;
            let constraints = Constraints {
                max_cards: max_cards.unwrap_or(cfg.plan.max_cards),
                no_annual_fee_only: no_annual_fee_only || cfg.plan.no_annual_fee_only,
            };

            let plan = allocate(
                &loaded.snapshot,
                &spend_profile,
                &constraints,
                &ledger,
                transaction_date(&cfg, date.as_deref())?,
            )?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan).context("serialize plan")?);
            } else {
                print!("{}", render::format_allocation(&plan));
            }
        }

        Command::Validate { catalog } => {
            let cfg = config::load_config()?;
            let loaded = source::load_catalog(catalog_source(&cfg, catalog.as_deref())).await?;
            let checked: Vec<_> = loaded
                .snapshot
                .cards
                .iter()
                .map(|card| (card, validate_card(card)))
                .collect();

            let (report, bad) = render::format_validation(&loaded.warnings, &checked);
            print!("{report}");
            if bad > 0 {
                bail!("{bad} card(s) in {} have catalog issues", loaded.snapshot.data_source);
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },
    }

    Ok(())
}

fn catalog_source<'a>(cfg: &'a Config, flag: Option<&'a str>) -> &'a str {
    flag.unwrap_or(&cfg.catalog.source)
}

fn load_ledger(cfg: &Config, flag: Option<PathBuf>) -> Result<SpendLedger> {
    match flag.or_else(|| cfg.catalog.ledger.as_ref().map(PathBuf::from)) {
        Some(path) => parse_ledger_csv(&path)
            .with_context(|| format!("loading ledger {}", path.display())),
        None => Ok(SpendLedger::new()),
    }
}

fn transaction_date(cfg: &Config, flag: Option<&str>) -> Result<NaiveDate> {
    Ok(match flag {
        Some(d) => parse_date(d)?,
        None => today_in(&cfg.engine.timezone)?,
    })
}
