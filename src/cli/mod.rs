pub mod config;
pub mod task;
pub mod text;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use merchant_insights::db::{get_connection, open_in_memory};
use merchant_insights::error::{InsightsError, Result};
use merchant_insights::pipeline::Job;
use merchant_insights::settings::{shellexpand_path, Settings};

#[derive(Parser)]
#[command(
    name = "merchant-insights",
    about = "Analyze merchant transaction data: top merchants, sales patterns and recommendations."
)]
pub struct Cli {
    /// Transactions CSV (merchant_id, purchase_amount, purchase_date, category, installments)
    #[arg(long, short = 't', global = true)]
    pub transactions: Option<String>,
    /// Merchants CSV (merchant_id, merchant_name, city_id, state_id)
    #[arg(long, short = 'm', global = true)]
    pub merchants: Option<String>,
    /// Keep the working tables in this SQLite file instead of in memory
    #[arg(long, global = true)]
    pub database: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Analysis(AnalysisCommands),
    /// Show or update saved settings.
    Config {
        /// Default directory for result files
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
        /// Default transactions CSV
        #[arg(long = "default-transactions")]
        default_transactions: Option<String>,
        /// Default merchants CSV
        #[arg(long = "default-merchants")]
        default_merchants: Option<String>,
        /// Number of rows shown in result tables
        #[arg(long = "display-rows")]
        display_rows: Option<usize>,
        /// Log filter used when RUST_LOG is unset (e.g. info, debug)
        #[arg(long = "log-level")]
        log_level: Option<String>,
    },
}

/// Commands that need the cleaned transaction table.
#[derive(Subcommand)]
pub enum AnalysisCommands {
    /// Load and clean the inputs, then show summary statistics and a sample.
    Clean,
    /// Top 5 merchants by purchase amount for each month and city.
    Task1 {
        /// Output CSV (default: <output_dir>/task1_top_merchants.csv)
        #[arg(long, short = 'o')]
        output: Option<String>,
    },
    /// Average sale amount per merchant and state.
    Task2 {
        /// Output CSV (default: <output_dir>/task2_avg_sales_by_state.csv)
        #[arg(long, short = 'o')]
        output: Option<String>,
    },
    /// Top 3 hours of the day by sales for each category.
    Task3 {
        /// Output CSV (default: <output_dir>/task3_top_hours_by_category.csv)
        #[arg(long, short = 'o')]
        output: Option<String>,
    },
    /// Most popular merchants and dominant category per city.
    Task4 {
        /// Output directory (default: <output_dir>)
        #[arg(long = "output-dir", short = 'o')]
        output_dir: Option<String>,
        /// Popular merchants CSV (default: <dir>/task4_popular_merchants.csv)
        #[arg(long = "output-merchants")]
        output_merchants: Option<String>,
        /// Dominant categories CSV (default: <dir>/task4_city_categories.csv)
        #[arg(long = "output-categories")]
        output_categories: Option<String>,
    },
    /// Recommendations for new merchants, including installment profitability.
    Task5 {
        /// Output directory (default: <output_dir>/task5_recommendations)
        #[arg(long = "output-dir", short = 'o')]
        output_dir: Option<String>,
    },
    /// Run every task and write all results.
    All {
        /// Output directory (default: <output_dir>)
        #[arg(long = "output-dir", short = 'o')]
        output_dir: Option<String>,
    },
}

pub fn run(cli: Cli, settings: Settings) -> Result<()> {
    let Cli {
        transactions,
        merchants,
        database,
        command,
    } = cli;
    match command {
        Commands::Config {
            output_dir,
            default_transactions,
            default_merchants,
            display_rows,
            log_level,
        } => config::run(
            settings,
            config::Changes {
                output_dir,
                transactions_path: default_transactions,
                merchants_path: default_merchants,
                display_rows,
                log_level,
            },
        ),
        Commands::Analysis(cmd) => {
            let inputs = Inputs {
                transactions,
                merchants,
                database,
            };
            let mut job = open_job(inputs, &settings)?;
            job.cleaned()?;
            run_analysis(&mut job, cmd, &settings)?;
            job.close()
        }
    }
}

fn run_analysis(job: &mut Job, cmd: AnalysisCommands, settings: &Settings) -> Result<()> {
    let out_dir = PathBuf::from(shellexpand_path(&settings.output_dir));
    let limit = settings.display_rows;
    match cmd {
        AnalysisCommands::Clean => task::clean(job, limit),
        AnalysisCommands::Task1 { output } => {
            task::task1(job, &output_path(output, &out_dir, task::TASK1_FILE), limit)
        }
        AnalysisCommands::Task2 { output } => {
            task::task2(job, &output_path(output, &out_dir, task::TASK2_FILE), limit)
        }
        AnalysisCommands::Task3 { output } => {
            task::task3(job, &output_path(output, &out_dir, task::TASK3_FILE), limit)
        }
        AnalysisCommands::Task4 {
            output_dir,
            output_merchants,
            output_categories,
        } => {
            let dir = dir_path(output_dir, &out_dir);
            task::task4(
                job,
                &output_path(output_merchants, &dir, task::TASK4_MERCHANTS_FILE),
                &output_path(output_categories, &dir, task::TASK4_CATEGORIES_FILE),
                limit,
            )
        }
        AnalysisCommands::Task5 { output_dir } => {
            let dir = match output_dir {
                Some(d) => PathBuf::from(shellexpand_path(&d)),
                None => out_dir.join(task::TASK5_DIR),
            };
            task::task5(job, &dir)
        }
        AnalysisCommands::All { output_dir } => task::all(job, &dir_path(output_dir, &out_dir)),
    }
}

struct Inputs {
    transactions: Option<String>,
    merchants: Option<String>,
    database: Option<String>,
}

fn output_path(output: Option<String>, out_dir: &std::path::Path, file: &str) -> PathBuf {
    output
        .map(|o| PathBuf::from(shellexpand_path(&o)))
        .unwrap_or_else(|| out_dir.join(file))
}

fn dir_path(dir: Option<String>, out_dir: &std::path::Path) -> PathBuf {
    dir.map(|d| PathBuf::from(shellexpand_path(&d)))
        .unwrap_or_else(|| out_dir.to_path_buf())
}

fn open_job(inputs: Inputs, settings: &Settings) -> Result<Job> {
    let transactions = inputs
        .transactions
        .or_else(|| settings.transactions_path.clone())
        .ok_or(InsightsError::MissingInput("transactions"))?;
    let merchants = inputs
        .merchants
        .or_else(|| settings.merchants_path.clone())
        .ok_or(InsightsError::MissingInput("merchants"))?;

    let conn = match &inputs.database {
        Some(path) => get_connection(&PathBuf::from(shellexpand_path(path)))?,
        None => open_in_memory()?,
    };
    Job::new(
        conn,
        &PathBuf::from(shellexpand_path(&transactions)),
        &PathBuf::from(shellexpand_path(&merchants)),
    )
}
