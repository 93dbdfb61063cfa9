mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::capex::CapexArgs;
use commands::cash_flow::CashFlowArgs;
use commands::dashboard::DashboardArgs;
use commands::revenue::RevenueArgs;
use commands::scenarios::SensitivityArgs;
use commands::valuation::ValuateArgs;

/// Business-plan projections and valuation metrics
#[derive(Parser)]
#[command(
    name = "bizplan",
    version,
    about = "Business-plan projections and valuation metrics",
    long_about = "A CLI for projecting a business plan with decimal precision. \
                  Allocates CAPEX, projects market revenue, derives economic and \
                  financial cash flows, and values them (NPV, IRR, payback)."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate CAPEX lines over the horizon and split debt/equity
    Capex(CapexArgs),
    /// Project traffic, conversion and revenue per market
    Revenue(RevenueArgs),
    /// Derive economic and financial cash flows
    CashFlow(CashFlowArgs),
    /// NPV, IRR and payback of a cash-flow series
    Valuate(ValuateArgs),
    /// Recompute the full plan and print the dashboard snapshot
    Dashboard(DashboardArgs),
    /// Two-way parameter sweep over the full plan
    Sensitivity(SensitivityArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Capex(args) => commands::capex::run_capex(args),
        Commands::Revenue(args) => commands::revenue::run_revenue(args),
        Commands::CashFlow(args) => commands::cash_flow::run_cash_flow(args),
        Commands::Valuate(args) => commands::valuation::run_valuate(args),
        Commands::Dashboard(args) => commands::dashboard::run_dashboard(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args),
        Commands::Version => {
            println!("bizplan {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
