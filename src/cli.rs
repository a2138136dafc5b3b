use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;
use crate::models::{FactorMode, Frequency};
use crate::utils::parse_date;

#[derive(Parser)]
#[command(name = "pricefactor")]
#[command(about = "Incremental price store and factor builder", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Instrument selection shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct InstrumentArgs {
    /// Process a single ticker
    #[arg(short, long)]
    pub ticker: Option<String>,

    /// Universe name from the config file, or a path to a universe file
    #[arg(short, long)]
    pub universe: Option<String>,

    /// JSON config with universes and asset-class folders
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Asset class whose folders supply the default input/output dirs
    #[arg(long = "asset-class")]
    pub asset_class: Option<String>,

    /// Input folder (overrides the asset class)
    #[arg(long)]
    pub indir: Option<PathBuf>,

    /// Output folder (overrides the asset class)
    #[arg(long)]
    pub outdir: Option<PathBuf>,

    /// Verbose logging
    #[arg(long)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download prices and merge them into the price store
    Price {
        #[command(flatten)]
        args: InstrumentArgs,

        /// First date to request (YYYYMMDD or YYYY-MM-DD)
        #[arg(long = "start_date", default_value = "20150101", value_parser = parse_date_arg)]
        start_date: NaiveDate,

        /// Last date to request, defaults to today
        #[arg(long = "end_date", value_parser = parse_date_arg)]
        end_date: Option<NaiveDate>,

        /// Bar frequency
        #[arg(long, value_enum, default_value_t = Frequency::Daily)]
        frequency: Frequency,
    },
    /// Build AvgRange/FrogBox from daily prices
    DailyFactor {
        #[command(flatten)]
        args: InstrumentArgs,
    },
    /// Build regression and Bollinger factors from intraday prices
    IntradayFactor {
        #[command(flatten)]
        args: InstrumentArgs,

        /// One file per factor, or a single combined file
        #[arg(long, value_enum, default_value_t = FactorMode::Split)]
        mode: FactorMode,
    },
    /// Export intraday prices in ForexTester layout
    ForexTester {
        #[command(flatten)]
        args: InstrumentArgs,

        /// First date to export
        #[arg(long = "start_date", default_value = "20150101", value_parser = parse_date_arg)]
        start_date: NaiveDate,
    },
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

pub fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Price {
            args,
            start_date,
            end_date,
            frequency,
        } => {
            commands::price::run(args, start_date, end_date, frequency);
        }
        Commands::DailyFactor { args } => {
            commands::daily_factor::run(args);
        }
        Commands::IntradayFactor { args, mode } => {
            commands::intraday_factor::run(args, mode);
        }
        Commands::ForexTester { args, start_date } => {
            commands::forex_tester::run(args, start_date);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_command() {
        let cli = Cli::try_parse_from([
            "pricefactor",
            "price",
            "--ticker",
            "SPY",
            "--start_date",
            "2017-03-01",
            "--frequency",
            "intraday",
        ])
        .unwrap();

        match cli.command {
            Commands::Price {
                args,
                start_date,
                end_date,
                frequency,
            } => {
                assert_eq!(args.ticker.as_deref(), Some("SPY"));
                assert_eq!(start_date, NaiveDate::from_ymd_opt(2017, 3, 1).unwrap());
                assert_eq!(end_date, None);
                assert_eq!(frequency, Frequency::Intraday);
            }
            _ => panic!("expected price command"),
        }
    }

    #[test]
    fn test_parse_intraday_mode() {
        let cli = Cli::try_parse_from([
            "pricefactor",
            "intraday-factor",
            "--universe",
            "etf",
            "--mode",
            "combined",
            "--debug",
        ])
        .unwrap();

        match cli.command {
            Commands::IntradayFactor { args, mode } => {
                assert_eq!(mode, FactorMode::Combined);
                assert!(args.debug);
                assert_eq!(args.universe.as_deref(), Some("etf"));
            }
            _ => panic!("expected intraday-factor command"),
        }
    }

    #[test]
    fn test_rejects_bad_date() {
        assert!(Cli::try_parse_from(["pricefactor", "forex-tester", "--start_date", "yesterday"]).is_err());
    }
}
