use crate::cli::InstrumentArgs;
use crate::commands::{init_logging, pick_dir, print_summary, resolve_or_exit};
use crate::models::Frequency;
use crate::services::{run_batch, PriceFetcher, PriceStore, YahooClient};
use chrono::{Local, NaiveDate};

pub fn run(args: InstrumentArgs, start_date: NaiveDate, end_date: Option<NaiveDate>, frequency: Frequency) {
    init_logging(args.debug);
    let ctx = resolve_or_exit(&args);

    let configured = match frequency {
        Frequency::Daily => &ctx.dirs.daily_price_dir,
        Frequency::Intraday => &ctx.dirs.intraday_price_dir,
    };
    let fallback = match frequency {
        Frequency::Daily => "daily_price",
        Frequency::Intraday => "intraday_price",
    };
    let outdir = pick_dir(&ctx.outdir, configured, fallback);
    let end_date = end_date.unwrap_or_else(|| Local::now().date_naive());

    let client = match YahooClient::new() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    let store = PriceStore::new(&outdir, frequency);
    let fetcher = PriceFetcher::new(&client, &store);

    println!(
        "📥 Updating {} {} price files in {} ({} → {})",
        ctx.tickers().len(),
        frequency,
        outdir.display(),
        start_date,
        end_date
    );

    let stats = run_batch(ctx.tickers(), |ticker| {
        fetcher
            .update(ticker, start_date, end_date)
            .map(|outcome| outcome.fetched)
    });

    print_summary("Price update", &stats);
}
