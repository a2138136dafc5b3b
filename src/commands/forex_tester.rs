use crate::cli::InstrumentArgs;
use crate::commands::{init_logging, pick_dir, print_summary, resolve_or_exit};
use crate::services::forex_tester::export;
use crate::services::run_batch;
use chrono::NaiveDate;

pub fn run(args: InstrumentArgs, start_date: NaiveDate) {
    init_logging(args.debug);
    let ctx = resolve_or_exit(&args);

    let price_dir = pick_dir(&ctx.indir, &ctx.dirs.intraday_price_dir, "intraday_price");
    let out_dir = pick_dir(&ctx.outdir, &ctx.dirs.forex_tester_dir, "forex_tester");

    println!(
        "📤 Exporting {} tickers from {} to {} (from {})",
        ctx.tickers().len(),
        price_dir.display(),
        out_dir.display(),
        start_date
    );

    let stats = run_batch(ctx.tickers(), |ticker| export(&price_dir, &out_dir, ticker, start_date));

    print_summary("ForexTester export", &stats);
}
