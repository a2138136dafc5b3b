use crate::cli::InstrumentArgs;
use crate::commands::{init_logging, pick_dir, print_summary, resolve_or_exit};
use crate::services::{build_daily_factors, run_batch};

pub fn run(args: InstrumentArgs) {
    init_logging(args.debug);
    let ctx = resolve_or_exit(&args);

    let price_dir = pick_dir(&ctx.indir, &ctx.dirs.daily_price_dir, "daily_price");
    let factor_dir = pick_dir(&ctx.outdir, &ctx.dirs.daily_factor_dir, "daily_factor");

    println!(
        "🧮 Building daily factors for {} tickers ({} → {})",
        ctx.tickers().len(),
        price_dir.display(),
        factor_dir.display()
    );

    let stats = run_batch(ctx.tickers(), |ticker| {
        build_daily_factors(ticker, &factor_dir, &price_dir)
    });

    print_summary("Daily factor", &stats);
}
