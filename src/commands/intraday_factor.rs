use crate::cli::InstrumentArgs;
use crate::commands::{init_logging, pick_dir, print_summary, resolve_or_exit};
use crate::models::FactorMode;
use crate::services::{build_intraday_factors, run_batch};

pub fn run(args: InstrumentArgs, mode: FactorMode) {
    init_logging(args.debug);
    let ctx = resolve_or_exit(&args);

    let price_dir = pick_dir(&ctx.indir, &ctx.dirs.intraday_price_dir, "intraday_price");
    let factor_dir = pick_dir(&ctx.outdir, &ctx.dirs.intraday_factor_dir, "intraday_factor");

    println!(
        "🧮 Building intraday factors ({:?} mode) for {} tickers ({} → {})",
        mode,
        ctx.tickers().len(),
        price_dir.display(),
        factor_dir.display()
    );

    let stats = run_batch(ctx.tickers(), |ticker| {
        build_intraday_factors(ticker, &factor_dir, &price_dir, mode)
    });

    print_summary("Intraday factor", &stats);
}
