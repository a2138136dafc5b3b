pub mod batch;
pub mod daily_factor;
pub mod factor_store;
pub mod forex_tester;
pub mod intraday_factor;
pub mod price_fetcher;
pub mod price_store;
pub mod yahoo;

pub use batch::{run_batch, BatchStats};
pub use daily_factor::{build_daily_factors, DailyFactorEngine};
pub use intraday_factor::{build_intraday_factors, GroupStage, IntradayFactorEngine};
pub use price_fetcher::{FetchOutcome, PriceFetcher, PriceSource};
pub use price_store::PriceStore;
pub use yahoo::YahooClient;
