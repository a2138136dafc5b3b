mod bar;
mod factor;
mod frequency;
mod universe;
pub mod config;
pub mod indicators;

pub use bar::{Bar, PriceSeries};
pub use config::{AppConfig, AssetClassDirs};
pub use factor::{FactorGroup, FactorMode, FactorRow, FactorSeries, IntradayFactor};
pub use frequency::Frequency;
pub use universe::Universe;
