pub mod market_window;

pub use market_window::{MarketBar, MarketWindow};
