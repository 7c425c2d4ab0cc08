pub mod csv_loader;
pub mod logging;

pub use csv_loader::{load_bars, read_bars};
pub use logging::init_tracing;
