// Library exports for microlab

pub mod analysis; // Imbalance and variance ratio hypothesis tests
pub mod binance; // Binance API client
pub mod collector; // Snapshot collection loop
pub mod config; // Runtime settings
pub mod error;
pub mod report; // Figures and JSON summary
pub mod series; // Data model and CSV persistence
