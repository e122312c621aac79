pub mod alerts;
pub mod cli;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod generator;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod portfolio;
pub mod provider;
pub mod screener;
pub mod sectors;
pub mod server;
pub mod settings;
pub mod store;
pub mod watchlist;
