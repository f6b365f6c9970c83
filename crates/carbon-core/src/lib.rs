pub mod action;
pub mod baseline;
pub mod config;
pub mod dataset;
pub mod error;
pub mod io;
pub mod optimizer;
pub mod paths;
pub mod report;
pub mod summary;

pub use error::{CarbonError, Result};
