//! Load a Supermart sales table, precompute its KPIs and grouped results,
//! and lay them out as dashboard tabs.
pub mod dashboard;
pub mod error;
pub mod loader;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use dashboard::{dispatch, Dashboard, Tab, TabView};
pub use error::DashboardError;
