pub mod api;
pub mod cli;
pub mod collection;
pub mod config;
pub mod cycle;
pub mod error;
pub mod inventory;
pub mod report;
pub mod store;
pub mod util;

pub use collection::{Collection, Record};
pub use error::{Error, Result};
