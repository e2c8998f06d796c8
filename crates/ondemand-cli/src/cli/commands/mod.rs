//! CLI command handlers, one file per command.

mod checksum;
mod clean;
mod favorites;
mod fetch;
mod list;
mod progress;
mod serve;

pub use checksum::run_checksum;
pub use clean::run_clean;
pub use favorites::run_favorites;
pub use fetch::{run_fetch, run_fetch_url, FetchArgs};
pub use list::run_list;
pub use serve::run_serve;
