//! CLI command implementations

pub mod clear;
pub mod config;
pub mod history;
pub mod progress;
pub mod resolve;
pub mod stats;
pub mod vocab;

pub use clear::execute as clear;
pub use config::execute as config;
pub use history::execute as history;
pub use progress::execute as progress;
pub use resolve::execute as resolve;
pub use stats::execute as stats;
pub use vocab::execute as vocab;
