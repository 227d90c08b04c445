//! Utility functions shared by the feed layer and the binary.
//!
//! - **Dates**: best-effort parsing of caller-supplied dates and feed timestamps
//! - **Text**: terminal-safe rendering of feed-supplied strings

mod dates;
mod text;

pub use dates::{parse_date_loose, parse_timestamp};
pub use text::sanitize_line;
