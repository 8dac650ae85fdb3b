//! Terminal UI utilities for the reference CLI client.

pub mod formatter;

pub use formatter::MessageFormatter;

use std::io::Write;

/// Redisplay the prompt after printing incoming output
pub fn redisplay_prompt(user_id: &str) {
    print!("{}> ", user_id);
    std::io::stdout().flush().ok();
}
