// src/utils/log.rs

//! Structured progress output on top of the `log` facade.
//!
//! Headers, steps and summaries are ordinary `info` records, so they follow
//! whatever filter the binary installed.

/// Width of header borders.
const BORDER_WIDTH: usize = 60;

/// Log a header
pub fn header(title: &str) {
    let border = "=".repeat(BORDER_WIDTH);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
