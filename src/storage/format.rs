//! Plain-text output formats.

use chrono::Local;

use crate::models::{ContentItem, FacultyField, FacultyRecord};
use crate::storage::ContentHeader;

/// Width of the `=` divider between items and records.
pub const DIVIDER_WIDTH: usize = 80;

/// Width of the `-` rule under a faculty member heading.
pub const RULE_WIDTH: usize = 50;

/// Local wall-clock time in the header format.
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn divider() -> String {
    "=".repeat(DIVIDER_WIDTH)
}

/// Render a section or endpoint file.
pub fn render_section(header: &ContentHeader, items: &[ContentItem], timestamp: &str) -> String {
    let mut out = format!("URL: {}\n", header.url);
    if let Some(section) = &header.section {
        out.push_str(&format!("Section: {}\n", section.to_uppercase()));
    }
    out.push_str(&format!("Timestamp: {}\n", timestamp));
    out.push_str(&divider());
    out.push_str("\n\n");

    for item in items {
        out.push_str(&item.line());
        out.push('\n');
        out.push_str(&divider());
        out.push('\n');
    }
    out
}

/// Render the aggregate faculty directory.
pub fn render_faculty(institution: &str, records: &[FacultyRecord], timestamp: &str) -> String {
    let mut out = format!("Faculty Directory - {}\n", institution);
    out.push_str(&format!("Last Updated: {}\n", timestamp));
    out.push_str(&format!("Total Faculty Members: {}\n\n", records.len()));

    for (i, record) in records.iter().enumerate() {
        out.push_str(&format!("\nFaculty Member #{}\n", i + 1));
        out.push_str(&"-".repeat(RULE_WIDTH));
        out.push('\n');

        for field in FacultyRecord::PRIORITY_FIELDS {
            if let Some(value) = record.scalar(field) {
                out.push_str(&format!("{}: {}\n", field.label(), value));
            }
        }

        for field in FacultyRecord::LIST_FIELDS
            .into_iter()
            .chain([FacultyField::AdditionalInfo])
        {
            let values = record.list(field);
            if values.is_empty() {
                continue;
            }
            out.push_str(&format!("\n{}:\n", field.label()));
            for value in values {
                out.push_str(&format!("- {}\n", value));
            }
        }

        out.push('\n');
        out.push_str(&divider());
        out.push('\n');
    }
    out
}
