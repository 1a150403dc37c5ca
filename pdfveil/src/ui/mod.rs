//! Terminal presentation: colors, status messages and summaries.

pub mod output_format;
pub mod redaction_summary;
pub mod theme;
