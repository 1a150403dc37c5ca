//! Colors used for terminal output.
//!
//! Every logical part of the output maps to one 16-color ANSI foreground.
//! Color is only applied when the target stream is a terminal.

use owo_colors::{AnsiColors, OwoColorize};

/// The different logical parts of the output that are styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeEntry {
    Header,
    Success,
    Info,
    Warn,
    Error,
    SummaryRuleName,
    SummaryOccurrences,
    Prompt,
}

impl ThemeEntry {
    pub fn color(self) -> AnsiColors {
        match self {
            ThemeEntry::Header => AnsiColors::BrightCyan,
            ThemeEntry::Success => AnsiColors::Green,
            ThemeEntry::Info => AnsiColors::Blue,
            ThemeEntry::Warn => AnsiColors::Yellow,
            ThemeEntry::Error => AnsiColors::Red,
            ThemeEntry::SummaryRuleName => AnsiColors::Magenta,
            ThemeEntry::SummaryOccurrences => AnsiColors::BrightYellow,
            ThemeEntry::Prompt => AnsiColors::Cyan,
        }
    }
}

/// Returns `text` styled for `entry`, or unchanged when `enable_colors` is false.
pub fn paint(text: &str, entry: ThemeEntry, enable_colors: bool) -> String {
    if enable_colors {
        text.color(entry.color()).to_string()
    } else {
        text.to_string()
    }
}
