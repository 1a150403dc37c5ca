//! Status messages written to stderr.

use std::io::{self, Write};

use is_terminal::IsTerminal;

use super::theme::{paint, ThemeEntry};

fn print_message<W: Write>(
    writer: &mut W,
    prefix: &str,
    message: &str,
    entry: ThemeEntry,
    enable_colors: bool,
) -> io::Result<()> {
    writeln!(writer, "{} {}", paint(prefix, entry, enable_colors), message)
}

pub fn print_info_message<W: Write>(writer: &mut W, message: &str, enable_colors: bool) -> io::Result<()> {
    print_message(writer, "info:", message, ThemeEntry::Info, enable_colors)
}

pub fn print_success_message<W: Write>(writer: &mut W, message: &str, enable_colors: bool) -> io::Result<()> {
    print_message(writer, "done:", message, ThemeEntry::Success, enable_colors)
}

pub fn print_warn_message<W: Write>(writer: &mut W, message: &str, enable_colors: bool) -> io::Result<()> {
    print_message(writer, "warning:", message, ThemeEntry::Warn, enable_colors)
}

pub fn print_error_message<W: Write>(writer: &mut W, message: &str, enable_colors: bool) -> io::Result<()> {
    print_message(writer, "error:", message, ThemeEntry::Error, enable_colors)
}

/// A prompt label followed by a space, styled when `enable_colors` is set.
pub fn prompt_text(label: &str, enable_colors: bool) -> String {
    format!("{} ", paint(label, ThemeEntry::Prompt, enable_colors))
}

/// Helper for printing info messages to stderr.
pub fn info_msg(msg: impl AsRef<str>) {
    let colors = io::stderr().is_terminal();
    let _ = print_info_message(&mut io::stderr(), msg.as_ref(), colors);
}

pub fn success_msg(msg: impl AsRef<str>) {
    let colors = io::stderr().is_terminal();
    let _ = print_success_message(&mut io::stderr(), msg.as_ref(), colors);
}

pub fn warn_msg(msg: impl AsRef<str>) {
    let colors = io::stderr().is_terminal();
    let _ = print_warn_message(&mut io::stderr(), msg.as_ref(), colors);
}

pub fn error_msg(msg: impl AsRef<str>) {
    let colors = io::stderr().is_terminal();
    let _ = print_error_message(&mut io::stderr(), msg.as_ref(), colors);
}
