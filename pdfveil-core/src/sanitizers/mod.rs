//! Rule compilation for the regex sanitization engine.
//!
//! This module turns `RedactionRule`s into compiled regular expressions and
//! keeps a process-wide cache of them, so that every request running the same
//! rule set shares one compiled copy.

pub mod compiler;
