//! Terminal text helpers for printing untrusted feed content.

mod text;

pub use text::{fit_width, html_to_text, single_line};
