//! Server-rendered HTML for the Text2SQL chat interface.
//!
//! Every view is a plain HTML string assembled on the server and
//! swapped in by HTMX; there is no client-side template layer.
//!
//! # Structure
//!
//! - [`layout`]: Page shell shared by every full-page response
//! - [`sidebar`]: Chat history sidebar with time buckets
//! - [`messages`]: Message bubbles, loading and streaming states
//! - [`results`]: Table and chart fragments for query results
//! - [`pages`]: Login, welcome and knowledge-base pages

pub mod layout;
pub mod messages;
pub mod pages;
pub mod results;
pub mod sidebar;

/// Escape text for safe interpolation into HTML.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape text and turn newlines into `<br>` so multi-line assistant
/// answers keep their line breaks.
pub fn escape_multiline(text: &str) -> String {
    escape(text).replace('\n', "<br>")
}
