//! Text normalization applied before chunking.
//!
//! Raw admin-submitted text arrives with inconsistent spacing (pasted
//! from word processors, CMS editors, PDFs). Normalization makes chunk
//! boundaries deterministic for identical content.

/// Collapse whitespace runs and trim.
///
/// Rules, applied in one pass:
/// - any whitespace run containing a newline becomes a single `\n`
/// - any other whitespace run becomes a single space
/// - leading and trailing whitespace is removed
///
/// Total for any input; the empty string maps to itself.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending: Option<char> = None;

    for c in text.chars() {
        if c.is_whitespace() {
            // A newline anywhere in the run wins over spaces/tabs.
            if c == '\n' || c == '\r' {
                pending = Some('\n');
            } else if pending.is_none() {
                pending = Some(' ');
            }
        } else {
            if let Some(sep) = pending.take() {
                if !out.is_empty() {
                    out.push(sep);
                }
            }
            out.push(c);
        }
    }

    out
}
