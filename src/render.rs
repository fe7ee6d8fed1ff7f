//! Safe highlight rendering
//!
//! Reference implementation of the render contract: every piece of verse or
//! note text is escaped before any markup is placed around match spans. The
//! engine itself only hands out spans; this is the one place markup is made.

use thiserror::Error;

use crate::search::MatchSpan;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Span {offset}+{length} is outside the text ({len} bytes)")]
    OutOfBounds {
        offset: usize,
        length: usize,
        len: usize,
    },

    #[error("Span {offset}+{length} does not fall on character boundaries")]
    NotCharBoundary { offset: usize, length: usize },

    #[error("Span at {offset} overlaps the previous span")]
    Overlapping { offset: usize },

    #[error("Invalid element name \"{0}\"")]
    InvalidElement(String),
}

/// Markup used to wrap each span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupConfig {
    /// Element name; ASCII letters and digits only
    pub element: String,
    /// Class attribute value, escaped on output
    pub class: Option<String>,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            element: "mark".to_string(),
            class: Some("verse-match".to_string()),
        }
    }
}

/// Escape `text` and wrap each span in the configured element.
///
/// Spans must be sorted, non-overlapping and on char boundaries.
pub fn highlight_markup(
    text: &str,
    spans: &[MatchSpan],
    config: &MarkupConfig,
) -> Result<String, RenderError> {
    if config.element.is_empty() || !config.element.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(RenderError::InvalidElement(config.element.clone()));
    }

    let open = match &config.class {
        Some(class) => format!(
            "<{} class=\"{}\">",
            config.element,
            html_escape::encode_double_quoted_attribute(class)
        ),
        None => format!("<{}>", config.element),
    };
    let close = format!("</{}>", config.element);

    let mut out = String::with_capacity(text.len() + spans.len() * (open.len() + close.len()));
    let mut cursor = 0;
    for span in spans {
        let end = span
            .offset
            .checked_add(span.length)
            .filter(|end| *end <= text.len())
            .ok_or(RenderError::OutOfBounds {
                offset: span.offset,
                length: span.length,
                len: text.len(),
            })?;
        if !text.is_char_boundary(span.offset) || !text.is_char_boundary(end) {
            return Err(RenderError::NotCharBoundary {
                offset: span.offset,
                length: span.length,
            });
        }
        if span.offset < cursor {
            return Err(RenderError::Overlapping {
                offset: span.offset,
            });
        }

        out.push_str(&html_escape::encode_text(&text[cursor..span.offset]));
        out.push_str(&open);
        out.push_str(&html_escape::encode_text(&text[span.offset..end]));
        out.push_str(&close);
        cursor = end;
    }
    out.push_str(&html_escape::encode_text(&text[cursor..]));
    Ok(out)
}
