//! HTML documents.

use swooce_core::RenderedDocument;

/// A complete HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDocument {
    markup: String,
}

impl HtmlDocument {
    /// Wrap existing markup.
    pub fn from_markup(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }

    /// Build a document around a title and body markup.
    ///
    /// The title is escaped; the body is inserted as is.
    pub fn page(title: &str, body: &str) -> Self {
        let markup = format!(
            r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>{title}</title>
  </head>
  <body>
{body}
  </body>
</html>
"#,
            title = escape_html(title),
            body = body,
        );
        Self { markup }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }
}

impl RenderedDocument for HtmlDocument {
    fn serialize(&self) -> String {
        self.markup.clone()
    }
}

/// Escape HTML special characters, including quotes.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
