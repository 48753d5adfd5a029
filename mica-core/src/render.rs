//! Markdown-to-HTML rendering seam.
//!
//! The pipeline treats rendering as a black-box capability; the default
//! implementation wraps pulldown-cmark.

use pulldown_cmark::{html, Options, Parser};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Markdown rendering failed: {0}")]
    Failed(String),
}

/// Pure markdown-to-HTML capability. Implementations must not assume any
/// side effects are observed by the pipeline.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> Result<String, RenderError>;
}

/// Default renderer with the extension set used across published notes.
pub struct CmarkRenderer {
    options: Options,
}

impl CmarkRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }
}

impl Default for CmarkRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer for CmarkRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let parser = Parser::new_ext(markdown, self.options);
        let mut out = String::new();
        html::push_html(&mut out, parser);
        Ok(out)
    }
}
