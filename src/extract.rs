//! PDF text extraction with strategy fallback
//!
//! Wraps the pdf-extract crate behind an ordered list of strategies:
//! layout-aware full-document extraction, per-page extraction, then
//! in-memory extraction of the raw bytes. The first strategy producing
//! more than MIN_TEXT_LEN non-whitespace characters wins; partial
//! results are never merged across strategies.

use std::path::Path;
use thiserror::Error;

/// Minimum usable output; anything shorter is treated as a failed attempt
/// (and, for the primary strategy, as a scanned-PDF signal)
const MIN_TEXT_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("all extraction methods failed for {path}: {detail}")]
    AllMethodsFailed { path: String, detail: String },
}

/// One extraction attempt with a uniform contract
pub trait ExtractionStrategy {
    fn name(&self) -> &'static str;
    fn attempt(&self, path: &Path) -> Result<String, String>;
}

/// Layout-aware extraction over the whole document (best for tables)
struct LayoutStrategy;

impl ExtractionStrategy for LayoutStrategy {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn attempt(&self, path: &Path) -> Result<String, String> {
        pdf_extract::extract_text(path).map_err(|e| e.to_string())
    }
}

/// Simple per-page extraction, pages joined with blank lines
struct PerPageStrategy;

impl ExtractionStrategy for PerPageStrategy {
    fn name(&self) -> &'static str {
        "per-page"
    }

    fn attempt(&self, path: &Path) -> Result<String, String> {
        let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| e.to_string())?;
        Ok(pages.join("\n\n"))
    }
}

/// In-memory rendering of the raw file bytes (catches PDFs the
/// path-based reader chokes on)
struct MemStrategy;

impl ExtractionStrategy for MemStrategy {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    fn attempt(&self, path: &Path) -> Result<String, String> {
        let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
    }
}

pub struct TextExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy + Send + Sync>>,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor {
    pub fn new() -> Self {
        TextExtractor {
            strategies: vec![
                Box::new(LayoutStrategy),
                Box::new(PerPageStrategy),
                Box::new(MemStrategy),
            ],
        }
    }

    #[cfg(test)]
    fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy + Send + Sync>>) -> Self {
        TextExtractor { strategies }
    }

    /// Extract cleaned text, trying each strategy in priority order.
    ///
    /// Fails only if every strategy errors or yields sub-threshold output.
    pub fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let mut last_error = String::from("no strategies configured");

        for strategy in &self.strategies {
            match strategy.attempt(path) {
                Ok(text) if usable(&text) => {
                    eprintln!("[Extract] {} strategy succeeded", strategy.name());
                    return Ok(clean_text(&text));
                }
                Ok(text) => {
                    last_error = format!(
                        "{} strategy yielded only {} chars",
                        strategy.name(),
                        text.trim().len()
                    );
                    eprintln!("[Extract] {}", last_error);
                }
                Err(e) => {
                    last_error = format!("{} strategy failed: {}", strategy.name(), e);
                    eprintln!("[Extract] {}", last_error);
                }
            }
        }

        Err(ExtractionError::AllMethodsFailed {
            path: path.display().to_string(),
            detail: last_error,
        })
    }

    /// True when the primary strategy yields too little text, likely an
    /// image-only PDF that would need OCR
    pub fn is_scanned_document(&self, path: &Path) -> bool {
        match self.strategies.first() {
            Some(primary) => match primary.attempt(path) {
                Ok(text) => text.trim().len() < MIN_TEXT_LEN,
                Err(_) => true,
            },
            None => true,
        }
    }

    /// Best-effort page count; 0 when the document cannot be read
    pub fn page_count(&self, path: &Path) -> usize {
        pdf_extract::extract_text_by_pages(path)
            .map(|pages| pages.len())
            .unwrap_or(0)
    }
}

fn usable(text: &str) -> bool {
    text.trim().len() > MIN_TEXT_LEN
}

/// Normalize extracted text: trim every line, collapse whitespace runs to
/// single spaces and blank-line runs to one blank line
pub fn clean_text(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut blank_pending = false;

    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if !out.is_empty() {
                blank_pending = true;
            }
        } else {
            if blank_pending {
                out.push(String::new());
                blank_pending = false;
            }
            out.push(collapsed);
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FixedStrategy {
        name: &'static str,
        result: Result<String, String>,
    }

    impl ExtractionStrategy for FixedStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn attempt(&self, _path: &Path) -> Result<String, String> {
            self.result.clone()
        }
    }

    fn long_text() -> String {
        "This page has plenty of real text content. ".repeat(5)
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        let raw = "A  line   with\tgaps\n\n\n\nnext   paragraph\n   indented line   \n";
        let cleaned = clean_text(raw);
        assert_eq!(cleaned, "A line with gaps\n\nnext paragraph\nindented line");
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("\n\n  \n"), "");
    }

    #[test]
    fn test_first_usable_strategy_wins() {
        let extractor = TextExtractor::with_strategies(vec![
            Box::new(FixedStrategy {
                name: "broken",
                result: Err("corrupt xref".to_string()),
            }),
            Box::new(FixedStrategy {
                name: "good",
                result: Ok(long_text()),
            }),
            Box::new(FixedStrategy {
                name: "unreached",
                result: Ok("other text".to_string()),
            }),
        ]);

        let text = extractor.extract(&PathBuf::from("doc.pdf")).unwrap();
        assert!(text.contains("plenty of real text"));
    }

    #[test]
    fn test_sub_threshold_output_is_rejected() {
        // 100-char threshold: a short result must fall through to the next
        // strategy, never be accepted
        let extractor = TextExtractor::with_strategies(vec![
            Box::new(FixedStrategy {
                name: "thin",
                result: Ok("tiny".to_string()),
            }),
            Box::new(FixedStrategy {
                name: "full",
                result: Ok(long_text()),
            }),
        ]);

        let text = extractor.extract(&PathBuf::from("doc.pdf")).unwrap();
        assert!(text.contains("plenty of real text"));
    }

    #[test]
    fn test_all_strategies_exhausted_errors() {
        let extractor = TextExtractor::with_strategies(vec![
            Box::new(FixedStrategy {
                name: "thin",
                result: Ok("tiny".to_string()),
            }),
            Box::new(FixedStrategy {
                name: "broken",
                result: Err("encrypted".to_string()),
            }),
        ]);

        let err = extractor.extract(&PathBuf::from("doc.pdf")).unwrap_err();
        assert!(err.to_string().contains("all extraction methods failed"));
    }

    #[test]
    fn test_scanned_detection_uses_primary_only() {
        let extractor = TextExtractor::with_strategies(vec![
            Box::new(FixedStrategy {
                name: "thin",
                result: Ok("image-only".to_string()),
            }),
            Box::new(FixedStrategy {
                name: "full",
                result: Ok(long_text()),
            }),
        ]);

        assert!(extractor.is_scanned_document(&PathBuf::from("scan.pdf")));
    }
}
