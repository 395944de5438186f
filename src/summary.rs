//! Extractive summarization with a generative first tier
//!
//! Tier order: AI service (when configured) then the rule-based extractor,
//! which is always available and never fails. Whatever tier produces the
//! overview, word counts come from the same whitespace tokenization so the
//! metrics stay comparable.

use serde::{Deserialize, Serialize};

use crate::ai_client::{self, AiClient};

/// Which tier produced a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedBy {
    AiService,
    LocalModel,
    RuleBased,
}

impl GeneratedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratedBy::AiService => "ai_service",
            GeneratedBy::LocalModel => "local_model",
            GeneratedBy::RuleBased => "rule_based",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub overview: String,
    pub key_points: Vec<String>,
    pub word_count: usize,
    pub summary_length: usize,
    pub generated_by: GeneratedBy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_reading_time: Option<String>,
}

/// Sentences scoring higher on these domain terms bubble up
const EDUCATIONAL_KEYWORDS: [&str; 6] = ["important", "key", "main", "study", "learn", "concept"];

/// Chunk size for the generative tier, bytes at a char boundary
const AI_CHUNK_BYTES: usize = 3000;

/// Average adult reading speed, words per minute
const READING_WPM: usize = 200;

pub struct SummaryEngine {
    ai: Option<AiClient>,
}

impl SummaryEngine {
    pub fn new(ai: Option<AiClient>) -> Self {
        SummaryEngine { ai }
    }

    /// Summarize text. Never fails: any internal error falls back to the
    /// rule-based extractor, which itself degrades to placeholder text.
    pub async fn summarize(&self, text: &str, max_length: usize) -> SummaryResult {
        if let Some(ai) = &self.ai {
            match self.ai_summary(ai, text, max_length).await {
                Ok(result) => return result,
                Err(e) => {
                    eprintln!("[Summary] AI tier failed, using rule-based: {}", e);
                }
            }
        }

        self.rule_based_summary(text)
    }

    /// Generative tier: chunk the text, summarize each window, concatenate
    async fn ai_summary(
        &self,
        ai: &AiClient,
        text: &str,
        max_length: usize,
    ) -> Result<SummaryResult, String> {
        if text.trim().len() < 20 {
            return Err("text too short for AI summarization".to_string());
        }

        let mut overviews: Vec<String> = Vec::new();
        let mut key_points: Vec<String> = Vec::new();
        let mut topics: Vec<String> = Vec::new();

        for chunk in chunk_text(text, AI_CHUNK_BYTES) {
            let prompt = format!(
                r#"Summarize this educational content for a student.

CONTENT:
{}

Keep the overview within {} words.

Return ONLY valid JSON, no markdown:
{{"overview": "...", "key_points": ["...", "..."], "topics": ["...", "..."]}}"#,
                chunk, max_length
            );

            let response = ai.complete(&prompt, 800).await?;
            let json_text = ai_client::strip_markdown_fences(&response);
            let json: serde_json::Value = serde_json::from_str(&json_text)
                .map_err(|e| format!("Failed to parse summary JSON: {}", e))?;

            if let Some(o) = json.get("overview").and_then(|v| v.as_str()) {
                overviews.push(o.to_string());
            }
            if let Some(arr) = json.get("key_points").and_then(|v| v.as_array()) {
                key_points.extend(arr.iter().filter_map(|v| v.as_str().map(String::from)));
            }
            if let Some(arr) = json.get("topics").and_then(|v| v.as_array()) {
                for t in arr.iter().filter_map(|v| v.as_str()) {
                    if !topics.iter().any(|x| x.eq_ignore_ascii_case(t)) {
                        topics.push(t.to_string());
                    }
                }
            }
        }

        if overviews.is_empty() {
            return Err("AI returned no usable overview".to_string());
        }

        let overview = overviews.join(" ");
        let word_count = count_words(text);
        let summary_length = count_words(&overview);

        Ok(SummaryResult {
            overview,
            key_points,
            word_count,
            summary_length,
            generated_by: GeneratedBy::AiService,
            topics: if topics.is_empty() { None } else { Some(topics) },
            difficulty_level: None,
            estimated_reading_time: Some(reading_time(word_count)),
        })
    }

    /// Rule-based extractive tier. Always available, never fails.
    pub fn rule_based_summary(&self, text: &str) -> SummaryResult {
        let word_count = count_words(text);

        if text.trim().len() < 20 {
            return SummaryResult {
                overview: "Text too short for meaningful summary.".to_string(),
                key_points: vec!["Please provide more content for analysis.".to_string()],
                word_count,
                summary_length: 0,
                generated_by: GeneratedBy::RuleBased,
                topics: None,
                difficulty_level: None,
                estimated_reading_time: None,
            };
        }

        let sentences: Vec<&str> = text
            .split('.')
            .map(|s| s.trim())
            .filter(|s| s.len() > 10)
            .collect();

        if sentences.is_empty() {
            return SummaryResult {
                overview: "No clear sentences found in the text.".to_string(),
                key_points: vec!["Please check the document formatting.".to_string()],
                word_count,
                summary_length: 0,
                generated_by: GeneratedBy::RuleBased,
                topics: None,
                difficulty_level: None,
                estimated_reading_time: Some(reading_time(word_count)),
            };
        }

        // Score only the first 20 sentences; openings carry the thesis
        let mut scored: Vec<(&str, i32)> = sentences
            .iter()
            .take(20)
            .enumerate()
            .map(|(i, s)| (*s, score_sentence(i, s)))
            .collect();

        // Stable sort keeps document order for equal scores
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let top: Vec<&str> = scored.iter().take(3).map(|(s, _)| *s).collect();
        let key_points: Vec<String> = scored
            .iter()
            .take(5)
            .map(|(s, _)| s.to_string())
            .collect();

        let overview = if top.is_empty() {
            "Summary of the educational content.".to_string()
        } else {
            format!("{}.", top.join(". "))
        };

        let summary_length = count_words(&overview);

        SummaryResult {
            overview,
            key_points,
            word_count,
            summary_length,
            generated_by: GeneratedBy::RuleBased,
            topics: None,
            difficulty_level: None,
            estimated_reading_time: Some(reading_time(word_count)),
        }
    }
}

/// Position prior + length prior + domain-term prior
fn score_sentence(index: usize, sentence: &str) -> i32 {
    let mut score = 0;

    if index < 3 {
        score += 3;
    } else if index < 6 {
        score += 1;
    }

    let words = count_words(sentence);
    if (8..=25).contains(&words) {
        score += 2;
    }

    let lower = sentence.to_lowercase();
    for keyword in EDUCATIONAL_KEYWORDS {
        if lower.contains(keyword) {
            score += 1;
        }
    }

    score
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn reading_time(word_count: usize) -> String {
    let minutes = (word_count + READING_WPM - 1) / READING_WPM;
    format!("~{} min read", minutes.max(1))
}

/// Split text into windows of at most max_bytes, cut at char boundaries
fn chunk_text(text: &str, max_bytes: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        if rest.len() <= max_bytes {
            chunks.push(rest);
            break;
        }
        let mut end = max_bytes;
        while end > 0 && !rest.is_char_boundary(end) {
            end -= 1;
        }
        chunks.push(&rest[..end]);
        rest = &rest[end..];
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SummaryEngine {
        SummaryEngine::new(None)
    }

    #[tokio::test]
    async fn test_summary_deterministic_without_ai() {
        let text = "The water cycle is a key concept in earth science and worth careful study. \
                    Evaporation lifts water from oceans into the atmosphere where it cools. \
                    Condensation forms clouds. Precipitation returns the water to the surface. \
                    Runoff carries it back to the sea.";

        let a = engine().summarize(text, 500).await;
        let b = engine().summarize(text, 500).await;
        assert_eq!(a.overview, b.overview);
        assert_eq!(a.key_points, b.key_points);
        assert_eq!(a.generated_by, GeneratedBy::RuleBased);
    }

    #[tokio::test]
    async fn test_summary_never_fails_on_garbage() {
        for text in ["", "   ", "....", "a.b.c", "@@@###$$$ %%% ^^^", "\n\n\n\t"] {
            let result = engine().summarize(text, 500).await;
            assert!(!result.overview.is_empty());
            assert!(!result.key_points.is_empty());
        }
    }

    #[tokio::test]
    async fn test_short_text_placeholder() {
        let result = engine().summarize("Too short.", 500).await;
        assert_eq!(result.overview, "Text too short for meaningful summary.");
        assert_eq!(result.summary_length, 0);
    }

    #[tokio::test]
    async fn test_three_sentence_document_keeps_all() {
        let text = "The sun is the center of our solar system. \
                    Photosynthesis converts sunlight into energy. \
                    Plants need water to grow.";

        let result = engine().summarize(text, 500).await;

        // Fewer than 20 sentences, so all three are scored; all make keyPoints
        assert_eq!(result.key_points.len(), 3);
        assert!(result.overview.contains("The sun is the center of our solar system"));
        assert!(result.overview.contains("Photosynthesis converts sunlight into energy"));
        assert!(result.overview.contains("Plants need water to grow"));
        // First sentence wins the length prior on top of the position prior
        assert!(result.overview.starts_with("The sun"));
    }

    #[test]
    fn test_stable_tie_break_preserves_order() {
        let engine = engine();
        // Sentences 2 and 3 tie on score; document order must hold
        let text = "First statement of the piece here with several more words added. \
                    Second short one here. Third short one here. Fourth short one here.";
        let result = engine.rule_based_summary(text);

        let second = result
            .key_points
            .iter()
            .position(|s| s.contains("Second"))
            .unwrap();
        let third = result
            .key_points
            .iter()
            .position(|s| s.contains("Third"))
            .unwrap();
        assert!(second < third);
    }

    #[test]
    fn test_word_count_independent_of_tier() {
        let text = "Cells are the basic unit of life and a main concept in biology. \
                    They divide through mitosis.";
        let result = engine().rule_based_summary(text);
        assert_eq!(result.word_count, text.split_whitespace().count());
        assert_eq!(result.summary_length, result.overview.split_whitespace().count());
    }

    #[test]
    fn test_keyword_scoring_promotes_late_sentence() {
        // Filler early sentences, a keyword-heavy one later
        let mut text = String::new();
        for i in 0..8 {
            text.push_str(&format!("Filler sentence number {} goes right here today. ", i));
        }
        text.push_str(
            "The key concept to study here is the important main idea you must learn well. ",
        );

        let result = engine().rule_based_summary(&text);
        assert!(result
            .key_points
            .iter()
            .any(|s| s.contains("key concept")));
    }

    #[test]
    fn test_chunking_boundaries() {
        let text = "é".repeat(2000); // 4000 bytes of 2-byte chars
        let chunks = chunk_text(&text, 3000);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() <= 3000));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time(100), "~1 min read");
        assert_eq!(reading_time(450), "~3 min read");
    }
}
