//! Quiz generation and answer evaluation
//!
//! Topics come from the generative backend (with a generic fallback so
//! generation never stalls); each question slot picks a random type and
//! topic and asks the backend for one question via a type- and
//! tier-specific prompt. A failed slot is dropped, not fatal, so a
//! returned quiz may hold fewer questions than requested.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::adapt::DifficultyLevel;
use crate::ai_client::{self, AiClient};
use crate::settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillBlank,
    ShortAnswer,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "mcq",
            QuestionType::TrueFalse => "true_false",
            QuestionType::FillBlank => "fill_blank",
            QuestionType::ShortAnswer => "short_answer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mcq" => Some(QuestionType::MultipleChoice),
            "true_false" => Some(QuestionType::TrueFalse),
            "fill_blank" => Some(QuestionType::FillBlank),
            "short_answer" => Some(QuestionType::ShortAnswer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub difficulty: DifficultyLevel,
    /// Present with at least 2 entries iff question_type is MultipleChoice
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub explanation: String,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub description: String,
    pub questions: Vec<QuizQuestion>,
    pub difficulty: DifficultyLevel,
    pub total_questions: usize,
    pub estimated_time_minutes: usize,
}

/// Outcome of grading one submitted answer; score is always 0 or 1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvaluation {
    pub correct: bool,
    pub score: u32,
    pub user_answer: String,
    pub correct_answer: String,
    pub explanation: String,
}

/// Type- and tier-specific generation prompt with a format example
fn question_prompt(qtype: QuestionType, level: DifficultyLevel) -> (&'static str, &'static str) {
    use DifficultyLevel::*;
    use QuestionType::*;
    match (qtype, level) {
        (MultipleChoice, Kid) => (
            "Create a simple multiple choice question about {topic} for kids (age 8-12). Use simple words and fun examples. Question should test basic understanding.",
            "What is water made of?\nA) Only hydrogen\nB) Only oxygen\nC) Hydrogen and oxygen\nD) Carbon and nitrogen",
        ),
        (MultipleChoice, Teen) => (
            "Create a multiple choice question about {topic} for teenagers (age 13-17). Use moderate difficulty and clear explanations.",
            "Which process describes how plants make their own food?\nA) Respiration\nB) Photosynthesis\nC) Digestion\nD) Circulation",
        ),
        (MultipleChoice, College) => (
            "Create a technical multiple choice question about {topic} for college students. Include scientific terminology and complex concepts.",
            "In photosynthesis, the light-dependent reactions occur in:\nA) Stroma\nB) Thylakoid membranes\nC) Cytoplasm\nD) Nucleus",
        ),
        (TrueFalse, Kid) => (
            "Create a simple true/false question about {topic} for kids. Use easy concepts they can understand.",
            "True or False: Fish breathe air like humans do.",
        ),
        (TrueFalse, Teen) => (
            "Create a true/false question about {topic} for teenagers with moderate complexity.",
            "True or False: All chemical reactions release energy.",
        ),
        (TrueFalse, College) => (
            "Create a technical true/false question about {topic} for college students.",
            "True or False: ATP synthase uses chemiosmosis to produce ATP during oxidative phosphorylation.",
        ),
        (FillBlank, Kid) => (
            "Create a fill-in-the-blank question about {topic} for kids using simple words.",
            "The _____ is the center of our solar system.",
        ),
        (FillBlank, Teen) => (
            "Create a fill-in-the-blank question about {topic} for teenagers.",
            "During _____, plants convert carbon dioxide and water into glucose using sunlight.",
        ),
        (FillBlank, College) => (
            "Create a technical fill-in-the-blank question about {topic} for college students.",
            "The _____ hypothesis states that mitochondria and chloroplasts evolved from ancient bacteria.",
        ),
        (ShortAnswer, Kid) => (
            "Create a short answer question about {topic} for kids. Keep it simple and fun.",
            "Why do we need to drink water every day?",
        ),
        (ShortAnswer, Teen) => (
            "Create a short answer question about {topic} for teenagers requiring 2-3 sentences.",
            "Explain how the water cycle helps distribute water around Earth.",
        ),
        (ShortAnswer, College) => (
            "Create a detailed short answer question about {topic} for college students requiring technical explanation.",
            "Describe the molecular mechanism of enzyme catalysis and factors affecting enzyme activity.",
        ),
    }
}

pub struct QuizEngine {
    ai: Option<AiClient>,
    /// Lenient short-answer grading (any shared answer token counts);
    /// strict mode requires an exact normalized match
    lenient_grading: bool,
}

impl QuizEngine {
    pub fn new(ai: Option<AiClient>) -> Self {
        QuizEngine {
            ai,
            lenient_grading: settings::lenient_grading(),
        }
    }

    #[cfg(test)]
    fn with_grading(lenient: bool) -> Self {
        QuizEngine {
            ai: None,
            lenient_grading: lenient,
        }
    }

    /// Generate a quiz from document content. Never fails; failed question
    /// slots are dropped, so the quiz may be shorter than requested.
    pub async fn generate_quiz(
        &self,
        content: &str,
        difficulty: DifficultyLevel,
        num_questions: usize,
        question_types: &[QuestionType],
    ) -> Quiz {
        let types: Vec<QuestionType> = if question_types.is_empty() {
            vec![QuestionType::MultipleChoice, QuestionType::TrueFalse]
        } else {
            question_types.to_vec()
        };

        let topics = self.extract_topics(content).await;

        let mut questions = Vec::new();
        for _ in 0..num_questions {
            let (qtype, topic) = {
                let mut rng = rand::thread_rng();
                let qtype = *types.choose(&mut rng).unwrap_or(&QuestionType::MultipleChoice);
                let topic = topics
                    .choose(&mut rng)
                    .cloned()
                    .unwrap_or_else(|| "general content".to_string());
                (qtype, topic)
            };

            match self.generate_question(content, &topic, qtype, difficulty).await {
                Some(question) => questions.push(question),
                None => eprintln!("[Quiz] dropped a {} slot for topic '{}'", qtype.as_str(), topic),
            }
        }

        let quiz_id = format!("quiz_{}", rand::thread_rng().gen_range(1000..10000));
        let title = format!("Quiz - {} Level", capitalize(difficulty.as_str()));

        Quiz {
            id: quiz_id,
            title,
            description: format!("Test your understanding with {} questions", questions.len()),
            total_questions: questions.len(),
            estimated_time_minutes: questions.len() * 2,
            questions,
            difficulty,
        }
    }

    /// Ask the backend for 5-10 salient topics; fall back to one generic
    /// topic so generation never stalls
    async fn extract_topics(&self, content: &str) -> Vec<String> {
        if let Some(ai) = &self.ai {
            let preview = ai_client::truncate_for_prompt(content, 2000);
            let prompt = format!(
                "Analyze this educational content and extract 5-10 key topics or concepts \
                 that could be used for quiz questions.\n\
                 Return only the topic names, one per line.\n\n\
                 Content: {}",
                preview
            );

            match ai.complete(&prompt, 300).await {
                Ok(response) => {
                    let topics: Vec<String> = response
                        .lines()
                        .map(|l| l.trim().trim_start_matches(['-', '*', ' ']).to_string())
                        .filter(|l| !l.is_empty())
                        .take(10)
                        .collect();
                    if !topics.is_empty() {
                        return topics;
                    }
                }
                Err(e) => eprintln!("[Quiz] topic extraction failed: {}", e),
            }
        }

        vec!["general content".to_string()]
    }

    /// Generate one question; None drops the slot
    async fn generate_question(
        &self,
        content: &str,
        topic: &str,
        qtype: QuestionType,
        difficulty: DifficultyLevel,
    ) -> Option<QuizQuestion> {
        let ai = self.ai.as_ref()?;

        let (template, example) = question_prompt(qtype, difficulty);
        let preview = ai_client::truncate_for_prompt(content, 1500);

        let prompt = format!(
            r#"Based on this educational content, {}

Content: {}

Return your response in this JSON format:
{{
    "question": "your question here",
    "options": ["A) option1", "B) option2", "C) option3", "D) option4"],
    "correct_answer": "correct answer here",
    "explanation": "why this is correct"
}}
(Include "options" only for multiple choice.)

Example format: {}"#,
            template.replace("{topic}", topic),
            preview,
            example
        );

        let response = match ai.complete(&prompt, 500).await {
            Ok(r) => r,
            Err(e) => {
                eprintln!("[Quiz] generation failed: {}", e);
                return None;
            }
        };

        let parsed = parse_structured_response(&response)
            .unwrap_or_else(|| parse_lines_response(&response, qtype));

        build_question(parsed, qtype, difficulty, topic)
    }

    /// Grade a submitted answer against the stored correct answer
    pub fn evaluate_answer(&self, question: &QuizQuestion, user_answer: &str) -> AnswerEvaluation {
        let correct = self.check_answer(question, user_answer);

        AnswerEvaluation {
            correct,
            score: if correct { 1 } else { 0 },
            user_answer: user_answer.to_string(),
            correct_answer: question.correct_answer.clone(),
            explanation: question.explanation.clone(),
        }
    }

    fn check_answer(&self, question: &QuizQuestion, user_answer: &str) -> bool {
        let user = user_answer.trim().to_lowercase();
        let correct = question.correct_answer.trim().to_lowercase();

        if user.is_empty() {
            return false;
        }

        match question.question_type {
            QuestionType::MultipleChoice => {
                // Accept the bare option letter or the full option text,
                // whichever form the stored correct answer uses
                if user == correct {
                    true
                } else if user.len() == 1 {
                    correct.starts_with(&format!("{})", user))
                } else {
                    correct.contains(&user) || user.contains(&correct)
                }
            }
            QuestionType::TrueFalse => {
                let user_bool = ["true", "t", "yes", "y"].contains(&user.as_str());
                let correct_bool = ["true", "t", "yes", "y"].contains(&correct.as_str());
                user_bool == correct_bool
            }
            QuestionType::FillBlank | QuestionType::ShortAnswer => {
                if self.lenient_grading {
                    // Deliberately forgiving: any answer token appearing in
                    // the correct answer counts
                    user.split_whitespace().any(|word| correct.contains(word))
                } else {
                    user == correct
                }
            }
        }
    }
}

/// Fields pulled out of a generation response before validation
#[derive(Debug, Default)]
struct ParsedQuestion {
    question: String,
    options: Vec<String>,
    correct_answer: String,
    explanation: String,
}

/// Primary parser: strict JSON after stripping markdown fences
fn parse_structured_response(response: &str) -> Option<ParsedQuestion> {
    let json_text = ai_client::strip_markdown_fences(response);
    let json: serde_json::Value = serde_json::from_str(&json_text).ok()?;

    let question = json.get("question")?.as_str()?.to_string();
    let options = json
        .get("options")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();
    let correct_answer = json
        .get("correct_answer")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let explanation = json
        .get("explanation")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Some(ParsedQuestion {
        question,
        options,
        correct_answer,
        explanation,
    })
}

/// Fallback line heuristic: first line is the question, "A)".."D)" lines
/// are options, "answer"/"explanation" lines carry those fields
fn parse_lines_response(response: &str, qtype: QuestionType) -> ParsedQuestion {
    let mut parsed = ParsedQuestion::default();

    for (i, line) in response.trim().lines().enumerate() {
        let line = line.trim();
        if i == 0 {
            parsed.question = line.to_string();
        } else if qtype == QuestionType::MultipleChoice
            && ["A)", "B)", "C)", "D)"].iter().any(|p| line.starts_with(p))
        {
            parsed.options.push(line.to_string());
        } else if line.to_lowercase().contains("answer") {
            parsed.correct_answer = line.rsplit(':').next().unwrap_or("").trim().to_string();
        } else if line.to_lowercase().contains("explanation") {
            parsed.explanation = line.rsplit(':').next().unwrap_or("").trim().to_string();
        }
    }

    parsed
}

/// Validate parsed fields into a QuizQuestion; None drops the slot.
/// Enforces the MCQ invariant: at least 2 options, and none elsewhere.
fn build_question(
    parsed: ParsedQuestion,
    qtype: QuestionType,
    difficulty: DifficultyLevel,
    topic: &str,
) -> Option<QuizQuestion> {
    if parsed.question.trim().is_empty() || parsed.correct_answer.trim().is_empty() {
        return None;
    }

    let options = match qtype {
        QuestionType::MultipleChoice => {
            if parsed.options.len() < 2 {
                return None;
            }
            Some(parsed.options)
        }
        _ => None,
    };

    Some(QuizQuestion {
        id: format!("q_{}", rand::thread_rng().gen_range(10000..100000)),
        question: parsed.question,
        question_type: qtype,
        difficulty,
        options,
        correct_answer: parsed.correct_answer,
        explanation: parsed.explanation,
        topic: topic.to_string(),
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().chain(chars).collect(),
    }
}
