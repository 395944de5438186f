//! StudyPal core: turn a PDF into something a student can learn from.
//!
//! Pipeline: extract text from a document, summarize it, answer questions
//! about it, rewrite explanations for a difficulty tier, generate and grade
//! quizzes, and track study progress (sessions, streaks, achievements) in
//! SQLite. Every engine that can use a generative backend has a
//! deterministic rule-based fallback, so the whole pipeline works offline.

pub mod adapt;
pub mod ai_client;
pub mod answer;
pub mod app_state;
pub mod db;
pub mod extract;
pub mod progress;
pub mod quiz;
pub mod settings;
pub mod speech;
pub mod summary;

pub use adapt::{AdaptiveResponse, DifficultyAdapter, DifficultyLevel};
pub use answer::AnswerEngine;
pub use app_state::StudyContext;
pub use db::{Database, Document, LearningStats, QuizResult, StudySession};
pub use extract::{ExtractionError, TextExtractor};
pub use progress::ProgressTracker;
pub use quiz::{AnswerEvaluation, QuestionType, Quiz, QuizEngine, QuizQuestion};
pub use speech::{Synthesizer, Transcriber};
pub use summary::{SummaryEngine, SummaryResult};
