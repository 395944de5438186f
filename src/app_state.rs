//! Top-level application context
//!
//! Owns one instance of every engine plus the shared database handle, so
//! the presentation layer holds a single StudyContext instead of wiring
//! engines itself. All engines share the same generative-client settings;
//! each falls back to its rule-based path when no client is configured.

use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use uuid::Uuid;

use crate::adapt::{AdaptiveResponse, DifficultyAdapter, DifficultyLevel};
use crate::ai_client::AiClient;
use crate::answer::AnswerEngine;
use crate::db::{ChatMessage, Database, Document, LearningStats, QuizResult};
use crate::extract::{ExtractionError, TextExtractor};
use crate::progress::ProgressTracker;
use crate::quiz::{AnswerEvaluation, Quiz, QuizEngine, QuizQuestion};
use crate::speech::{Synthesizer, Transcriber};
use crate::summary::{SummaryEngine, SummaryResult};

pub struct StudyContext {
    pub db: Arc<Database>,
    extractor: TextExtractor,
    summary: SummaryEngine,
    answer: AnswerEngine,
    adapter: DifficultyAdapter,
    quiz: QuizEngine,
    tracker: ProgressTracker,
    transcriber: Option<Box<dyn Transcriber>>,
    synthesizer: Option<Box<dyn Synthesizer>>,
}

impl StudyContext {
    pub fn new(db: Arc<Database>) -> Self {
        let ai = AiClient::from_settings();
        StudyContext {
            extractor: TextExtractor::new(),
            summary: SummaryEngine::new(ai.clone()),
            answer: AnswerEngine::new(ai.clone()),
            adapter: DifficultyAdapter::new(ai.clone()),
            quiz: QuizEngine::new(ai),
            tracker: ProgressTracker::new(db.clone()),
            transcriber: None,
            synthesizer: None,
            db,
        }
    }

    /// Attach voice backends; text entry points work the same without them
    pub fn with_voice(
        mut self,
        transcriber: Box<dyn Transcriber>,
        synthesizer: Box<dyn Synthesizer>,
    ) -> Self {
        self.transcriber = Some(transcriber);
        self.synthesizer = Some(synthesizer);
        self
    }

    // Extraction

    pub fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        self.extractor.extract(path)
    }

    pub fn is_scanned_document(&self, path: &Path) -> bool {
        self.extractor.is_scanned_document(path)
    }

    /// Extract, summarize and persist a document in one pass
    pub async fn process_document(&self, path: &Path, title: &str) -> Result<Document, String> {
        let content = self.extractor.extract(path).map_err(|e| e.to_string())?;
        let summary = self.summary.summarize(&content, 500).await;

        let mut doc = Document::new(
            Uuid::new_v4().to_string(),
            title.to_string(),
            content,
            path.display().to_string(),
            Local::now().timestamp(),
        );
        doc.page_count = Some(self.extractor.page_count(path));
        doc.summary = Some(summary);

        self.db.insert_document(&doc).map_err(|e| e.to_string())?;
        Ok(doc)
    }

    // Core engines

    pub async fn summarize(&self, text: &str) -> SummaryResult {
        self.summary.summarize(text, 500).await
    }

    pub async fn answer_question(&self, question: &str, context: &str) -> String {
        self.answer.answer(question, context).await
    }

    /// Answer against a stored document and append both sides of the
    /// exchange to the user's chat history
    pub async fn ask_about_document(
        &self,
        user_id: &str,
        document_id: &str,
        question: &str,
    ) -> Result<String, String> {
        let doc = self
            .db
            .get_document(document_id)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("Unknown document: {}", document_id))?;

        let answer = self.answer.answer(question, &doc.content).await;

        let now = Local::now().timestamp();
        for (role, content) in [("user", question), ("assistant", answer.as_str())] {
            let msg = ChatMessage {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                document_id: Some(document_id.to_string()),
                role: role.to_string(),
                content: content.to_string(),
                created_at: now,
            };
            self.db.insert_chat_message(&msg).map_err(|e| e.to_string())?;
        }

        Ok(answer)
    }

    pub async fn adapt_explanation(
        &self,
        content: &str,
        level: DifficultyLevel,
        topic: &str,
    ) -> AdaptiveResponse {
        self.adapter.adapt(content, level, topic).await
    }

    pub async fn generate_quiz(
        &self,
        content: &str,
        difficulty: DifficultyLevel,
        count: usize,
        types: &[crate::quiz::QuestionType],
    ) -> Quiz {
        self.quiz.generate_quiz(content, difficulty, count, types).await
    }

    pub fn evaluate_quiz_answer(
        &self,
        question: &QuizQuestion,
        user_answer: &str,
    ) -> AnswerEvaluation {
        self.quiz.evaluate_answer(question, user_answer)
    }

    // Voice

    /// Capture a spoken question, answer it against the context text, and
    /// speak the answer back. None when no speech was captured or no
    /// transcriber is attached.
    pub async fn voice_ask(&self, context: &str, timeout_secs: u64) -> Option<String> {
        let transcriber = self.transcriber.as_ref()?;
        let question = transcriber.listen(timeout_secs)?;

        let answer = self.answer.answer(&question, context).await;

        if let Some(synth) = &self.synthesizer {
            if !synth.speak(&answer) {
                eprintln!("[Voice] synthesis failed, answer returned as text only");
            }
        }

        Some(answer)
    }

    // Progress

    pub fn create_user(
        &self,
        user_id: &str,
        display_name: &str,
        difficulty: DifficultyLevel,
    ) -> Result<(), String> {
        self.tracker.create_user(user_id, display_name, difficulty)
    }

    pub fn start_session(
        &self,
        user_id: &str,
        document_name: &str,
        difficulty: DifficultyLevel,
    ) -> Result<String, String> {
        self.tracker.start_study_session(user_id, document_name, difficulty)
    }

    pub fn end_session(
        &self,
        session_id: &str,
        pages_studied: i64,
        questions_asked: i64,
    ) -> Result<(), String> {
        self.tracker.end_study_session(session_id, pages_studied, questions_asked)
    }

    pub fn record_quiz_result(&self, result: &QuizResult) -> Result<(), String> {
        self.tracker.record_quiz_result(result)
    }

    pub fn get_stats(&self, user_id: &str) -> Result<LearningStats, String> {
        self.tracker.get_user_stats(user_id)
    }

    pub fn get_achievements(&self, user_id: &str) -> Result<Vec<crate::db::Achievement>, String> {
        self.tracker.get_user_achievements(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::{Synthesizer, Transcriber};

    fn context() -> StudyContext {
        StudyContext::new(Arc::new(Database::in_memory().unwrap()))
    }

    struct CannedTranscriber(&'static str);

    impl Transcriber for CannedTranscriber {
        fn listen(&self, _timeout_secs: u64) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    struct RecordingSynth;

    impl Synthesizer for RecordingSynth {
        fn speak(&self, _text: &str) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_pipeline_text_to_quiz_to_stats() {
        let ctx = context();
        ctx.create_user("u1", "Sam", DifficultyLevel::Teen).unwrap();

        let text = "The sun is the center of our solar system. \
                    Photosynthesis converts sunlight into energy. \
                    Plants need water to grow.";

        let summary = ctx.summarize(text).await;
        assert_eq!(summary.key_points.len(), 3);

        let answer = ctx.answer_question("What is photosynthesis?", text).await;
        assert_eq!(answer, "Photosynthesis converts sunlight into energy.");

        let sid = ctx.start_session("u1", "solar.pdf", DifficultyLevel::Teen).unwrap();
        ctx.end_session(&sid, 3, 1).unwrap();

        let stats = ctx.get_stats("u1").unwrap();
        assert_eq!(stats.documents_studied, 1);
    }

    #[tokio::test]
    async fn test_ask_about_document_records_chat() {
        let ctx = context();
        let doc = Document::new(
            "d1".to_string(),
            "Plants".to_string(),
            "Photosynthesis converts sunlight into energy.".to_string(),
            "/tmp/plants.pdf".to_string(),
            100,
        );
        ctx.db.insert_document(&doc).unwrap();

        let answer = ctx
            .ask_about_document("u1", "d1", "What is photosynthesis?")
            .await
            .unwrap();
        assert!(answer.contains("Photosynthesis"));

        let history = ctx.db.get_chat_messages("u1", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "assistant");
    }

    #[tokio::test]
    async fn test_ask_about_unknown_document_errors() {
        let ctx = context();
        let err = ctx.ask_about_document("u1", "missing", "What?").await.unwrap_err();
        assert!(err.contains("Unknown document"));
    }

    #[tokio::test]
    async fn test_voice_ask_roundtrip() {
        let ctx = context().with_voice(
            Box::new(CannedTranscriber("What is photosynthesis?")),
            Box::new(RecordingSynth),
        );

        let answer = ctx
            .voice_ask("Photosynthesis converts sunlight into energy.", 5)
            .await
            .unwrap();
        assert_eq!(answer, "Photosynthesis converts sunlight into energy.");
    }

    #[tokio::test]
    async fn test_voice_ask_without_backend_is_none() {
        let ctx = context();
        assert!(ctx.voice_ask("context", 5).await.is_none());
    }
}
