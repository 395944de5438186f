use serde::{Deserialize, Serialize};

use crate::adapt::DifficultyLevel;
use crate::summary::SummaryResult;

/// A processed study document. Immutable once summarized; re-processing
/// creates a new Document under a new id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub summary: Option<SummaryResult>,
    pub file_path: String,
    pub upload_date: i64,
    pub grade_level: Option<String>,
    pub subject: Option<String>,
    pub language: String,
    pub word_count: usize,
    pub page_count: Option<usize>,
}

impl Document {
    /// word_count derives from content when the caller does not supply one
    pub fn new(id: String, title: String, content: String, file_path: String, upload_date: i64) -> Self {
        let word_count = content.split_whitespace().count();
        Document {
            id,
            title,
            content,
            summary: None,
            file_path,
            upload_date,
            grade_level: None,
            subject: None,
            language: "English".to_string(),
            word_count,
            page_count: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub document_id: Option<String>,
    pub role: String,
    pub content: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
    pub default_difficulty: DifficultyLevel,
    pub created_at: i64,
}

/// Open when end_time is None; closed sessions never change again
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub session_id: String,
    pub user_id: String,
    pub document_name: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub pages_studied: i64,
    pub questions_asked: i64,
    pub difficulty_level: DifficultyLevel,
    pub duration_minutes: i64,
}

/// Append-only record of one submitted quiz
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub quiz_id: String,
    pub user_id: String,
    pub quiz_title: String,
    /// Percentage, 0-100
    pub score: i64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub difficulty_level: DifficultyLevel,
    pub time_taken_minutes: i64,
    pub completion_date: i64,
    pub weak_areas: Vec<String>,
}

/// One row per user per calendar date, incrementally accumulated;
/// the unit for streak computation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    pub user_id: String,
    /// "YYYY-MM-DD"
    pub date: String,
    pub study_minutes: i64,
    pub quizzes_completed: i64,
    pub questions_answered: i64,
}

/// Derived on demand, never stored
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStats {
    pub total_study_minutes: i64,
    pub documents_studied: i64,
    pub quizzes_completed: i64,
    pub average_quiz_score: f64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub favorite_subjects: Vec<String>,
    pub improvement_areas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub unlocked_date: Option<i64>,
    pub target_value: i64,
    pub current_value: i64,
}
