use rusqlite::{params, Connection, OptionalExtension, Result};
use std::path::Path;
use std::sync::Mutex;

use super::models::{ChatMessage, Document, QuizResult, StudySession, UserProfile};
use crate::adapt::DifficultyLevel;

pub struct Database {
    conn: Mutex<Connection>,
    path: String,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let conn = Connection::open(&path)?;
        let db = Database { conn: Mutex::new(conn), path: path_str };
        db.init()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn: Mutex::new(conn), path: ":memory:".to_string() };
        db.init()?;
        Ok(db)
    }

    pub fn get_path(&self) -> String {
        self.path.clone()
    }

    fn init(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                default_difficulty TEXT NOT NULL DEFAULT 'teen',
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                summary TEXT,            -- SummaryResult as JSON
                file_path TEXT NOT NULL,
                upload_date INTEGER NOT NULL,
                grade_level TEXT,
                subject TEXT,
                language TEXT NOT NULL DEFAULT 'English',
                word_count INTEGER NOT NULL DEFAULT 0,
                page_count INTEGER
            );

            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                document_id TEXT,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS study_sessions (
                session_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                document_name TEXT NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER,        -- NULL while the session is open
                pages_studied INTEGER NOT NULL DEFAULT 0,
                questions_asked INTEGER NOT NULL DEFAULT 0,
                difficulty_level TEXT NOT NULL DEFAULT 'teen',
                duration_minutes INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS quiz_results (
                quiz_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                quiz_title TEXT NOT NULL,
                score INTEGER NOT NULL,
                total_questions INTEGER NOT NULL,
                correct_answers INTEGER NOT NULL,
                difficulty_level TEXT NOT NULL,
                time_taken_minutes INTEGER NOT NULL DEFAULT 0,
                completion_date INTEGER NOT NULL,
                weak_areas TEXT          -- JSON array of topic strings
            );

            CREATE TABLE IF NOT EXISTS daily_activity (
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,      -- YYYY-MM-DD
                study_minutes INTEGER NOT NULL DEFAULT 0,
                quizzes_completed INTEGER NOT NULL DEFAULT 0,
                questions_answered INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, date)
            );

            CREATE TABLE IF NOT EXISTS user_achievements (
                user_id TEXT NOT NULL,
                achievement_id TEXT NOT NULL,
                unlocked_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, achievement_id)
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user ON study_sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_quiz_results_user ON quiz_results(user_id);
            CREATE INDEX IF NOT EXISTS idx_chat_user ON chat_messages(user_id);
            ",
        )?;

        Ok(())
    }

    // User operations

    pub fn create_user(&self, profile: &UserProfile) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO users (user_id, display_name, default_difficulty, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                profile.user_id,
                profile.display_name,
                profile.default_difficulty.as_str(),
                profile.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT user_id, display_name, default_difficulty, created_at
             FROM users WHERE user_id = ?1",
            params![user_id],
            |row| {
                let tier: String = row.get(2)?;
                Ok(UserProfile {
                    user_id: row.get(0)?,
                    display_name: row.get(1)?,
                    default_difficulty: DifficultyLevel::from_str(&tier)
                        .unwrap_or(DifficultyLevel::Teen),
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()
    }

    // Document operations

    pub fn insert_document(&self, doc: &Document) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let summary_json = doc
            .summary
            .as_ref()
            .and_then(|s| serde_json::to_string(s).ok());
        conn.execute(
            "INSERT INTO documents (id, title, content, summary, file_path, upload_date,
                                    grade_level, subject, language, word_count, page_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                doc.id,
                doc.title,
                doc.content,
                summary_json,
                doc.file_path,
                doc.upload_date,
                doc.grade_level,
                doc.subject,
                doc.language,
                doc.word_count as i64,
                doc.page_count.map(|p| p as i64),
            ],
        )?;
        Ok(())
    }

    pub fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, title, content, summary, file_path, upload_date,
                    grade_level, subject, language, word_count, page_count
             FROM documents WHERE id = ?1",
            params![id],
            |row| {
                let summary_json: Option<String> = row.get(3)?;
                let word_count: i64 = row.get(9)?;
                let page_count: Option<i64> = row.get(10)?;
                Ok(Document {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                    summary: summary_json.and_then(|j| serde_json::from_str(&j).ok()),
                    file_path: row.get(4)?,
                    upload_date: row.get(5)?,
                    grade_level: row.get(6)?,
                    subject: row.get(7)?,
                    language: row.get(8)?,
                    word_count: word_count as usize,
                    page_count: page_count.map(|p| p as usize),
                })
            },
        )
        .optional()
    }

    pub fn list_documents(&self) -> Result<Vec<(String, String, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, upload_date FROM documents ORDER BY upload_date DESC",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>>>()?;
        Ok(rows)
    }

    // Chat history

    pub fn insert_chat_message(&self, msg: &ChatMessage) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO chat_messages (id, user_id, document_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![msg.id, msg.user_id, msg.document_id, msg.role, msg.content, msg.created_at],
        )?;
        Ok(())
    }

    pub fn get_chat_messages(&self, user_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, document_id, role, content, created_at
             FROM chat_messages WHERE user_id = ?1
             ORDER BY created_at DESC LIMIT ?2",
        )?;
        let mut rows = stmt
            .query_map(params![user_id, limit as i64], |row| {
                Ok(ChatMessage {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    document_id: row.get(2)?,
                    role: row.get(3)?,
                    content: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        rows.reverse(); // oldest first for display
        Ok(rows)
    }

    // Study sessions

    pub fn insert_session(&self, session: &StudySession) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO study_sessions
                 (session_id, user_id, document_name, start_time, end_time,
                  pages_studied, questions_asked, difficulty_level, duration_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                session.session_id,
                session.user_id,
                session.document_name,
                session.start_time,
                session.end_time,
                session.pages_studied,
                session.questions_asked,
                session.difficulty_level.as_str(),
                session.duration_minutes,
            ],
        )?;
        Ok(())
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<StudySession>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT session_id, user_id, document_name, start_time, end_time,
                    pages_studied, questions_asked, difficulty_level, duration_minutes
             FROM study_sessions WHERE session_id = ?1",
            params![session_id],
            |row| {
                let tier: String = row.get(7)?;
                Ok(StudySession {
                    session_id: row.get(0)?,
                    user_id: row.get(1)?,
                    document_name: row.get(2)?,
                    start_time: row.get(3)?,
                    end_time: row.get(4)?,
                    pages_studied: row.get(5)?,
                    questions_asked: row.get(6)?,
                    difficulty_level: DifficultyLevel::from_str(&tier)
                        .unwrap_or(DifficultyLevel::Teen),
                    duration_minutes: row.get(8)?,
                })
            },
        )
        .optional()
    }

    /// Close an open session. Returns false when the session does not exist
    /// or was already closed; the row is never touched twice.
    pub fn close_session(
        &self,
        session_id: &str,
        end_time: i64,
        duration_minutes: i64,
        pages_studied: i64,
        questions_asked: i64,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE study_sessions
             SET end_time = ?2, duration_minutes = ?3, pages_studied = ?4, questions_asked = ?5
             WHERE session_id = ?1 AND end_time IS NULL",
            params![session_id, end_time, duration_minutes, pages_studied, questions_asked],
        )?;
        Ok(changed > 0)
    }

    // Daily activity and streak inputs

    /// Atomic per-row upsert: a single statement so concurrent writers to
    /// the same (user, date) row cannot lose increments
    pub fn increment_daily_activity(
        &self,
        user_id: &str,
        date: &str,
        study_minutes: i64,
        quizzes_completed: i64,
        questions_answered: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO daily_activity (user_id, date, study_minutes, quizzes_completed, questions_answered)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, date) DO UPDATE SET
                 study_minutes = study_minutes + excluded.study_minutes,
                 quizzes_completed = quizzes_completed + excluded.quizzes_completed,
                 questions_answered = questions_answered + excluded.questions_answered",
            params![user_id, date, study_minutes, quizzes_completed, questions_answered],
        )?;
        Ok(())
    }

    /// Distinct dates with qualifying activity, newest first
    pub fn activity_dates(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT date FROM daily_activity
             WHERE user_id = ?1 AND (study_minutes > 0 OR quizzes_completed > 0)
             ORDER BY date DESC",
        )?;
        let dates = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<String>>>()?;
        Ok(dates)
    }

    // Quiz results

    pub fn insert_quiz_result(&self, result: &QuizResult) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let weak_areas_json = serde_json::to_string(&result.weak_areas).ok();
        conn.execute(
            "INSERT INTO quiz_results
                 (quiz_id, user_id, quiz_title, score, total_questions, correct_answers,
                  difficulty_level, time_taken_minutes, completion_date, weak_areas)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                result.quiz_id,
                result.user_id,
                result.quiz_title,
                result.score,
                result.total_questions,
                result.correct_answers,
                result.difficulty_level.as_str(),
                result.time_taken_minutes,
                result.completion_date,
                weak_areas_json,
            ],
        )?;
        Ok(())
    }

    // Aggregates over closed sessions only (open sessions are excluded)

    pub fn total_study_minutes(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COALESCE(SUM(duration_minutes), 0) FROM study_sessions
             WHERE user_id = ?1 AND end_time IS NOT NULL",
            params![user_id],
            |row| row.get(0),
        )
    }

    pub fn documents_studied(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(DISTINCT document_name) FROM study_sessions
             WHERE user_id = ?1 AND end_time IS NOT NULL",
            params![user_id],
            |row| row.get(0),
        )
    }

    /// (completed count, average score); average is 0.0 with no quizzes
    pub fn quiz_stats(&self, user_id: &str) -> Result<(i64, f64)> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*), COALESCE(AVG(score), 0.0) FROM quiz_results WHERE user_id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
    }

    pub fn best_quiz_score(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COALESCE(MAX(score), 0) FROM quiz_results WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
    }

    /// Top-3 document names by closed-session count
    pub fn favorite_subjects(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT document_name FROM study_sessions
             WHERE user_id = ?1 AND end_time IS NOT NULL
             GROUP BY document_name
             ORDER BY COUNT(*) DESC, document_name ASC
             LIMIT 3",
        )?;
        let subjects = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<String>>>()?;
        Ok(subjects)
    }

    /// Weak-area topics from the 5 most recent quiz results scored below 70,
    /// flattened in recency order (frequency ranking is the caller's job)
    pub fn recent_weak_areas(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT weak_areas FROM quiz_results
             WHERE user_id = ?1 AND score < 70
             ORDER BY completion_date DESC
             LIMIT 5",
        )?;
        let blobs = stmt
            .query_map(params![user_id], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>>>()?;

        let mut topics = Vec::new();
        for blob in blobs.into_iter().flatten() {
            if let Ok(areas) = serde_json::from_str::<Vec<String>>(&blob) {
                topics.extend(areas);
            }
        }
        Ok(topics)
    }

    // Achievements

    /// First-unlock-wins: returns true only when this call recorded the
    /// unlock; a repeat is ignored and the original date stands
    pub fn unlock_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
        unlocked_at: i64,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO user_achievements (user_id, achievement_id, unlocked_at)
             VALUES (?1, ?2, ?3)",
            params![user_id, achievement_id, unlocked_at],
        )?;
        Ok(changed > 0)
    }

    pub fn achievement_unlocks(&self, user_id: &str) -> Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT achievement_id, unlocked_at FROM user_achievements WHERE user_id = ?1",
        )?;
        let unlocks = stmt
            .query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>>>()?;
        Ok(unlocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, user: &str, doc: &str, start: i64) -> StudySession {
        StudySession {
            session_id: id.to_string(),
            user_id: user.to_string(),
            document_name: doc.to_string(),
            start_time: start,
            end_time: None,
            pages_studied: 0,
            questions_asked: 0,
            difficulty_level: DifficultyLevel::Teen,
            duration_minutes: 0,
        }
    }

    #[test]
    fn test_close_session_only_once() {
        let db = Database::in_memory().unwrap();
        db.insert_session(&session("s1", "u1", "Biology.pdf", 1000)).unwrap();

        assert!(db.close_session("s1", 1000 + 600, 10, 4, 2).unwrap());
        // Second close is rejected, the first write stands
        assert!(!db.close_session("s1", 1000 + 9999, 999, 0, 0).unwrap());

        let s = db.get_session("s1").unwrap().unwrap();
        assert_eq!(s.duration_minutes, 10);
        assert_eq!(s.pages_studied, 4);
    }

    #[test]
    fn test_close_unknown_session_is_false() {
        let db = Database::in_memory().unwrap();
        assert!(!db.close_session("missing", 100, 1, 0, 0).unwrap());
    }

    #[test]
    fn test_daily_activity_increments() {
        let db = Database::in_memory().unwrap();
        db.increment_daily_activity("u1", "2026-08-24", 10, 0, 2).unwrap();
        db.increment_daily_activity("u1", "2026-08-24", 5, 1, 0).unwrap();

        let conn = db.conn.lock().unwrap();
        let (mins, quizzes, questions): (i64, i64, i64) = conn
            .query_row(
                "SELECT study_minutes, quizzes_completed, questions_answered
                 FROM daily_activity WHERE user_id = 'u1' AND date = '2026-08-24'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!((mins, quizzes, questions), (15, 1, 2));
    }

    #[test]
    fn test_activity_dates_filter_and_order() {
        let db = Database::in_memory().unwrap();
        db.increment_daily_activity("u1", "2026-08-20", 10, 0, 0).unwrap();
        db.increment_daily_activity("u1", "2026-08-22", 0, 1, 0).unwrap();
        // Questions alone do not qualify a day for a streak
        db.increment_daily_activity("u1", "2026-08-21", 0, 0, 3).unwrap();
        db.increment_daily_activity("u2", "2026-08-23", 30, 0, 0).unwrap();

        let dates = db.activity_dates("u1").unwrap();
        assert_eq!(dates, vec!["2026-08-22".to_string(), "2026-08-20".to_string()]);
    }

    #[test]
    fn test_achievement_first_unlock_wins() {
        let db = Database::in_memory().unwrap();
        assert!(db.unlock_achievement("u1", "first_quiz", 1111).unwrap());
        assert!(!db.unlock_achievement("u1", "first_quiz", 2222).unwrap());

        let unlocks = db.achievement_unlocks("u1").unwrap();
        assert_eq!(unlocks, vec![("first_quiz".to_string(), 1111)]);
    }

    #[test]
    fn test_favorite_subjects_ranking() {
        let db = Database::in_memory().unwrap();
        for (i, doc) in ["Math.pdf", "Math.pdf", "History.pdf", "Math.pdf", "Physics.pdf", "History.pdf"]
            .iter()
            .enumerate()
        {
            let id = format!("s{}", i);
            db.insert_session(&session(&id, "u1", doc, 1000 + i as i64)).unwrap();
            db.close_session(&id, 2000 + i as i64, 5, 1, 0).unwrap();
        }
        // Open sessions never count
        db.insert_session(&session("open", "u1", "Chemistry.pdf", 9000)).unwrap();

        let subjects = db.favorite_subjects("u1").unwrap();
        assert_eq!(subjects[0], "Math.pdf");
        assert_eq!(subjects[1], "History.pdf");
        assert_eq!(subjects.len(), 3);
        assert!(!subjects.contains(&"Chemistry.pdf".to_string()));
    }

    #[test]
    fn test_document_roundtrip_with_summary() {
        let db = Database::in_memory().unwrap();
        let mut doc = Document::new(
            "d1".to_string(),
            "Cells".to_string(),
            "Cells are the basic unit of life.".to_string(),
            "/tmp/cells.pdf".to_string(),
            5000,
        );
        doc.summary = Some(crate::summary::SummaryEngine::new(None).rule_based_summary(&doc.content));
        db.insert_document(&doc).unwrap();

        let loaded = db.get_document("d1").unwrap().unwrap();
        assert_eq!(loaded.word_count, 7);
        assert_eq!(loaded.language, "English");
        assert!(loaded.summary.is_some());
    }

    #[test]
    fn test_recent_weak_areas_threshold() {
        let db = Database::in_memory().unwrap();
        let result = |id: &str, score: i64, date: i64, areas: &[&str]| QuizResult {
            quiz_id: id.to_string(),
            user_id: "u1".to_string(),
            quiz_title: "t".to_string(),
            score,
            total_questions: 10,
            correct_answers: score / 10,
            difficulty_level: DifficultyLevel::Teen,
            time_taken_minutes: 5,
            completion_date: date,
            weak_areas: areas.iter().map(|s| s.to_string()).collect(),
        };

        db.insert_quiz_result(&result("q1", 50, 100, &["algebra", "fractions"])).unwrap();
        db.insert_quiz_result(&result("q2", 90, 200, &["geometry"])).unwrap();
        db.insert_quiz_result(&result("q3", 60, 300, &["algebra"])).unwrap();

        let areas = db.recent_weak_areas("u1").unwrap();
        // q2 scored >= 70 and is excluded; newest first
        assert_eq!(areas, vec!["algebra".to_string(), "algebra".to_string(), "fractions".to_string()]);
    }
}
