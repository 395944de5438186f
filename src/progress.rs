//! Study sessions, quiz history, streaks and achievements
//!
//! All state lives in the shared Database; the tracker itself holds no
//! mutable state, so one instance can serve every caller. Unknown or
//! already-closed sessions are silent no-ops with a diagnostic line, so
//! a stale session id from the UI never turns into a hard error.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use uuid::Uuid;

use crate::adapt::DifficultyLevel;
use crate::db::{Achievement, Database, LearningStats, QuizResult, StudySession, UserProfile};

/// Which running stat an achievement threshold is checked against
#[derive(Debug, Clone, Copy)]
enum Metric {
    QuizzesCompleted,
    BestQuizScore,
    CurrentStreak,
    TotalStudyMinutes,
}

struct AchievementDef {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    icon: &'static str,
    metric: Metric,
    target: i64,
}

const ACHIEVEMENT_CATALOG: [AchievementDef; 6] = [
    AchievementDef {
        id: "first_quiz",
        title: "First Steps",
        description: "Complete your first quiz",
        icon: "🎯",
        metric: Metric::QuizzesCompleted,
        target: 1,
    },
    AchievementDef {
        id: "quiz_master",
        title: "Quiz Master",
        description: "Complete 10 quizzes",
        icon: "🏆",
        metric: Metric::QuizzesCompleted,
        target: 10,
    },
    AchievementDef {
        id: "perfect_score",
        title: "Perfectionist",
        description: "Score 100% on a quiz",
        icon: "⭐",
        metric: Metric::BestQuizScore,
        target: 100,
    },
    AchievementDef {
        id: "study_streak_7",
        title: "Week Warrior",
        description: "Study 7 days in a row",
        icon: "🔥",
        metric: Metric::CurrentStreak,
        target: 7,
    },
    AchievementDef {
        id: "study_streak_30",
        title: "Monthly Master",
        description: "Study 30 days in a row",
        icon: "💎",
        metric: Metric::CurrentStreak,
        target: 30,
    },
    AchievementDef {
        id: "time_scholar",
        title: "Time Scholar",
        description: "Study for 10 hours total",
        icon: "📚",
        metric: Metric::TotalStudyMinutes,
        target: 600,
    },
];

pub struct ProgressTracker {
    db: Arc<Database>,
}

impl ProgressTracker {
    pub fn new(db: Arc<Database>) -> Self {
        ProgressTracker { db }
    }

    pub fn create_user(
        &self,
        user_id: &str,
        display_name: &str,
        default_difficulty: DifficultyLevel,
    ) -> Result<(), String> {
        let profile = UserProfile {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            default_difficulty,
            created_at: Local::now().timestamp(),
        };
        self.db.create_user(&profile).map_err(|e| e.to_string())
    }

    /// Open a session; the returned id is the handle for end_study_session
    pub fn start_study_session(
        &self,
        user_id: &str,
        document_name: &str,
        difficulty: DifficultyLevel,
    ) -> Result<String, String> {
        let session = StudySession {
            session_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            document_name: document_name.to_string(),
            start_time: Local::now().timestamp(),
            end_time: None,
            pages_studied: 0,
            questions_asked: 0,
            difficulty_level: difficulty,
            duration_minutes: 0,
        };
        self.db.insert_session(&session).map_err(|e| e.to_string())?;
        Ok(session.session_id)
    }

    /// Close a session exactly once. Unknown or already-closed ids are
    /// no-ops so stale handles from the caller never error.
    pub fn end_study_session(
        &self,
        session_id: &str,
        pages_studied: i64,
        questions_asked: i64,
    ) -> Result<(), String> {
        let session = match self.db.get_session(session_id).map_err(|e| e.to_string())? {
            Some(s) => s,
            None => {
                eprintln!("[Progress] end ignored: unknown session {}", session_id);
                return Ok(());
            }
        };

        let end_time = Local::now().timestamp();
        let duration_minutes = ((end_time - session.start_time) as f64 / 60.0).round() as i64;

        let closed = self
            .db
            .close_session(session_id, end_time, duration_minutes, pages_studied, questions_asked)
            .map_err(|e| e.to_string())?;

        if !closed {
            eprintln!("[Progress] end ignored: session {} already closed", session_id);
            return Ok(());
        }

        let today = Local::now().format("%Y-%m-%d").to_string();
        self.db
            .increment_daily_activity(&session.user_id, &today, duration_minutes, 0, questions_asked)
            .map_err(|e| e.to_string())?;

        self.check_achievements(&session.user_id)
    }

    /// Append a quiz result, credit today's activity, and re-run the
    /// achievement threshold checks
    pub fn record_quiz_result(&self, result: &QuizResult) -> Result<(), String> {
        self.db.insert_quiz_result(result).map_err(|e| e.to_string())?;

        let today = Local::now().format("%Y-%m-%d").to_string();
        self.db
            .increment_daily_activity(&result.user_id, &today, 0, 1, result.total_questions)
            .map_err(|e| e.to_string())?;

        self.check_achievements(&result.user_id)
    }

    pub fn get_user_stats(&self, user_id: &str) -> Result<LearningStats, String> {
        let total_study_minutes = self.db.total_study_minutes(user_id).map_err(|e| e.to_string())?;
        let documents_studied = self.db.documents_studied(user_id).map_err(|e| e.to_string())?;
        let (quizzes_completed, average_quiz_score) =
            self.db.quiz_stats(user_id).map_err(|e| e.to_string())?;
        let favorite_subjects = self.db.favorite_subjects(user_id).map_err(|e| e.to_string())?;

        let dates = self.activity_dates(user_id)?;
        let (current_streak, longest_streak) =
            compute_streaks(&dates, Local::now().date_naive());

        let weak = self.db.recent_weak_areas(user_id).map_err(|e| e.to_string())?;
        let improvement_areas = rank_by_frequency(&weak, 3);

        Ok(LearningStats {
            total_study_minutes,
            documents_studied,
            quizzes_completed,
            average_quiz_score,
            current_streak,
            longest_streak,
            favorite_subjects,
            improvement_areas,
        })
    }

    /// Full catalog with per-user unlock state and running progress values
    pub fn get_user_achievements(&self, user_id: &str) -> Result<Vec<Achievement>, String> {
        let unlocks: HashMap<String, i64> = self
            .db
            .achievement_unlocks(user_id)
            .map_err(|e| e.to_string())?
            .into_iter()
            .collect();

        let mut achievements = Vec::with_capacity(ACHIEVEMENT_CATALOG.len());
        for def in &ACHIEVEMENT_CATALOG {
            let current_value = self.metric_value(user_id, def.metric)?;
            achievements.push(Achievement {
                id: def.id.to_string(),
                title: def.title.to_string(),
                description: def.description.to_string(),
                icon: def.icon.to_string(),
                unlocked_date: unlocks.get(def.id).copied(),
                target_value: def.target,
                current_value,
            });
        }
        Ok(achievements)
    }

    /// Threshold sweep after every qualifying write; INSERT OR IGNORE in
    /// the store makes repeats harmless (first unlock date stands)
    fn check_achievements(&self, user_id: &str) -> Result<(), String> {
        let now = Local::now().timestamp();
        for def in &ACHIEVEMENT_CATALOG {
            if self.metric_value(user_id, def.metric)? >= def.target {
                let newly = self
                    .db
                    .unlock_achievement(user_id, def.id, now)
                    .map_err(|e| e.to_string())?;
                if newly {
                    eprintln!("[Progress] {} unlocked '{}'", user_id, def.title);
                }
            }
        }
        Ok(())
    }

    fn metric_value(&self, user_id: &str, metric: Metric) -> Result<i64, String> {
        match metric {
            Metric::QuizzesCompleted => {
                let (count, _) = self.db.quiz_stats(user_id).map_err(|e| e.to_string())?;
                Ok(count)
            }
            Metric::BestQuizScore => self.db.best_quiz_score(user_id).map_err(|e| e.to_string()),
            Metric::CurrentStreak => {
                let dates = self.activity_dates(user_id)?;
                Ok(compute_streaks(&dates, Local::now().date_naive()).0)
            }
            Metric::TotalStudyMinutes => {
                self.db.total_study_minutes(user_id).map_err(|e| e.to_string())
            }
        }
    }

    fn activity_dates(&self, user_id: &str) -> Result<Vec<NaiveDate>, String> {
        let raw = self.db.activity_dates(user_id).map_err(|e| e.to_string())?;
        Ok(raw
            .iter()
            .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .collect())
    }
}

/// (current, longest) streak over distinct activity dates sorted newest
/// first. Current streak counts consecutive days ending today; a single
/// missed day breaks it. Longest scans the whole history.
pub fn compute_streaks(dates_desc: &[NaiveDate], today: NaiveDate) -> (i64, i64) {
    if dates_desc.is_empty() {
        return (0, 0);
    }

    let mut current = 0i64;
    for (i, date) in dates_desc.iter().enumerate() {
        let expected = today - chrono::Duration::days(i as i64);
        if *date == expected {
            current += 1;
        } else {
            break;
        }
    }

    let mut asc: Vec<NaiveDate> = dates_desc.to_vec();
    asc.sort();
    asc.dedup();

    let mut longest = 1i64;
    let mut run = 1i64;
    for pair in asc.windows(2) {
        if (pair[1] - pair[0]).num_days() == 1 {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 1;
        }
    }

    (current, longest)
}

/// Most frequent entries first, ties broken by first appearance
fn rank_by_frequency(items: &[String], limit: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for item in items {
        if !counts.contains_key(item.as_str()) {
            order.push(item);
        }
        *counts.entry(item).or_insert(0) += 1;
    }

    let mut ranked: Vec<(usize, &str)> = order
        .iter()
        .enumerate()
        .map(|(i, s)| (i, *s))
        .collect();
    ranked.sort_by(|a, b| counts[b.1].cmp(&counts[a.1]).then(a.0.cmp(&b.0)));

    ranked.into_iter().take(limit).map(|(_, s)| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn tracker() -> ProgressTracker {
        ProgressTracker::new(Arc::new(Database::in_memory().unwrap()))
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn quiz(user: &str, id: &str, score: i64, when: i64, areas: &[&str]) -> QuizResult {
        QuizResult {
            quiz_id: id.to_string(),
            user_id: user.to_string(),
            quiz_title: "Chapter quiz".to_string(),
            score,
            total_questions: 10,
            correct_answers: score / 10,
            difficulty_level: DifficultyLevel::Teen,
            time_taken_minutes: 8,
            completion_date: when,
            weak_areas: areas.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_streaks_with_gap() {
        let today = date("2026-08-24");
        // today, -1, -2 then a gap to -5
        let dates = vec![
            date("2026-08-24"),
            date("2026-08-23"),
            date("2026-08-22"),
            date("2026-08-19"),
        ];
        assert_eq!(compute_streaks(&dates, today), (3, 3));
    }

    #[test]
    fn test_streak_broken_without_today() {
        let today = date("2026-08-24");
        let dates = vec![date("2026-08-22"), date("2026-08-21"), date("2026-08-20")];
        // No activity today means no current streak, but history still counts
        assert_eq!(compute_streaks(&dates, today), (0, 3));
    }

    #[test]
    fn test_streak_single_day_and_empty() {
        let today = date("2026-08-24");
        assert_eq!(compute_streaks(&[date("2026-08-24")], today), (1, 1));
        assert_eq!(compute_streaks(&[], today), (0, 0));
    }

    #[test]
    fn test_longest_streak_in_middle_of_history() {
        let today = date("2026-08-24");
        let dates = vec![
            date("2026-08-24"),
            date("2026-08-10"),
            date("2026-08-09"),
            date("2026-08-08"),
            date("2026-08-07"),
        ];
        assert_eq!(compute_streaks(&dates, today), (1, 4));
    }

    #[test]
    fn test_session_lifecycle_and_idempotent_end() {
        let t = tracker();
        t.create_user("u1", "Sam", DifficultyLevel::Teen).unwrap();
        let sid = t.start_study_session("u1", "Biology.pdf", DifficultyLevel::Teen).unwrap();

        t.end_study_session(&sid, 12, 3).unwrap();
        let first = t.db.get_session(&sid).unwrap().unwrap();
        assert!(first.end_time.is_some());

        // Second end is a no-op; the closed row is untouched
        t.end_study_session(&sid, 99, 99).unwrap();
        let second = t.db.get_session(&sid).unwrap().unwrap();
        assert_eq!(second.pages_studied, first.pages_studied);
        assert_eq!(second.duration_minutes, first.duration_minutes);
        assert_eq!(second.end_time, first.end_time);
    }

    #[test]
    fn test_end_unknown_session_is_noop() {
        let t = tracker();
        t.end_study_session("no-such-session", 1, 1).unwrap();
    }

    #[test]
    fn test_first_quiz_achievement_keeps_first_unlock() {
        let t = tracker();
        t.create_user("u1", "Sam", DifficultyLevel::Teen).unwrap();

        t.record_quiz_result(&quiz("u1", "q1", 80, 100, &[])).unwrap();
        let first_date = t
            .get_user_achievements("u1")
            .unwrap()
            .into_iter()
            .find(|a| a.id == "first_quiz")
            .unwrap()
            .unlocked_date
            .unwrap();

        t.record_quiz_result(&quiz("u1", "q2", 90, 200, &[])).unwrap();
        let after = t
            .get_user_achievements("u1")
            .unwrap()
            .into_iter()
            .find(|a| a.id == "first_quiz")
            .unwrap();

        assert_eq!(after.unlocked_date, Some(first_date));
        assert_eq!(after.current_value, 2);
    }

    #[test]
    fn test_perfect_score_unlocks_on_hundred() {
        let t = tracker();
        t.record_quiz_result(&quiz("u1", "q1", 95, 100, &[])).unwrap();
        let a = t.get_user_achievements("u1").unwrap();
        assert!(a.iter().find(|x| x.id == "perfect_score").unwrap().unlocked_date.is_none());

        t.record_quiz_result(&quiz("u1", "q2", 100, 200, &[])).unwrap();
        let a = t.get_user_achievements("u1").unwrap();
        assert!(a.iter().find(|x| x.id == "perfect_score").unwrap().unlocked_date.is_some());
    }

    #[test]
    fn test_improvement_areas_ranked_by_frequency() {
        let t = tracker();
        t.record_quiz_result(&quiz("u1", "q1", 50, 100, &["algebra", "fractions"])).unwrap();
        t.record_quiz_result(&quiz("u1", "q2", 60, 200, &["algebra"])).unwrap();
        t.record_quiz_result(&quiz("u1", "q3", 95, 300, &["geometry"])).unwrap();

        let stats = t.get_user_stats("u1").unwrap();
        // geometry came from a passing quiz and is excluded
        assert_eq!(stats.improvement_areas, vec!["algebra".to_string(), "fractions".to_string()]);
        assert_eq!(stats.quizzes_completed, 3);
    }

    #[test]
    fn test_stats_exclude_open_sessions() {
        let t = tracker();
        let s1 = t.start_study_session("u1", "Math.pdf", DifficultyLevel::Kid).unwrap();
        t.end_study_session(&s1, 5, 0).unwrap();
        // Left open on purpose
        t.start_study_session("u1", "History.pdf", DifficultyLevel::Kid).unwrap();

        let stats = t.get_user_stats("u1").unwrap();
        assert_eq!(stats.documents_studied, 1);
        assert_eq!(stats.favorite_subjects, vec!["Math.pdf".to_string()]);
    }

    #[test]
    fn test_rank_by_frequency_tie_keeps_first_seen() {
        let items: Vec<String> = ["b", "a", "b", "a", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(rank_by_frequency(&items, 3), vec!["b", "a", "c"]);
    }
}
