use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Subject {
    Physics,
    Chemistry,
    Biology,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Subject::Physics, Subject::Chemistry, Subject::Biology];

    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Biology => "Biology",
        }
    }

    pub fn parse(s: &str) -> Option<Subject> {
        match s {
            "Physics" => Some(Subject::Physics),
            "Chemistry" => Some(Subject::Chemistry),
            "Biology" => Some(Subject::Biology),
            _ => None,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    #[serde(rename = "MCQ")]
    Mcq,
    #[serde(rename = "Assertion-Reason")]
    AssertionReason,
    #[serde(rename = "Statement-based")]
    StatementBased,
}

/// A generated practice question. Immutable once inserted; answers and
/// bookmarks reference it by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub subject: Subject,
    pub chapter: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
    pub explanation: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub source: String,
}

/// Append-only practice-session answer. Correctness is fixed at answer time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub question_id: String,
    pub selected_option_index: usize,
    pub is_correct: bool,
    pub timestamp: i64,
}

/// Bookmarks carry a full snapshot of the question taken at bookmark time,
/// not a live reference, so they survive question-collection churn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub question_id: String,
    pub note: String,
    pub question: Question,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    Study,
    Revision,
    #[serde(rename = "Question Practice")]
    QuestionPractice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletion {
    pub completed_at: i64,
    /// Minutes.
    pub time_spent: i64,
    /// 1-5.
    pub difficulty_rating: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions_practiced: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions_incorrect: Option<i64>,
}

/// A planner entry. Lifecycle is pending -> completed, one way; the
/// completion payload exists exactly when `is_completed` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerTask {
    pub id: String,
    pub subject: Subject,
    pub chapter: String,
    pub topic: String,
    pub task_name: String,
    pub task_type: TaskType,
    pub priority: Priority,
    /// Estimated minutes.
    pub estimated_time: i64,
    /// Calendar day, YYYY-MM-DD.
    pub plan_date: String,
    pub created_at: i64,
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_data: Option<TaskCompletion>,
}

/// Tuple key for per-topic accumulators. The legacy store concatenated
/// these with hyphens; keeping the components separate avoids delimiter
/// collisions for chapter/topic names that contain one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TopicKey {
    pub subject: Subject,
    pub chapter: String,
    pub topic: String,
}

impl TopicKey {
    pub fn new(subject: Subject, chapter: impl Into<String>, topic: impl Into<String>) -> Self {
        TopicKey {
            subject,
            chapter: chapter.into(),
            topic: topic.into(),
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.subject, self.chapter, self.topic)
    }
}

/// Per-topic accumulators mutated only by planner-task completion.
///
/// The stored record keeps the legacy sentinel convention: `avg_accuracy`
/// is -1 exactly when `total_questions_practiced` is 0, `avg_difficulty`
/// is 0 when no rating has been logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicStats {
    pub total_time_spent: i64,
    pub total_questions_practiced: i64,
    pub total_questions_incorrect: i64,
    pub difficulty_ratings: Vec<i64>,
    pub avg_difficulty: f64,
    pub avg_accuracy: f64,
}

impl Default for TopicStats {
    fn default() -> Self {
        TopicStats {
            total_time_spent: 0,
            total_questions_practiced: 0,
            total_questions_incorrect: 0,
            difficulty_ratings: Vec::new(),
            avg_difficulty: 0.0,
            avg_accuracy: -1.0,
        }
    }
}

impl TopicStats {
    /// Fold one completed task into the accumulators. Practice counts only
    /// apply to Question Practice tasks.
    pub fn apply_completion(&mut self, completion: &TaskCompletion, task_type: TaskType) {
        self.total_time_spent += completion.time_spent;
        self.difficulty_ratings.push(completion.difficulty_rating);
        if task_type == TaskType::QuestionPractice {
            if let Some(practiced) = completion.questions_practiced {
                self.total_questions_practiced += practiced;
                self.total_questions_incorrect += completion.questions_incorrect.unwrap_or(0);
            }
        }
        self.recompute_derived();
    }

    pub fn recompute_derived(&mut self) {
        self.avg_difficulty = if self.difficulty_ratings.is_empty() {
            0.0
        } else {
            let sum: i64 = self.difficulty_ratings.iter().sum();
            sum as f64 / self.difficulty_ratings.len() as f64
        };
        self.avg_accuracy = if self.total_questions_practiced > 0 {
            let correct = self.total_questions_practiced - self.total_questions_incorrect;
            correct as f64 / self.total_questions_practiced as f64 * 100.0
        } else {
            -1.0
        };
    }
}

pub type TopicStatsMap = BTreeMap<TopicKey, TopicStats>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    Planning,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPracticeLog {
    pub questions_practiced: i64,
    pub questions_correct: i64,
}

/// A syllabus topic inside a test plan. The historical fields are
/// snapshots taken when the chapter was added (legacy sentinels: -1
/// accuracy / 0 difficulty mean "no data then").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestTopic {
    pub topic_name: String,
    pub historical_accuracy: f64,
    pub historical_difficulty: f64,
    pub is_revised: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_data: Option<TestPracticeLog>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestChapter {
    pub chapter_name: String,
    pub topics: Vec<TestTopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCompletion {
    pub completed_at: i64,
    /// 1-5, self-assessed.
    pub final_avg_difficulty: f64,
    /// 0-100, self-assessed.
    pub final_avg_accuracy: f64,
}

/// Test-preparation plan. Planning -> Completed is one way; the completion
/// payload exists exactly when status is Completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPlan {
    pub id: String,
    pub name: String,
    pub subjects: Vec<Subject>,
    pub syllabus: BTreeMap<Subject, Vec<TestChapter>>,
    pub status: TestStatus,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_data: Option<TestCompletion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub uri: String,
    pub title: String,
}

/// One turn of the doubt-solving chat. History is kept by the host UI for
/// the duration of a session only; the daemon never persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender: ChatSender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRef>>,
}
