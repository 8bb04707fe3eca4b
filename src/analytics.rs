use crate::models::{Question, Subject, TopicKey, TopicStats, TopicStatsMap, UserAnswer};
use crate::syllabus;
use serde::Serialize;
use std::collections::HashMap;

pub const STRONG_THRESHOLD: f64 = 80.0;
pub const WEAK_THRESHOLD: f64 = 50.0;

/// Minimum combined practice volume before a performance score is defined.
pub const SCORE_MIN_PRACTICED: i64 = 5;

/// Derived per-topic view combining the two sources of truth: planner-task
/// accumulators and ad-hoc practice answers. Never persisted; recomputed
/// per request. `None` means "no data yet" (the stored records keep the
/// legacy -1/0 sentinels, the derived view does not).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPerformance {
    pub topic: String,
    pub total_time_spent: i64,
    pub total_questions_practiced: i64,
    pub total_questions_incorrect: i64,
    pub avg_accuracy: Option<f64>,
    pub avg_difficulty: Option<f64>,
    pub performance_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterPerformance {
    pub chapter: String,
    pub total_time: i64,
    pub total_questions_practiced: i64,
    pub total_questions_incorrect: i64,
    pub avg_accuracy: Option<f64>,
    pub performance_score: Option<f64>,
    pub topics: Vec<TopicPerformance>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectTotals {
    pub total_attempted: i64,
    /// Rounded percent; None when nothing was attempted.
    pub accuracy: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PracticeCounts {
    pub attempted: i64,
    pub incorrect: i64,
}

/// Ad-hoc session answers bucketed by the topic of the answered question.
/// Answers whose question is gone (should not happen; questions are
/// append-only) are ignored.
pub fn practice_counts(
    answers: &[UserAnswer],
    questions: &[Question],
) -> HashMap<TopicKey, PracticeCounts> {
    let by_id: HashMap<&str, &Question> =
        questions.iter().map(|q| (q.id.as_str(), q)).collect();
    let mut out: HashMap<TopicKey, PracticeCounts> = HashMap::new();
    for answer in answers {
        let Some(q) = by_id.get(answer.question_id.as_str()) else {
            continue;
        };
        let counts = out
            .entry(TopicKey::new(q.subject, q.chapter.clone(), q.topic.clone()))
            .or_default();
        counts.attempted += 1;
        if !answer.is_correct {
            counts.incorrect += 1;
        }
    }
    out
}

pub fn performance_score(
    practiced: i64,
    accuracy: Option<f64>,
    rating_count: usize,
    avg_difficulty: f64,
) -> Option<f64> {
    if practiced >= SCORE_MIN_PRACTICED && rating_count > 0 {
        Some(accuracy.unwrap_or(0.0) * 0.8 + (5.0 - avg_difficulty) * 5.0)
    } else {
        None
    }
}

pub fn topic_performance(
    topic: &str,
    stats: Option<&TopicStats>,
    counts: PracticeCounts,
) -> TopicPerformance {
    let (planner_time, planner_practiced, planner_incorrect, ratings) = match stats {
        Some(s) => (
            s.total_time_spent,
            s.total_questions_practiced,
            s.total_questions_incorrect,
            s.difficulty_ratings.as_slice(),
        ),
        None => (0, 0, 0, &[] as &[i64]),
    };

    let practiced = planner_practiced + counts.attempted;
    let incorrect = planner_incorrect + counts.incorrect;
    let accuracy = if practiced > 0 {
        Some((practiced - incorrect) as f64 / practiced as f64 * 100.0)
    } else {
        None
    };
    let avg_difficulty = if ratings.is_empty() {
        None
    } else {
        Some(ratings.iter().sum::<i64>() as f64 / ratings.len() as f64)
    };

    TopicPerformance {
        topic: topic.to_string(),
        total_time_spent: planner_time,
        total_questions_practiced: practiced,
        total_questions_incorrect: incorrect,
        avg_accuracy: accuracy,
        avg_difficulty,
        performance_score: performance_score(
            practiced,
            accuracy,
            ratings.len(),
            avg_difficulty.unwrap_or(0.0),
        ),
    }
}

/// Chapter breakdown for one subject: syllabus-ordered topics with any
/// activity, rolled up per chapter, chapters sorted by time spent
/// descending then name. O(topics x answers); collections are single-user
/// small and this is recomputed per request by design.
pub fn subject_analytics(
    subject: Subject,
    stats_map: &TopicStatsMap,
    answers: &[UserAnswer],
    questions: &[Question],
) -> Vec<ChapterPerformance> {
    let counts = practice_counts(answers, questions);
    let mut chapters: Vec<ChapterPerformance> = Vec::new();

    for chapter_info in syllabus::chapters(subject) {
        let mut topics: Vec<TopicPerformance> = Vec::new();
        for topic_name in chapter_info.topics {
            let key = TopicKey::new(subject, chapter_info.chapter, *topic_name);
            let stats = stats_map.get(&key);
            let topic_counts = counts.get(&key).copied().unwrap_or_default();
            let planner_time = stats.map(|s| s.total_time_spent).unwrap_or(0);
            if planner_time == 0 && topic_counts.attempted == 0 {
                continue;
            }
            topics.push(topic_performance(topic_name, stats, topic_counts));
        }
        if topics.is_empty() {
            continue;
        }
        chapters.push(roll_up_chapter(chapter_info.chapter, topics));
    }

    chapters.sort_by(|a, b| {
        b.total_time
            .cmp(&a.total_time)
            .then_with(|| a.chapter.cmp(&b.chapter))
    });
    chapters
}

fn roll_up_chapter(chapter: &str, topics: Vec<TopicPerformance>) -> ChapterPerformance {
    let total_time = topics.iter().map(|t| t.total_time_spent).sum();
    let practiced: i64 = topics.iter().map(|t| t.total_questions_practiced).sum();
    let incorrect: i64 = topics.iter().map(|t| t.total_questions_incorrect).sum();
    let scored: Vec<f64> = topics.iter().filter_map(|t| t.performance_score).collect();
    ChapterPerformance {
        chapter: chapter.to_string(),
        total_time,
        total_questions_practiced: practiced,
        total_questions_incorrect: incorrect,
        avg_accuracy: if practiced > 0 {
            Some((practiced - incorrect) as f64 / practiced as f64 * 100.0)
        } else {
            None
        },
        performance_score: if scored.is_empty() {
            None
        } else {
            Some(scored.iter().sum::<f64>() / scored.len() as f64)
        },
        topics,
    }
}

/// Dashboard-card totals for one subject: planner accumulators plus every
/// practice answer whose question belongs to the subject.
pub fn subject_totals(
    subject: Subject,
    stats_map: &TopicStatsMap,
    answers: &[UserAnswer],
    questions: &[Question],
) -> SubjectTotals {
    let mut practiced: i64 = 0;
    let mut incorrect: i64 = 0;
    for (key, stats) in stats_map {
        if key.subject == subject {
            practiced += stats.total_questions_practiced;
            incorrect += stats.total_questions_incorrect;
        }
    }
    for (key, counts) in practice_counts(answers, questions) {
        if key.subject == subject {
            practiced += counts.attempted;
            incorrect += counts.incorrect;
        }
    }
    SubjectTotals {
        total_attempted: practiced,
        accuracy: if practiced > 0 {
            Some(((practiced - incorrect) as f64 / practiced as f64 * 100.0).round() as i64)
        } else {
            None
        },
    }
}

/// Historical snapshot taken when a chapter enters a test plan, in the
/// legacy sentinel form the stored TestTopic keeps: -1 accuracy / 0
/// difficulty mean "no data at snapshot time".
pub fn topic_snapshot(
    key: &TopicKey,
    stats_map: &TopicStatsMap,
    answers: &[UserAnswer],
    questions: &[Question],
) -> (f64, f64) {
    let counts = practice_counts(answers, questions)
        .get(key)
        .copied()
        .unwrap_or_default();
    let perf = topic_performance(&key.topic, stats_map.get(key), counts);
    (
        perf.avg_accuracy.unwrap_or(-1.0),
        stats_map.get(key).map(|s| s.avg_difficulty).unwrap_or(0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, QuestionKind};

    fn question(id: &str, chapter: &str, topic: &str) -> Question {
        Question {
            id: id.to_string(),
            subject: Subject::Physics,
            chapter: chapter.to_string(),
            topic: topic.to_string(),
            difficulty: Difficulty::Medium,
            question_text: format!("text {id}"),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option_index: 0,
            explanation: String::new(),
            kind: QuestionKind::Mcq,
            source: "generated".to_string(),
        }
    }

    fn answer(question_id: &str, is_correct: bool) -> UserAnswer {
        UserAnswer {
            question_id: question_id.to_string(),
            selected_option_index: 0,
            is_correct,
            timestamp: 0,
        }
    }

    fn stats(practiced: i64, incorrect: i64, ratings: &[i64], time: i64) -> TopicStats {
        let mut s = TopicStats {
            total_time_spent: time,
            total_questions_practiced: practiced,
            total_questions_incorrect: incorrect,
            difficulty_ratings: ratings.to_vec(),
            avg_difficulty: 0.0,
            avg_accuracy: 0.0,
        };
        s.recompute_derived();
        s
    }

    #[test]
    fn score_needs_five_practiced_and_a_rating() {
        let below = topic_performance(
            "Motion",
            Some(&stats(4, 0, &[3], 10)),
            PracticeCounts::default(),
        );
        assert_eq!(below.performance_score, None);

        let unrated = topic_performance(
            "Motion",
            Some(&stats(8, 1, &[], 10)),
            PracticeCounts::default(),
        );
        assert_eq!(unrated.performance_score, None);
    }

    #[test]
    fn score_formula_matches_weighting() {
        // accuracy 90, avgDifficulty 2 => 90*0.8 + (5-2)*5 = 87
        let perf = topic_performance(
            "Motion",
            Some(&stats(10, 1, &[2], 30)),
            PracticeCounts::default(),
        );
        assert_eq!(perf.avg_accuracy, Some(90.0));
        assert_eq!(perf.performance_score, Some(87.0));
    }

    #[test]
    fn practice_answers_push_a_topic_over_the_gate() {
        // 4 from the planner plus 1 session answer reaches the threshold.
        let questions = vec![question("q1", "Kinematics", "Motion")];
        let answers = vec![answer("q1", true)];
        let counts = practice_counts(&answers, &questions);
        let key = TopicKey::new(Subject::Physics, "Kinematics", "Motion");
        let perf = topic_performance(
            "Motion",
            Some(&stats(4, 0, &[3], 10)),
            counts.get(&key).copied().unwrap_or_default(),
        );
        assert_eq!(perf.total_questions_practiced, 5);
        assert!(perf.performance_score.is_some());
    }

    #[test]
    fn zero_practice_reads_as_no_data_not_minus_one() {
        let perf = topic_performance(
            "Motion",
            Some(&stats(0, 0, &[4], 45)),
            PracticeCounts::default(),
        );
        assert_eq!(perf.avg_accuracy, None);
        // Undefined accuracy contributes 0 to the score, not -1.
        assert_eq!(perf.performance_score, None); // practiced < 5 anyway
    }

    #[test]
    fn chapter_roll_up_averages_only_scored_topics() {
        let scored = topic_performance(
            "Motion",
            Some(&stats(10, 1, &[2], 30)),
            PracticeCounts::default(),
        );
        let unscored = topic_performance(
            "Projectile Motion",
            Some(&stats(2, 1, &[4], 15)),
            PracticeCounts::default(),
        );
        let chapter = roll_up_chapter("Kinematics", vec![scored, unscored]);
        assert_eq!(chapter.total_time, 45);
        assert_eq!(chapter.total_questions_practiced, 12);
        assert_eq!(chapter.performance_score, Some(87.0));
    }

    #[test]
    fn subject_analytics_skips_untouched_topics_and_sorts_by_time() {
        let mut map = TopicStatsMap::new();
        map.insert(
            TopicKey::new(Subject::Physics, "Kinematics", "Motion"),
            stats(10, 1, &[2], 30),
        );
        map.insert(
            TopicKey::new(Subject::Physics, "Thermodynamics", "First Law"),
            stats(6, 2, &[3], 60),
        );
        let chapters = subject_analytics(Subject::Physics, &map, &[], &[]);
        let names: Vec<&str> = chapters.iter().map(|c| c.chapter.as_str()).collect();
        assert_eq!(names, vec!["Thermodynamics", "Kinematics"]);
        assert_eq!(chapters[1].topics.len(), 1);
    }

    #[test]
    fn subject_totals_combine_both_sources() {
        let mut map = TopicStatsMap::new();
        map.insert(
            TopicKey::new(Subject::Physics, "Kinematics", "Motion"),
            stats(10, 2, &[3], 30),
        );
        let questions = vec![question("q1", "Ray Optics", "Refraction")];
        let answers = vec![answer("q1", false), answer("q1", true)];
        let totals = subject_totals(Subject::Physics, &map, &answers, &questions);
        assert_eq!(totals.total_attempted, 12);
        // 9 of 12 correct => 75%.
        assert_eq!(totals.accuracy, Some(75));
    }

    #[test]
    fn snapshot_keeps_legacy_sentinels() {
        let key = TopicKey::new(Subject::Physics, "Kinematics", "Motion");
        let (accuracy, difficulty) = topic_snapshot(&key, &TopicStatsMap::new(), &[], &[]);
        assert_eq!(accuracy, -1.0);
        assert_eq!(difficulty, 0.0);
    }
}
