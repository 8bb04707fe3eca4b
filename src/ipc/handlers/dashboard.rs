use crate::analytics::{self, STRONG_THRESHOLD, WEAK_THRESHOLD};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str, required_subject};
use crate::ipc::types::{AppState, Request};
use crate::migrate;
use crate::models::{PlannerTask, Question, Subject, UserAnswer};
use crate::store;
use rusqlite::Connection;
use serde_json::json;
use std::collections::BTreeSet;

struct Snapshot {
    stats: crate::models::TopicStatsMap,
    answers: Vec<UserAnswer>,
    questions: Vec<Question>,
}

fn load_snapshot(conn: &Connection, req: &Request) -> Result<Snapshot, serde_json::Value> {
    let stats = store::topic_stats_all(conn)
        .map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))?;
    let answers = store::answers_all(conn)
        .map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))?;
    let questions = store::get_all::<Question>(conn)
        .map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))?;
    Ok(Snapshot {
        stats,
        answers,
        questions,
    })
}

fn handle_subjects(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let snap = match load_snapshot(conn, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let subjects: Vec<serde_json::Value> = Subject::ALL
        .iter()
        .map(|subject| {
            let totals =
                analytics::subject_totals(*subject, &snap.stats, &snap.answers, &snap.questions);
            json!({ "subject": subject, "totals": totals })
        })
        .collect();
    ok(&req.id, json!({ "subjects": subjects }))
}

/// Full per-subject breakdown: chapters with topic detail, the strong/weak
/// lists cut at the score thresholds, and the still-unsolved incorrectly
/// answered questions.
fn handle_subject(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let subject = match required_subject(req, "subject") {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let snap = match load_snapshot(conn, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let chapters =
        analytics::subject_analytics(subject, &snap.stats, &snap.answers, &snap.questions);

    let mut strong_chapters: Vec<&str> = Vec::new();
    let mut weak_chapters: Vec<&str> = Vec::new();
    let mut strong_topics: Vec<serde_json::Value> = Vec::new();
    let mut weak_topics: Vec<serde_json::Value> = Vec::new();
    for chapter in &chapters {
        match chapter.performance_score {
            Some(s) if s > STRONG_THRESHOLD => strong_chapters.push(&chapter.chapter),
            Some(s) if s < WEAK_THRESHOLD => weak_chapters.push(&chapter.chapter),
            _ => {}
        }
        for topic in &chapter.topics {
            let entry = || json!({ "chapter": chapter.chapter, "topic": topic.topic });
            match topic.performance_score {
                Some(s) if s > STRONG_THRESHOLD => strong_topics.push(entry()),
                Some(s) if s < WEAK_THRESHOLD => weak_topics.push(entry()),
                _ => {}
            }
        }
    }

    let solved: BTreeSet<String> = match db::kv_get_json(conn, migrate::SOLVED_INCORRECT_KEY) {
        Ok(Some(v)) => serde_json::from_value(v).unwrap_or_default(),
        Ok(None) => BTreeSet::new(),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let mut missed_ids: Vec<&str> = Vec::new();
    let mut seen_ids: BTreeSet<&str> = BTreeSet::new();
    for answer in &snap.answers {
        if !answer.is_correct
            && !solved.contains(&answer.question_id)
            && seen_ids.insert(&answer.question_id)
        {
            missed_ids.push(&answer.question_id);
        }
    }
    let incorrect_questions: Vec<&Question> = missed_ids
        .iter()
        .filter_map(|id| snap.questions.iter().find(|q| q.id == *id))
        .filter(|q| q.subject == subject)
        .collect();

    ok(
        &req.id,
        json!({
            "subject": subject,
            "chapters": chapters,
            "strongChapters": strong_chapters,
            "weakChapters": weak_chapters,
            "strongTopics": strong_topics,
            "weakTopics": weak_topics,
            "incorrectQuestions": incorrect_questions,
        }),
    )
}

/// Completed planner tasks for one topic, newest completion first.
fn handle_topic_history(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let subject = match required_subject(req, "subject") {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let chapter = match required_str(req, "chapter") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let topic = match required_str(req, "topic") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut history: Vec<PlannerTask> = match store::get_all::<PlannerTask>(conn) {
        Ok(tasks) => tasks
            .into_iter()
            .filter(|t| {
                t.is_completed && t.subject == subject && t.chapter == chapter && t.topic == topic
            })
            .collect(),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    history.sort_by_key(|t| {
        std::cmp::Reverse(t.completion_data.as_ref().map(|c| c.completed_at).unwrap_or(0))
    });

    ok(&req.id, json!({ "tasks": history }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.subjects" => Some(handle_subjects(state, req)),
        "dashboard.subject" => Some(handle_subject(state, req)),
        "dashboard.topicHistory" => Some(handle_topic_history(state, req)),
        _ => None,
    }
}
