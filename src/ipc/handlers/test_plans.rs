use crate::analytics;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, now_ms, required_f64, required_field, required_i64, required_str, required_subject};
use crate::ipc::types::{AppState, Request};
use crate::models::{
    Question, TestChapter, TestCompletion, TestPlan, TestPracticeLog, TestStatus, TestTopic,
    TopicKey,
};
use crate::store;
use crate::syllabus;
use rusqlite::Connection;
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

fn load_plan(
    conn: &Connection,
    req: &Request,
    plan_id: &str,
) -> Result<TestPlan, serde_json::Value> {
    match store::get_one::<TestPlan>(conn, plan_id) {
        Ok(Some(p)) => Ok(p),
        Ok(None) => Err(err(&req.id, "not_found", "test plan not found", None)),
        Err(e) => Err(err(&req.id, "db_query_failed", e.to_string(), None)),
    }
}

/// Every mutation except completion itself requires the plan to still be
/// in the Planning phase. Completed plans are a frozen record.
fn ensure_planning(plan: &TestPlan, req: &Request) -> Result<(), serde_json::Value> {
    if plan.status == TestStatus::Completed {
        Err(err(
            &req.id,
            "invalid_state",
            "test plan is already completed",
            None,
        ))
    } else {
        Ok(())
    }
}

fn save_plan(conn: &Connection, req: &Request, plan: &TestPlan) -> Option<serde_json::Value> {
    match store::put_one(conn, plan) {
        Ok(()) => None,
        Err(e) => Some(err(&req.id, "db_insert_failed", e.to_string(), None)),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match store::get_all::<TestPlan>(conn) {
        Ok(mut plans) => {
            plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            ok(&req.id, json!({ "plans": plans }))
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subjects: Vec<crate::models::Subject> = match required_field(req, "subjects") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if subjects.is_empty() {
        return err(&req.id, "validation_failed", "at least one subject", None);
    }

    let plan = TestPlan {
        id: Uuid::new_v4().to_string(),
        name,
        subjects,
        syllabus: BTreeMap::new(),
        status: TestStatus::Planning,
        created_at: now_ms(),
        notes: None,
        completion_data: None,
    };
    if let Some(resp) = save_plan(conn, req, &plan) {
        return resp;
    }
    ok(&req.id, json!({ "plan": plan }))
}

/// Adding a chapter snapshots the current per-topic accuracy/difficulty
/// into the plan, so later progress is measured against "where I was
/// when I started preparing".
fn handle_add_chapter(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let plan_id = match required_str(req, "planId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subject = match required_subject(req, "subject") {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let chapter_name = match required_str(req, "chapter") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut plan = match load_plan(conn, req, &plan_id) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = ensure_planning(&plan, req) {
        return resp;
    }
    if !plan.subjects.contains(&subject) {
        return err(&req.id, "validation_failed", "subject is not part of this plan", None);
    }
    let Some(chapter) = syllabus::find_chapter(subject, &chapter_name) else {
        return err(&req.id, "not_found", "unknown chapter", None);
    };
    let entries = plan.syllabus.entry(subject).or_default();
    if entries.iter().any(|c| c.chapter_name == chapter_name) {
        return err(&req.id, "invalid_state", "chapter already in plan", None);
    }

    let stats_map = match store::topic_stats_all(conn) {
        Ok(m) => m,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let answers = match store::answers_all(conn) {
        Ok(a) => a,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let questions = match store::get_all::<Question>(conn) {
        Ok(q) => q,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let topics = chapter
        .topics
        .iter()
        .map(|topic| {
            let key = TopicKey::new(subject, chapter_name.clone(), *topic);
            let (accuracy, difficulty) =
                analytics::topic_snapshot(&key, &stats_map, &answers, &questions);
            TestTopic {
                topic_name: (*topic).to_string(),
                historical_accuracy: accuracy,
                historical_difficulty: difficulty,
                is_revised: false,
                practice_data: None,
            }
        })
        .collect();
    entries.push(TestChapter {
        chapter_name,
        topics,
    });

    if let Some(resp) = save_plan(conn, req, &plan) {
        return resp;
    }
    ok(&req.id, json!({ "plan": plan }))
}

fn handle_remove_chapter(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let plan_id = match required_str(req, "planId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subject = match required_subject(req, "subject") {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let chapter_name = match required_str(req, "chapter") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut plan = match load_plan(conn, req, &plan_id) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = ensure_planning(&plan, req) {
        return resp;
    }
    let Some(entries) = plan.syllabus.get_mut(&subject) else {
        return err(&req.id, "not_found", "chapter not in plan", None);
    };
    let before = entries.len();
    entries.retain(|c| c.chapter_name != chapter_name);
    if entries.len() == before {
        return err(&req.id, "not_found", "chapter not in plan", None);
    }
    if entries.is_empty() {
        plan.syllabus.remove(&subject);
    }

    if let Some(resp) = save_plan(conn, req, &plan) {
        return resp;
    }
    ok(&req.id, json!({ "plan": plan }))
}

fn with_topic<F>(
    plan: &mut TestPlan,
    req: &Request,
    subject: crate::models::Subject,
    chapter: &str,
    topic: &str,
    apply: F,
) -> Option<serde_json::Value>
where
    F: FnOnce(&mut TestTopic),
{
    let entry = plan
        .syllabus
        .get_mut(&subject)
        .and_then(|chapters| chapters.iter_mut().find(|c| c.chapter_name == chapter))
        .and_then(|c| c.topics.iter_mut().find(|t| t.topic_name == topic));
    match entry {
        Some(t) => {
            apply(t);
            None
        }
        None => Some(err(&req.id, "not_found", "topic not in plan", None)),
    }
}

fn handle_toggle_revised(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let plan_id = match required_str(req, "planId") {
        Ok(v) => v,
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

    let mut plan = match load_plan(conn, req, &plan_id) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = ensure_planning(&plan, req) {
        return resp;
    }
    if let Some(resp) = with_topic(&mut plan, req, subject, &chapter, &topic, |t| {
        t.is_revised = !t.is_revised;
    }) {
        return resp;
    }

    if let Some(resp) = save_plan(conn, req, &plan) {
        return resp;
    }
    ok(&req.id, json!({ "plan": plan }))
}

fn handle_log_practice(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let plan_id = match required_str(req, "planId") {
        Ok(v) => v,
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
    let practiced = match required_i64(req, "questionsPracticed") {
        Ok(n) => n,
        Err(resp) => return resp,
    };
    let correct = match required_i64(req, "questionsCorrect") {
        Ok(n) => n,
        Err(resp) => return resp,
    };
    if practiced <= 0 || correct < 0 || correct > practiced {
        return err(
            &req.id,
            "validation_failed",
            "questionsCorrect must be between 0 and questionsPracticed",
            None,
        );
    }

    let mut plan = match load_plan(conn, req, &plan_id) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = ensure_planning(&plan, req) {
        return resp;
    }
    if let Some(resp) = with_topic(&mut plan, req, subject, &chapter, &topic, |t| {
        // Re-logging overwrites; the plan tracks the latest drill result,
        // not a running sum.
        t.practice_data = Some(TestPracticeLog {
            questions_practiced: practiced,
            questions_correct: correct,
        });
    }) {
        return resp;
    }

    if let Some(resp) = save_plan(conn, req, &plan) {
        return resp;
    }
    ok(&req.id, json!({ "plan": plan }))
}

fn handle_set_notes(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let plan_id = match required_str(req, "planId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(notes) = req.params.get("notes").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing notes", None);
    };

    let mut plan = match load_plan(conn, req, &plan_id) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = ensure_planning(&plan, req) {
        return resp;
    }
    plan.notes = if notes.is_empty() {
        None
    } else {
        Some(notes.to_string())
    };

    if let Some(resp) = save_plan(conn, req, &plan) {
        return resp;
    }
    ok(&req.id, json!({ "plan": plan }))
}

fn handle_complete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let plan_id = match required_str(req, "planId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let final_avg_difficulty = match required_f64(req, "finalAvgDifficulty") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let final_avg_accuracy = match required_f64(req, "finalAvgAccuracy") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !(1.0..=5.0).contains(&final_avg_difficulty) {
        return err(
            &req.id,
            "validation_failed",
            "finalAvgDifficulty must be between 1 and 5",
            None,
        );
    }
    if !(0.0..=100.0).contains(&final_avg_accuracy) {
        return err(
            &req.id,
            "validation_failed",
            "finalAvgAccuracy must be between 0 and 100",
            None,
        );
    }

    let mut plan = match load_plan(conn, req, &plan_id) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = ensure_planning(&plan, req) {
        return resp;
    }
    plan.status = TestStatus::Completed;
    plan.completion_data = Some(TestCompletion {
        completed_at: now_ms(),
        final_avg_difficulty,
        final_avg_accuracy,
    });

    if let Some(resp) = save_plan(conn, req, &plan) {
        return resp;
    }
    ok(&req.id, json!({ "plan": plan }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let plan_id = match required_str(req, "planId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = load_plan(conn, req, &plan_id) {
        return resp;
    }
    match store::delete_one::<TestPlan>(conn, &plan_id) {
        Ok(()) => ok(&req.id, json!({ "deleted": true })),
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "testPlans.list" => Some(handle_list(state, req)),
        "testPlans.create" => Some(handle_create(state, req)),
        "testPlans.addChapter" => Some(handle_add_chapter(state, req)),
        "testPlans.removeChapter" => Some(handle_remove_chapter(state, req)),
        "testPlans.toggleRevised" => Some(handle_toggle_revised(state, req)),
        "testPlans.logPractice" => Some(handle_log_practice(state, req)),
        "testPlans.setNotes" => Some(handle_set_notes(state, req)),
        "testPlans.complete" => Some(handle_complete(state, req)),
        "testPlans.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
