use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, now_ms, opt_i64, required_field, required_i64, required_str, required_subject,
};
use crate::ipc::types::{AppState, Request};
use crate::models::{PlannerTask, TaskCompletion, TaskType, TopicKey, TopicStats};
use crate::store;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use uuid::Uuid;

fn handle_tasks_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match store::get_all::<PlannerTask>(conn) {
        Ok(tasks) => ok(&req.id, json!({ "tasks": tasks })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_tasks_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let task_name = match required_str(req, "taskName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let task_type: TaskType = match required_field(req, "taskType") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let priority = match required_field(req, "priority") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let estimated_time = match required_i64(req, "estimatedTime") {
        Ok(n) if n > 0 => n,
        Ok(_) => {
            return err(
                &req.id,
                "validation_failed",
                "estimatedTime must be positive",
                None,
            )
        }
        Err(resp) => return resp,
    };
    let plan_date = match required_str(req, "planDate") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Ok(date) = NaiveDate::parse_from_str(&plan_date, "%Y-%m-%d") else {
        return err(&req.id, "bad_params", "planDate must be YYYY-MM-DD", None);
    };

    let task = PlannerTask {
        id: Uuid::new_v4().to_string(),
        subject,
        chapter,
        topic,
        task_name,
        task_type,
        priority,
        estimated_time,
        plan_date,
        // Tasks sort by plan day, not entry time; anchor creation at the
        // planned day's UTC midnight.
        created_at: date.and_time(NaiveTime::MIN).and_utc().timestamp_millis(),
        is_completed: false,
        completion_data: None,
    };
    if let Err(e) = store::put_one(conn, &task) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "task": task }))
}

/// Completing a task updates the task record and the topic accumulators
/// in one transaction; either both land or neither does.
fn handle_tasks_complete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let task_id = match required_str(req, "taskId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let time_spent = match required_i64(req, "timeSpent") {
        Ok(n) => n,
        Err(resp) => return resp,
    };
    let difficulty_rating = match required_i64(req, "difficultyRating") {
        Ok(n) => n,
        Err(resp) => return resp,
    };
    let questions_practiced = match opt_i64(req, "questionsPracticed") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let questions_incorrect = match opt_i64(req, "questionsIncorrect") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut task = match store::get_one::<PlannerTask>(conn, &task_id) {
        Ok(Some(t)) => t,
        Ok(None) => return err(&req.id, "not_found", "task not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if task.is_completed {
        return err(&req.id, "invalid_state", "task already completed", None);
    }
    if time_spent <= 0 {
        return err(&req.id, "validation_failed", "timeSpent must be positive", None);
    }
    if !(1..=5).contains(&difficulty_rating) {
        return err(
            &req.id,
            "validation_failed",
            "difficultyRating must be between 1 and 5",
            None,
        );
    }
    let (questions_practiced, questions_incorrect) = if task.task_type == TaskType::QuestionPractice
    {
        let Some(practiced) = questions_practiced else {
            return err(
                &req.id,
                "validation_failed",
                "questionsPracticed is required for Question Practice tasks",
                None,
            );
        };
        let incorrect = questions_incorrect.unwrap_or(0);
        if practiced < 0 || incorrect < 0 || incorrect > practiced {
            return err(
                &req.id,
                "validation_failed",
                "questionsIncorrect must be between 0 and questionsPracticed",
                None,
            );
        }
        (Some(practiced), Some(incorrect))
    } else {
        // Counts make no sense on study or revision tasks; drop them.
        (None, None)
    };

    let completion = TaskCompletion {
        completed_at: now_ms(),
        time_spent,
        difficulty_rating,
        questions_practiced,
        questions_incorrect,
    };
    task.is_completed = true;
    task.completion_data = Some(completion.clone());

    let key = TopicKey::new(task.subject, task.chapter.clone(), task.topic.clone());
    let mut stats = match store::topic_stats_get(conn, &key) {
        Ok(Some(s)) => s,
        Ok(None) => TopicStats::default(),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    stats.apply_completion(&completion, task.task_type);

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    if let Err(e) = store::put_one(&tx, &task) {
        let _ = tx.rollback();
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    if let Err(e) = store::topic_stats_put(&tx, &key, &stats) {
        let _ = tx.rollback();
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_tx_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "task": task, "stats": stats }))
}

fn handle_tasks_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let task_id = match required_str(req, "taskId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store::get_one::<PlannerTask>(conn, &task_id) {
        Ok(Some(t)) if t.is_completed => {
            // Completed tasks already fed the analytics; deleting them
            // would orphan the accumulators.
            return err(&req.id, "invalid_state", "completed tasks cannot be deleted", None);
        }
        Ok(Some(_)) => {}
        Ok(None) => return err(&req.id, "not_found", "task not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }
    match store::delete_one::<PlannerTask>(conn, &task_id) {
        Ok(()) => ok(&req.id, json!({ "deleted": true })),
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tasks.list" => Some(handle_tasks_list(state, req)),
        "tasks.create" => Some(handle_tasks_create(state, req)),
        "tasks.complete" => Some(handle_tasks_complete(state, req)),
        "tasks.delete" => Some(handle_tasks_delete(state, req)),
        _ => None,
    }
}
