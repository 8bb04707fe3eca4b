mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, select_workspace, spawn_sidecar, temp_dir};

fn create_task(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
    id: &str,
    task_type: &str,
) -> String {
    let created = request_ok(
        stdin,
        reader,
        id,
        "tasks.create",
        json!({
            "subject": "Physics",
            "chapter": "Kinematics",
            "topic": "Motion",
            "taskName": "Practice kinematics",
            "taskType": task_type,
            "priority": "High",
            "estimatedTime": 60,
            "planDate": "2026-03-10"
        }),
    );
    created["task"]["id"].as_str().expect("task id").to_string()
}

#[test]
fn completing_a_practice_task_updates_the_topic_accumulators() {
    let workspace = temp_dir("prepdeck-task-complete");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let task_id = create_task(&mut stdin, &mut reader, "1", "Question Practice");

    let completed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "tasks.complete",
        json!({
            "taskId": task_id,
            "timeSpent": 30,
            "difficultyRating": 4,
            "questionsPracticed": 10,
            "questionsIncorrect": 2
        }),
    );
    assert_eq!(completed["task"]["isCompleted"], true);
    let stats = &completed["stats"];
    assert_eq!(stats["totalTimeSpent"], 30);
    assert_eq!(stats["totalQuestionsPracticed"], 10);
    assert_eq!(stats["totalQuestionsIncorrect"], 2);
    assert_eq!(stats["avgDifficulty"], 4.0);
    assert_eq!(stats["avgAccuracy"], 80.0);

    // A second completion of the same task must be refused.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "tasks.complete",
        json!({ "taskId": task_id, "timeSpent": 10, "difficultyRating": 2 }),
    );
    assert_eq!(code, "invalid_state");
}

#[test]
fn study_task_completion_leaves_practice_counts_alone() {
    let workspace = temp_dir("prepdeck-task-study");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let task_id = create_task(&mut stdin, &mut reader, "1", "Study");
    let completed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "tasks.complete",
        json!({
            "taskId": task_id,
            "timeSpent": 45,
            "difficultyRating": 2,
            "questionsPracticed": 99,
            "questionsIncorrect": 98
        }),
    );
    let stats = &completed["stats"];
    assert_eq!(stats["totalTimeSpent"], 45);
    assert_eq!(stats["totalQuestionsPracticed"], 0);
    assert_eq!(stats["avgAccuracy"], -1.0);
    assert_eq!(
        completed["task"]["completionData"]
            .get("questionsPracticed"),
        None
    );
}

#[test]
fn completion_validation_rejects_bad_payloads() {
    let workspace = temp_dir("prepdeck-task-validation");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let task_id = create_task(&mut stdin, &mut reader, "1", "Question Practice");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "tasks.complete",
        json!({ "taskId": task_id, "timeSpent": 30, "difficultyRating": 6, "questionsPracticed": 5 }),
    );
    assert_eq!(code, "validation_failed");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "tasks.complete",
        json!({
            "taskId": task_id,
            "timeSpent": 30,
            "difficultyRating": 3,
            "questionsPracticed": 5,
            "questionsIncorrect": 7
        }),
    );
    assert_eq!(code, "validation_failed");

    // Practice tasks must report how many questions were practiced.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "tasks.complete",
        json!({ "taskId": task_id, "timeSpent": 30, "difficultyRating": 3 }),
    );
    assert_eq!(code, "validation_failed");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "tasks.complete",
        json!({ "taskId": "nope", "timeSpent": 30, "difficultyRating": 3 }),
    );
    assert_eq!(code, "not_found");

    // All rejections above must have left the task pending.
    let tasks = request_ok(&mut stdin, &mut reader, "6", "tasks.list", json!({}));
    assert_eq!(tasks["tasks"][0]["isCompleted"], false);
}

#[test]
fn created_tasks_anchor_at_the_plan_days_midnight() {
    let workspace = temp_dir("prepdeck-task-create");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "tasks.create",
        json!({
            "subject": "Biology",
            "chapter": "Genetics",
            "topic": "Mutations",
            "taskName": "Revise mutations",
            "taskType": "Revision",
            "priority": "Low",
            "estimatedTime": 30,
            "planDate": "2026-03-10"
        }),
    );
    // 2026-03-10T00:00:00Z in millis.
    assert_eq!(created["task"]["createdAt"], 1773100800000i64);

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "tasks.create",
        json!({
            "subject": "Biology",
            "chapter": "Genetics",
            "topic": "Mutations",
            "taskName": "Bad date",
            "taskType": "Revision",
            "priority": "Low",
            "estimatedTime": 30,
            "planDate": "10/03/2026"
        }),
    );
    assert_eq!(code, "bad_params");
}

#[test]
fn pending_tasks_delete_but_completed_ones_do_not() {
    let workspace = temp_dir("prepdeck-task-delete");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let pending = create_task(&mut stdin, &mut reader, "1", "Revision");
    let done = create_task(&mut stdin, &mut reader, "2", "Revision");
    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "tasks.complete",
        json!({ "taskId": done, "timeSpent": 20, "difficultyRating": 3 }),
    );

    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "tasks.delete",
        json!({ "taskId": pending }),
    );
    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "tasks.delete",
        json!({ "taskId": done }),
    );
    assert_eq!(code, "invalid_state");

    let tasks = request_ok(&mut stdin, &mut reader, "6", "tasks.list", json!({}));
    assert_eq!(tasks["tasks"].as_array().expect("tasks").len(), 1);
}
