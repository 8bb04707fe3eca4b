mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, select_workspace, spawn_sidecar, temp_dir};

fn draft(text: &str, correct_index: i64) -> serde_json::Value {
    json!({
        "subject": "Physics",
        "chapter": "Kinematics",
        "topic": "Motion",
        "difficulty": "Medium",
        "questionText": text,
        "options": ["A", "B", "C", "D"],
        "correctOptionIndex": correct_index,
        "explanation": "Because.",
        "type": "MCQ",
        "source": "generated"
    })
}

#[test]
fn ingest_assigns_ids_and_skips_broken_drafts() {
    let workspace = temp_dir("prepdeck-ingest");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    // One good draft, one with an out-of-range answer index, wrapped in the
    // markdown fence models sometimes add.
    let raw = format!(
        "```json\n{}\n```",
        json!([draft("What is velocity?", 1), draft("Broken draft", 9)])
    );
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "questions.ingest",
        json!({ "raw": raw }),
    );
    assert_eq!(result["added"], 1);
    assert_eq!(result["skippedInvalid"], 1);
    assert_eq!(result["skippedSeen"], 0);
    let id = result["questions"][0]["id"].as_str().expect("assigned id");
    assert!(!id.is_empty());

    let listed = request_ok(&mut stdin, &mut reader, "2", "questions.list", json!({}));
    assert_eq!(listed["questions"].as_array().expect("questions").len(), 1);
}

#[test]
fn ingest_drops_already_seen_texts_and_in_batch_duplicates() {
    let workspace = temp_dir("prepdeck-ingest-dedupe");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let first = json!([draft("What is velocity?", 1)]).to_string();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "questions.ingest",
        json!({ "raw": first }),
    );
    // Mark the first batch as practiced so its texts enter the seen set.
    let listed = request_ok(&mut stdin, &mut reader, "2", "questions.list", json!({}));
    let qid = listed["questions"][0]["id"].as_str().expect("id").to_string();
    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "session.complete",
        json!({
            "answers": [{ "questionId": qid, "selectedOptionIndex": 1, "isCorrect": true, "timestamp": 1 }],
            "questionIds": [qid]
        }),
    );

    let second = json!([
        draft("What is velocity?", 1),
        draft("What is acceleration?", 2),
        draft("What is acceleration?", 2)
    ])
    .to_string();
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "questions.ingest",
        json!({ "raw": second }),
    );
    assert_eq!(result["added"], 1);
    assert_eq!(result["skippedSeen"], 2);

    let listed = request_ok(&mut stdin, &mut reader, "5", "questions.list", json!({}));
    assert_eq!(listed["questions"].as_array().expect("questions").len(), 2);
}

#[test]
fn ingest_with_nothing_usable_is_an_error() {
    let workspace = temp_dir("prepdeck-ingest-empty");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let raw = json!([draft("Broken draft", 9)]).to_string();
    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "questions.ingest",
        json!({ "raw": raw }),
    );
    assert_eq!(code, "empty_generation");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "questions.ingest",
        json!({ "raw": "the model replied with prose" }),
    );
    assert_eq!(code, "bad_model_output");
}

#[test]
fn prompt_carries_the_request_parameters() {
    let workspace = temp_dir("prepdeck-prompt");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "questions.prompt",
        json!({
            "subject": "Chemistry",
            "chapters": ["Equilibrium"],
            "topics": ["Buffer Solutions"],
            "difficulty": "Hard",
            "count": 5
        }),
    );
    assert_eq!(result["model"], "gemini-2.5-flash");
    let prompt = result["prompt"].as_str().expect("prompt");
    assert!(prompt.contains("Generate 5"));
    assert!(prompt.contains("Chemistry"));
    assert!(prompt.contains("Buffer Solutions"));
    assert!(prompt.contains("Hard"));
}
