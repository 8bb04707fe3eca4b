use crate::models::{Subject, TopicKey, TopicStats};
use crate::syllabus;
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;

/// The old browser build kept everything in localStorage. Its exporter
/// writes the whole area to one file in the workspace: a flat string map
/// whose values are themselves JSON-serialized, exactly as localStorage
/// stored them.
pub const LEGACY_FILE: &str = "local_storage.json";

pub const KEY_QUESTIONS: &str = "prepdeck_questions";
pub const KEY_USER_ANSWERS: &str = "prepdeck_userAnswers";
pub const KEY_BOOKMARKS: &str = "prepdeck_bookmarks";
pub const KEY_TASKS: &str = "prepdeck_tasks";
pub const KEY_TOPIC_ANALYTICS: &str = "prepdeck_topicAnalytics";
pub const KEY_TEST_PLANS: &str = "prepdeck_testPlans";
pub const KEY_SEEN_TEXTS: &str = "prepdeck_seenQuestionTexts";
pub const KEY_SOLVED_INCORRECT: &str = "prepdeck_solvedIncorrectIds";
pub const KEY_HAS_SEEN_INTRO: &str = "prepdeck_has_seen_intro";

pub struct LegacyDump {
    entries: BTreeMap<String, String>,
}

impl LegacyDump {
    /// Ok(None) when the workspace has no legacy file at all.
    pub fn load(workspace: &Path) -> anyhow::Result<Option<LegacyDump>> {
        let path = workspace.join(LEGACY_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        let entries: BTreeMap<String, String> =
            serde_json::from_str(&raw).context("legacy dump is not a flat string map")?;
        Ok(Some(LegacyDump { entries }))
    }

    /// An entity list. A missing key means the collection was never
    /// written, which is the empty list.
    pub fn entities<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Vec<T>> {
        match self.entries.get(key) {
            Some(raw) => {
                serde_json::from_str(raw).with_context(|| format!("corrupt legacy entry {key}"))
            }
            None => Ok(Vec::new()),
        }
    }

    /// The set-valued entries were serialized as plain string arrays.
    pub fn string_set(&self, key: &str) -> anyhow::Result<Vec<String>> {
        self.entities(key)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.entries.get(key).map(|v| v == "true").unwrap_or(false)
    }

    /// Topic accumulators, keyed in the legacy dump by the concatenated
    /// "subject-chapter-topic" string. Unsplittable keys are an error:
    /// migration must not silently drop accumulated history.
    pub fn topic_stats(&self) -> anyhow::Result<Vec<(TopicKey, TopicStats)>> {
        let Some(raw) = self.entries.get(KEY_TOPIC_ANALYTICS) else {
            return Ok(Vec::new());
        };
        let by_key: BTreeMap<String, TopicStats> =
            serde_json::from_str(raw).context("corrupt legacy topicAnalytics entry")?;
        let mut out = Vec::with_capacity(by_key.len());
        for (composite, stats) in by_key {
            let key = split_topic_key(&composite)
                .with_context(|| format!("unsplittable legacy topic key: {composite}"))?;
            out.push((key, stats));
        }
        Ok(out)
    }
}

/// Split a legacy "subject-chapter-topic" composite. The subject prefix is
/// unambiguous (fixed three-value domain), but chapter and topic names may
/// themselves contain hyphens, so the built-in syllabus is consulted
/// first; only unknown chapters fall back to splitting at the first
/// hyphen.
pub fn split_topic_key(raw: &str) -> anyhow::Result<TopicKey> {
    let (subject, rest) = Subject::ALL
        .iter()
        .find_map(|s| {
            rest_after_prefix(raw, s.as_str()).map(|rest| (*s, rest))
        })
        .with_context(|| format!("no subject prefix in {raw}"))?;

    for chapter in syllabus::chapters(subject) {
        if let Some(topic) = rest_after_prefix(rest, chapter.chapter) {
            return Ok(TopicKey::new(subject, chapter.chapter, topic));
        }
    }

    let (chapter, topic) = rest
        .split_once('-')
        .with_context(|| format!("no chapter/topic separator in {raw}"))?;
    Ok(TopicKey::new(subject, chapter, topic))
}

fn rest_after_prefix<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    s.strip_prefix(prefix).and_then(|r| r.strip_prefix('-'))
}
