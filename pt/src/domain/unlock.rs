//! Topic resumption and content unlock types

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where the learner should resume within an exercise
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentTopic {
    pub current_topic_id: i64,
    pub is_new_exercise: bool,
    pub is_completed: bool,
}

/// Kind of content that can be unlocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Stage,
    Exercise,
    #[default]
    #[serde(other)]
    Other,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stage => write!(f, "stage"),
            Self::Exercise => write!(f, "exercise"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A piece of content the backend just unlocked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockedContent {
    #[serde(alias = "type")]
    pub content_type: ContentType,
    pub stage_id: Option<i64>,
    pub exercise_id: Option<i64>,
    pub name: Option<String>,
}

impl std::fmt::Display for UnlockedContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(name) = &self.name {
            return write!(f, "{} {}", self.content_type, name);
        }
        match (self.stage_id, self.exercise_id) {
            (Some(stage), Some(exercise)) => write!(f, "{} {}.{}", self.content_type, stage, exercise),
            (Some(stage), None) => write!(f, "{} {}", self.content_type, stage),
            _ => write!(f, "{}", self.content_type),
        }
    }
}

/// Result of a write that may unlock content (attempt or unlock check)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockReport {
    pub unlocked_content: Vec<UnlockedContent>,
}

/// One row of the unlock table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockRow {
    pub stage_id: i64,
    /// `None` for a row describing the stage itself
    pub exercise_id: Option<i64>,
    pub is_unlocked: bool,
}

/// Raw progress rows for a learner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProgress {
    pub summary: Option<serde_json::Value>,
    pub stages: Vec<serde_json::Value>,
    pub exercises: Vec<serde_json::Value>,
    pub unlocks: Vec<UnlockRow>,
}

impl UserProgress {
    /// Whether a stage (or an exercise within it) is unlocked
    ///
    /// Content without an unlock row is treated as locked.
    pub fn is_unlocked(&self, stage_id: i64, exercise_id: Option<i64>) -> bool {
        debug!(stage_id, ?exercise_id, "is_unlocked: called");
        self.unlocks
            .iter()
            .find(|row| row.stage_id == stage_id && row.exercise_id == exercise_id)
            .is_some_and(|row| row.is_unlocked)
    }
}
