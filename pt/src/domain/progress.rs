//! Progress summary returned by the progress API
//!
//! These types are read-only from the client's point of view: a fresh fetch
//! replaces the whole value, nothing patches individual fields.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of stages in the curriculum
pub const STAGE_COUNT: u32 = 6;

/// Number of exercises in each stage
pub const EXERCISES_PER_STAGE: u32 = 3;

/// Number of samples in the fluency trend
pub const FLUENCY_TREND_LEN: usize = 7;

/// Comprehensive progress for one learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressData {
    pub current_stage: CurrentStage,
    pub overall_progress: f64,
    pub total_progress: f64,
    pub streak_days: u32,
    pub total_practice_time: f64,
    pub total_exercises_completed: u32,
    pub longest_streak: u32,
    pub average_session_duration: f64,
    pub weekly_learning_hours: f64,
    pub monthly_learning_hours: f64,
    pub stages: Vec<StageProgress>,
    pub achievements: Vec<Achievement>,
    pub fluency_trend: Vec<f64>,
    pub unlocked_stages: u32,
    pub unlocked_exercises: u32,
    pub completed_stages: u32,
    pub completed_exercises: u32,
}

impl Default for ProgressData {
    /// Zeroed progress for a learner with no history
    ///
    /// Used as the fallback when the progress API can't be reached.
    fn default() -> Self {
        let stages = (1..=STAGE_COUNT)
            .map(|stage_id| StageProgress {
                stage_id,
                name: format!("Stage {}", stage_id),
                subtitle: String::new(),
                status: if stage_id == 1 {
                    ExerciseStatus::InProgress
                } else {
                    ExerciseStatus::Locked
                },
                progress: 0.0,
                exercises: (1..=EXERCISES_PER_STAGE)
                    .map(|exercise_id| ExerciseProgress {
                        exercise_id,
                        name: format!("Exercise {}", exercise_id),
                        status: if stage_id == 1 && exercise_id == 1 {
                            ExerciseStatus::InProgress
                        } else {
                            ExerciseStatus::Locked
                        },
                        ..Default::default()
                    })
                    .collect(),
            })
            .collect();

        Self {
            current_stage: CurrentStage::default(),
            overall_progress: 0.0,
            total_progress: 0.0,
            streak_days: 0,
            total_practice_time: 0.0,
            total_exercises_completed: 0,
            longest_streak: 0,
            average_session_duration: 0.0,
            weekly_learning_hours: 0.0,
            monthly_learning_hours: 0.0,
            stages,
            achievements: Vec::new(),
            fluency_trend: vec![0.0; FLUENCY_TREND_LEN],
            unlocked_stages: 1,
            unlocked_exercises: 1,
            completed_stages: 0,
            completed_exercises: 0,
        }
    }
}

impl ProgressData {
    /// Look up a stage by id
    pub fn stage(&self, stage_id: u32) -> Option<&StageProgress> {
        debug!(stage_id, "stage: called");
        self.stages.iter().find(|s| s.stage_id == stage_id)
    }

    /// Look up an exercise within a stage
    pub fn exercise(&self, stage_id: u32, exercise_id: u32) -> Option<&ExerciseProgress> {
        debug!(stage_id, exercise_id, "exercise: called");
        self.stage(stage_id)?
            .exercises
            .iter()
            .find(|e| e.exercise_id == exercise_id)
    }
}

/// The stage the learner is currently working through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentStage {
    pub id: u32,
    pub name: String,
    pub subtitle: String,
    pub progress: f64,
}

impl Default for CurrentStage {
    fn default() -> Self {
        Self {
            id: 1,
            name: "Stage 1".to_string(),
            subtitle: String::new(),
            progress: 0.0,
        }
    }
}

/// Per-stage progress record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageProgress {
    pub stage_id: u32,
    pub name: String,
    pub subtitle: String,
    pub status: ExerciseStatus,
    pub progress: f64,
    pub exercises: Vec<ExerciseProgress>,
}

/// Per-exercise progress record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseProgress {
    pub exercise_id: u32,
    pub name: String,
    pub status: ExerciseStatus,
    pub progress: f64,
    pub attempts: u32,
    pub topics: u32,
    pub completed_topics: u32,
}

/// Completion state of a stage or exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseStatus {
    Completed,
    InProgress,
    #[default]
    Locked,
}

impl std::fmt::Display for ExerciseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Locked => write!(f, "locked"),
        }
    }
}

impl std::str::FromStr for ExerciseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "completed" => Ok(Self::Completed),
            "in_progress" => Ok(Self::InProgress),
            "locked" => Ok(Self::Locked),
            _ => Err(format!("Unknown exercise status: {}", s)),
        }
    }
}

/// An earned achievement badge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Achievement {
    pub name: String,
    pub icon: String,
    pub date: String,
    pub color: String,
    pub description: String,
}
