//! Domain types for learner progress
//!
//! - [`TopicAttempt`] - an attempt submitted by the UI, with local validation
//! - [`ProgressData`] - the comprehensive progress summary
//! - [`CurrentTopic`], [`UnlockReport`], [`UserProgress`] - resumption and unlock data

mod attempt;
mod progress;
mod unlock;

pub use attempt::{
    EXERCISE_RANGE, FieldViolation, SCORE_RANGE, STAGE_RANGE, TIME_SPENT_RANGE, TOPIC_RANGE, TopicAttempt,
    ValidationError, validate_exercise_ref, validate_stage,
};
pub use progress::{
    Achievement, CurrentStage, EXERCISES_PER_STAGE, ExerciseProgress, ExerciseStatus, FLUENCY_TREND_LEN,
    ProgressData, STAGE_COUNT, StageProgress,
};
pub use unlock::{ContentType, CurrentTopic, UnlockReport, UnlockRow, UnlockedContent, UserProgress};
