//! Topic attempt submissions and their local validation

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Valid stage identifiers
pub const STAGE_RANGE: RangeInclusive<i64> = 1..=6;

/// Valid exercise identifiers within a stage
pub const EXERCISE_RANGE: RangeInclusive<i64> = 1..=3;

/// Valid topic identifiers within an exercise
pub const TOPIC_RANGE: RangeInclusive<i64> = 1..=100;

/// Valid attempt scores
pub const SCORE_RANGE: RangeInclusive<f64> = 0.0..=100.0;

/// Valid time spent on a single attempt, in seconds
pub const TIME_SPENT_RANGE: RangeInclusive<i64> = 1..=3600;

/// A single learner attempt at a topic, as submitted by the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAttempt {
    pub user_id: String,
    pub stage_id: i64,
    pub exercise_id: i64,
    pub topic_id: i64,
    pub score: f64,
    pub urdu_used: bool,
    pub time_spent_seconds: i64,
    pub completed: bool,
}

impl TopicAttempt {
    /// Check every field against its domain
    ///
    /// Collects all violations rather than stopping at the first, so callers
    /// can report every bad field at once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        debug!(user_id = %self.user_id, stage_id = self.stage_id, exercise_id = self.exercise_id, "validate: called");
        let mut violations = Vec::new();

        if self.user_id.trim().is_empty() {
            violations.push(FieldViolation::new("user_id", "must not be empty"));
        }
        check_range(&mut violations, "stage_id", self.stage_id, &STAGE_RANGE);
        check_range(&mut violations, "exercise_id", self.exercise_id, &EXERCISE_RANGE);
        check_range(&mut violations, "topic_id", self.topic_id, &TOPIC_RANGE);
        check_range(&mut violations, "score", self.score, &SCORE_RANGE);
        check_range(
            &mut violations,
            "time_spent_seconds",
            self.time_spent_seconds,
            &TIME_SPENT_RANGE,
        );

        ValidationError::from_violations(violations)
    }
}

/// Validate a (stage, exercise) pair used to address an exercise
pub fn validate_exercise_ref(stage_id: i64, exercise_id: i64) -> Result<(), ValidationError> {
    debug!(stage_id, exercise_id, "validate_exercise_ref: called");
    let mut violations = Vec::new();
    check_range(&mut violations, "stage_id", stage_id, &STAGE_RANGE);
    check_range(&mut violations, "exercise_id", exercise_id, &EXERCISE_RANGE);
    ValidationError::from_violations(violations)
}

/// Validate a stage identifier on its own
pub fn validate_stage(stage_id: i64) -> Result<(), ValidationError> {
    let mut violations = Vec::new();
    check_range(&mut violations, "stage_id", stage_id, &STAGE_RANGE);
    ValidationError::from_violations(violations)
}

fn check_range<T>(violations: &mut Vec<FieldViolation>, field: &'static str, value: T, range: &RangeInclusive<T>)
where
    T: PartialOrd + fmt::Display,
{
    // NaN scores fail `contains`, which is what we want
    if !range.contains(&value) {
        debug!(field, %value, "check_range: out of range");
        violations.push(FieldViolation::new(
            field,
            format!("{} is outside {}..={}", value, range.start(), range.end()),
        ));
    }
}

/// One field that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Local validation failure; never reaches the network
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid input: {}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Build an error for a single field
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation::new(field, message)],
        }
    }

    fn from_violations(violations: Vec<FieldViolation>) -> Result<(), Self> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Self { violations })
        }
    }

    /// Names of the fields that failed, in declaration order
    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.field).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
