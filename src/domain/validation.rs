// Form validation rules applied before any request is sent
use crate::domain::model::{MatchEventForm, PlayerForm, TeamForm};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const TEAM_NAME_MIN: usize = 2;
pub const TEAM_NAME_MAX: usize = 100;
pub const SHORT_NAME_MAX: usize = 10;
pub const PERSON_NAME_MAX: usize = 50;
pub const JERSEY_RANGE: std::ops::RangeInclusive<u8> = 1..=99;
/// Regulation time plus extra time and stoppage.
pub const MAX_EVENT_MINUTE: u16 = 130;

/// A locally detected input error.
///
/// `field` names the first offending field; `details` maps every offending
/// field to its message.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub field: Option<String>,
    pub details: Option<Value>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.into()),
            details: None,
        }
    }
}

#[derive(Default)]
struct Violations {
    entries: Vec<(&'static str, String)>,
}

impl Violations {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.entries.push((field, message.into()));
    }

    fn into_result(self) -> Result<(), ValidationError> {
        let Some((field, message)) = self.entries.first().cloned() else {
            return Ok(());
        };
        let details: Map<String, Value> = self
            .entries
            .into_iter()
            .map(|(f, m)| (f.to_string(), Value::String(m)))
            .collect();
        Err(ValidationError {
            message,
            field: Some(field.to_string()),
            details: Some(Value::Object(details)),
        })
    }
}

fn check_name(v: &mut Violations, field: &'static str, label: &str, value: &str, max: usize) {
    let len = value.trim().chars().count();
    if len == 0 {
        v.push(field, format!("{} is required", label));
    } else if len > max {
        v.push(field, format!("{} must be at most {} characters", label, max));
    }
}

pub fn validate_team(form: &TeamForm) -> Result<(), ValidationError> {
    let mut v = Violations::default();

    let len = form.name.trim().chars().count();
    if len == 0 {
        v.push("name", "Team name is required");
    } else if !(TEAM_NAME_MIN..=TEAM_NAME_MAX).contains(&len) {
        v.push(
            "name",
            format!(
                "Team name must be between {} and {} characters",
                TEAM_NAME_MIN, TEAM_NAME_MAX
            ),
        );
    }

    if let Some(short) = &form.short_name {
        if short.trim().chars().count() > SHORT_NAME_MAX {
            v.push(
                "shortName",
                format!("Short name must be at most {} characters", SHORT_NAME_MAX),
            );
        }
    }

    v.into_result()
}

pub fn validate_player(form: &PlayerForm) -> Result<(), ValidationError> {
    validate_player_on(form, Utc::now().date_naive())
}

/// Same as [`validate_player`] with an explicit "today" for birth date checks.
pub fn validate_player_on(form: &PlayerForm, today: NaiveDate) -> Result<(), ValidationError> {
    let mut v = Violations::default();

    check_name(&mut v, "firstName", "First name", &form.first_name, PERSON_NAME_MAX);
    check_name(&mut v, "lastName", "Last name", &form.last_name, PERSON_NAME_MAX);

    if let Some(number) = form.jersey_number {
        if !JERSEY_RANGE.contains(&number) {
            v.push(
                "jerseyNumber",
                format!(
                    "Jersey number must be between {} and {}",
                    JERSEY_RANGE.start(),
                    JERSEY_RANGE.end()
                ),
            );
        }
    }

    if let Some(birth) = form.birth_date {
        if birth > today {
            v.push("birthDate", "Birth date cannot be in the future");
        }
    }

    v.into_result()
}

pub fn validate_match_event(form: &MatchEventForm) -> Result<(), ValidationError> {
    let mut v = Violations::default();
    if form.minute > MAX_EVENT_MINUTE {
        v.push(
            "minute",
            format!("Minute must be between 0 and {}", MAX_EVENT_MINUTE),
        );
    }
    v.into_result()
}
