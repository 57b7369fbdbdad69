use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::TodoError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "storage", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Todo {
    pub fn new(title: String, due_date: Option<NaiveDate>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            due_date,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    /// A todo is overdue once the start of its due date (UTC) has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => due.and_hms_opt(0, 0, 0).map(|d| d.and_utc() < now).unwrap_or(false),
            None => false,
        }
    }
}

/// Body of `POST /api/todos`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

impl CreateTodo {
    pub fn new(title: impl Into<String>, due_date: Option<&str>) -> Self {
        Self {
            title: Some(title.into()),
            due_date: due_date.map(str::to_string),
        }
    }

    pub(crate) fn validate(self) -> Result<(String, Option<NaiveDate>), TodoError> {
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| TodoError::Validation("Title is required".into()))?;
        let due_date = match self.due_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_due_date(raw)?),
        };
        Ok((title, due_date))
    }
}

/// Body of `POST /api/todos/generateImage`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImage {
    #[serde(default)]
    pub todo_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl GenerateImage {
    pub fn new(todo_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            todo_id: Some(todo_id.to_string()),
            title: Some(title.into()),
        }
    }

    pub(crate) fn validate(self) -> Result<(Uuid, String), TodoError> {
        let missing = || TodoError::Validation("Todo ID and title are required".into());
        let todo_id = self.todo_id.filter(|id| !id.trim().is_empty()).ok_or_else(missing)?;
        let title = self.title.filter(|t| !t.trim().is_empty()).ok_or_else(missing)?;
        let todo_id = Uuid::parse_str(todo_id.trim())
            .map_err(|_| TodoError::Validation("Invalid todo ID".into()))?;
        Ok((todo_id, title))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUrl {
    pub image_url: String,
}

fn parse_due_date(raw: &str) -> Result<NaiveDate, TodoError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| TodoError::Validation("Invalid due date".into()))
}
