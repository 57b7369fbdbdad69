//! Headless model of the todo page.
//!
//! [`Board::update`] is pure: it applies a [`Msg`] and returns the [`Effect`]s
//! to run. [`perform`] runs one effect against a [`TodoClient`] and turns the
//! outcome back into a `Msg`; [`drive`] keeps doing that until nothing is in flight.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use uuid::Uuid;

use crate::client::TodoClient;
use crate::core::Todo;

#[cfg(feature = "tracing")]
use tracing::warn;

#[derive(Debug, Clone)]
pub enum Msg {
    SetTitle(String),
    SetDueDate(String),
    Submit,
    Created(Result<Todo, String>),
    ImageGenerated(Uuid, Result<String, String>),
    Delete(Uuid),
    Deleted(Uuid, Result<(), String>),
    Fetch,
    Fetched(Result<Vec<Todo>, String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch,
    Create { title: String, due_date: Option<String> },
    GenerateImage { id: Uuid, title: String },
    Delete(Uuid),
}

/// One rendered list entry. Flags are derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoRow<'a> {
    pub todo: &'a Todo,
    pub overdue: bool,
    pub generating: bool,
}

#[derive(Debug, Default)]
pub struct Board {
    todos: Vec<Todo>,
    title: String,
    due_date: String,
    adding: bool,
    generating: HashSet<Uuid>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn due_date(&self) -> &str {
        &self.due_date
    }

    /// True only while a create call is outstanding.
    pub fn is_adding(&self) -> bool {
        self.adding
    }

    pub fn is_generating(&self, id: Uuid) -> bool {
        self.generating.contains(&id)
    }

    pub fn pending(&self) -> &HashSet<Uuid> {
        &self.generating
    }

    pub fn rows(&self, now: DateTime<Utc>) -> Vec<TodoRow<'_>> {
        self.todos
            .iter()
            .map(|todo| TodoRow {
                todo,
                overdue: todo.is_overdue(now),
                generating: self.generating.contains(&todo.id),
            })
            .collect()
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Effect> {
        match msg {
            Msg::SetTitle(title) => {
                self.title = title;
                vec![]
            }
            Msg::SetDueDate(due_date) => {
                self.due_date = due_date;
                vec![]
            }
            Msg::Submit => {
                if self.adding || self.title.trim().is_empty() {
                    return vec![];
                }
                self.adding = true;
                let due_date = Some(self.due_date.trim().to_string()).filter(|d| !d.is_empty());
                vec![Effect::Create { title: self.title.clone(), due_date }]
            }
            Msg::Created(Ok(todo)) => {
                self.adding = false;
                self.title.clear();
                self.due_date.clear();
                self.generating.insert(todo.id);
                let effect = Effect::GenerateImage { id: todo.id, title: todo.title.clone() };
                self.todos.retain(|t| t.id != todo.id);
                self.todos.insert(0, todo);
                vec![effect, Effect::Fetch]
            }
            Msg::Created(Err(error)) => {
                self.adding = false;
                report("Failed to add todo", &error);
                vec![]
            }
            Msg::ImageGenerated(id, result) => {
                self.generating.remove(&id);
                match result {
                    Ok(url) => {
                        if let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) {
                            todo.image_url = Some(url);
                        }
                    }
                    Err(error) => report("Failed to generate image", &error),
                }
                vec![]
            }
            Msg::Delete(id) => vec![Effect::Delete(id)],
            Msg::Deleted(_, Ok(())) => vec![Effect::Fetch],
            Msg::Deleted(_, Err(error)) => {
                report("Failed to delete todo", &error);
                vec![]
            }
            Msg::Fetch => vec![Effect::Fetch],
            Msg::Fetched(Ok(mut todos)) => {
                // A list fetched before an image landed must not hide it again.
                for todo in todos.iter_mut().filter(|t| t.image_url.is_none()) {
                    if let Some(known) = self.todos.iter().find(|t| t.id == todo.id) {
                        todo.image_url = known.image_url.clone();
                    }
                }
                self.todos = todos;
                vec![]
            }
            Msg::Fetched(Err(error)) => {
                report("Failed to fetch todos", &error);
                vec![]
            }
        }
    }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn report(what: &str, error: &str) {
    #[cfg(feature = "tracing")]
    warn!(error = %error, "{what}");
}

pub async fn perform(client: &TodoClient, effect: Effect) -> Msg {
    let text = |e: anyhow::Error| format!("{e:#}");
    match effect {
        Effect::Fetch => Msg::Fetched(client.list_todos().await.map_err(text)),
        Effect::Create { title, due_date } => {
            Msg::Created(client.create_todo(&title, due_date.as_deref()).await.map_err(text))
        }
        Effect::GenerateImage { id, title } => {
            Msg::ImageGenerated(id, client.generate_image(id, &title).await.map_err(text))
        }
        Effect::Delete(id) => Msg::Deleted(id, client.delete_todo(id).await.map_err(text)),
    }
}

/// Applies `msg` and runs the resulting effects concurrently, feeding each
/// outcome back into the board until no call is outstanding.
pub async fn drive(board: &mut Board, client: &TodoClient, msg: Msg) {
    let mut in_flight = FuturesUnordered::new();
    for effect in board.update(msg) {
        in_flight.push(perform(client, effect));
    }
    while let Some(msg) = in_flight.next().await {
        for effect in board.update(msg) {
            in_flight.push(perform(client, effect));
        }
    }
}
