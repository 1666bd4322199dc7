use std::fmt;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::Display;
use thiserror::Error;

use crate::config::ServerOptions;

/// Backend-assigned note identifier. The client only ever echoes ids back,
/// so any JSON scalar is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteId {
    Number(serde_json::Number),
    Text(String),
    Flag(bool),
    /// No id in the record, or an explicit null.
    #[default]
    Missing,
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteId::Number(value) => write!(f, "{value}"),
            NoteId::Text(value) => f.write_str(value),
            NoteId::Flag(value) => write!(f, "{value}"),
            NoteId::Missing => f.write_str("null"),
        }
    }
}

impl From<i64> for NoteId {
    fn from(value: i64) -> Self {
        NoteId::Number(value.into())
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        NoteId::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub id: NoteId,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub content: String,
    /// Fields the backend stores alongside a note; kept so records round-trip untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Null reads as empty; other non-string scalars are rendered as JSON text.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    })
}

impl Note {
    pub fn new(id: impl Into<NoteId>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            extra: Map::new(),
        }
    }
}

/// Title/content pair sent as the body of create and update calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Both fields present. Whitespace counts as content.
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.content.is_empty()
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.content.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Intent {
    List,
    Create,
    Update,
    Delete,
}

/// Response status of a call whose status is deliberately not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledged {
    pub status: u16,
}

impl Acknowledged {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Transport(String),
    #[error("{} (HTTP {status})", status_message(.intent))]
    Status { intent: Intent, status: u16 },
    #[error("fetched data is not a list")]
    NotAList,
    #[error("invalid response payload: {0}")]
    Decode(String),
}

fn status_message(intent: &Intent) -> &'static str {
    match intent {
        Intent::List => "failed to fetch notes",
        Intent::Create => "failed to add note",
        Intent::Update => "failed to update note",
        Intent::Delete => "failed to delete note",
    }
}

pub trait NoteGateway {
    fn list(&self) -> Result<Vec<Note>, GatewayError>;
    fn create(&self, draft: &NoteDraft) -> Result<Note, GatewayError>;
    fn update(&self, id: &NoteId, draft: &NoteDraft) -> Result<Acknowledged, GatewayError>;
    fn delete(&self, id: &NoteId) -> Result<Acknowledged, GatewayError>;
}

/// Talks to the notes collection over HTTP. One attempt per call, no retries.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    collection: Url,
}

impl HttpGateway {
    pub fn new(options: &ServerOptions) -> Result<Self> {
        let collection = collection_url(&options.base_url, &options.notes_path)?;
        let client = Client::builder()
            .timeout(options.request_timeout())
            .build()
            .context("building http client")?;
        Ok(Self { client, collection })
    }

    pub fn collection_url(&self) -> &Url {
        &self.collection
    }

    fn item_url(&self, id: &NoteId) -> Url {
        let mut url = self.collection.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&id.to_string());
        }
        url
    }
}

impl NoteGateway for HttpGateway {
    fn list(&self) -> Result<Vec<Note>, GatewayError> {
        tracing::debug!(url = %self.collection, "GET notes");
        let response = self
            .client
            .get(self.collection.clone())
            .send()
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                intent: Intent::List,
                status: status.as_u16(),
            });
        }
        let payload: Value = response.json().map_err(decode)?;
        decode_list(payload)
    }

    fn create(&self, draft: &NoteDraft) -> Result<Note, GatewayError> {
        tracing::debug!(url = %self.collection, title = %draft.title, "POST note");
        let response = self
            .client
            .post(self.collection.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(draft)
            .send()
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                intent: Intent::Create,
                status: status.as_u16(),
            });
        }
        let note = response.json::<Note>().map_err(decode)?;
        if note.id == NoteId::Missing {
            return Err(GatewayError::Decode("created note has no id".to_string()));
        }
        Ok(note)
    }

    fn update(&self, id: &NoteId, draft: &NoteDraft) -> Result<Acknowledged, GatewayError> {
        let url = self.item_url(id);
        tracing::debug!(%url, "PUT note");
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "application/json")
            .json(draft)
            .send()
            .map_err(transport)?;
        Ok(acknowledge(Intent::Update, id, response))
    }

    fn delete(&self, id: &NoteId) -> Result<Acknowledged, GatewayError> {
        let url = self.item_url(id);
        tracing::debug!(%url, "DELETE note");
        let response = self.client.delete(url).send().map_err(transport)?;
        Ok(acknowledge(Intent::Delete, id, response))
    }
}

fn collection_url(base_url: &str, notes_path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        notes_path.trim_start_matches('/')
    );
    Url::parse(&joined).with_context(|| format!("parsing notes collection url {joined}"))
}

fn acknowledge(intent: Intent, id: &NoteId, response: Response) -> Acknowledged {
    let ack = Acknowledged {
        status: response.status().as_u16(),
    };
    if !ack.is_success() {
        tracing::warn!(%intent, %id, status = ack.status, "backend rejected request; keeping local change");
    }
    ack
}

fn decode_list(payload: Value) -> Result<Vec<Note>, GatewayError> {
    let Value::Array(items) = payload else {
        return Err(GatewayError::NotAList);
    };
    items.into_iter().map(decode_record).collect()
}

/// Every array element becomes a note. Non-object elements keep their raw
/// value under `value` with an empty title and content.
fn decode_record(item: Value) -> Result<Note, GatewayError> {
    match item {
        Value::Object(_) => {
            serde_json::from_value(item).map_err(|err| GatewayError::Decode(err.to_string()))
        }
        other => {
            tracing::warn!(record = %other, "list entry is not an object");
            let mut note = Note::new(NoteId::Missing, "", "");
            note.extra.insert("value".to_string(), other);
            Ok(note)
        }
    }
}

fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

fn decode(err: reqwest::Error) -> GatewayError {
    GatewayError::Decode(err.to_string())
}
