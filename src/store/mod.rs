use crate::config::BehaviorOptions;
use crate::gateway::{Acknowledged, GatewayError, Intent, Note, NoteDraft, NoteGateway, NoteId};

const DELETE_FAILED: &str = "failed to delete note";
const EDIT_TARGET_MISSING: &str = "note being edited no longer exists";

/// A gateway call the store wants made. Produced by the store, executed by
/// whoever owns the gateway, and answered with an [`Outcome`].
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    List,
    Create {
        draft: NoteDraft,
    },
    Update {
        index: usize,
        id: NoteId,
        draft: NoteDraft,
    },
    Delete {
        index: usize,
        id: NoteId,
    },
}

impl Request {
    pub fn intent(&self) -> Intent {
        match self {
            Request::List => Intent::List,
            Request::Create { .. } => Intent::Create,
            Request::Update { .. } => Intent::Update,
            Request::Delete { .. } => Intent::Delete,
        }
    }

    pub fn execute<G>(self, gateway: &G) -> Outcome
    where
        G: NoteGateway + ?Sized,
    {
        match self {
            Request::List => Outcome::Listed(gateway.list()),
            Request::Create { draft } => Outcome::Created(gateway.create(&draft)),
            Request::Update { index, id, draft } => {
                let result = gateway.update(&id, &draft);
                Outcome::Updated {
                    index,
                    id,
                    draft,
                    result,
                }
            }
            Request::Delete { index, id } => {
                let result = gateway.delete(&id);
                Outcome::Deleted { index, id, result }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Listed(Result<Vec<Note>, GatewayError>),
    Created(Result<Note, GatewayError>),
    Updated {
        index: usize,
        id: NoteId,
        draft: NoteDraft,
        result: Result<Acknowledged, GatewayError>,
    },
    Deleted {
        index: usize,
        id: NoteId,
        result: Result<Acknowledged, GatewayError>,
    },
}

/// Loaded notes plus the form state around them.
///
/// Transitions never touch the network: operations that need the backend
/// return a [`Request`], and the matching [`Outcome`] is folded back in via
/// [`NoteStore::apply`]. Outcomes apply to whatever state is current when they
/// land, so the last completion wins.
#[derive(Debug, Clone, Default)]
pub struct NoteStore {
    notes: Vec<Note>,
    draft: NoteDraft,
    editing: Option<usize>,
    error: Option<String>,
    clear_error_on_success: bool,
}

impl NoteStore {
    pub fn new(behavior: &BehaviorOptions) -> Self {
        Self {
            clear_error_on_success: behavior.clear_error_on_success,
            ..Self::default()
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Position of the note whose id renders as `id`.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|note| note.id.to_string() == id)
    }

    pub fn draft(&self) -> &NoteDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut NoteDraft {
        &mut self.draft
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.draft.content = content.into();
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn editing_index(&self) -> Option<usize> {
        self.editing
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn load_request(&self) -> Request {
        Request::List
    }

    /// Create-or-update from the current draft. Silently does nothing unless
    /// both title and content are present.
    pub fn submit(&mut self) -> Option<Request> {
        if !self.draft.is_complete() {
            return None;
        }
        let Some(index) = self.editing else {
            return Some(Request::Create {
                draft: self.draft.clone(),
            });
        };
        match self.notes.get(index) {
            Some(note) => Some(Request::Update {
                index,
                id: note.id.clone(),
                draft: self.draft.clone(),
            }),
            None => {
                self.editing = None;
                self.fail(EDIT_TARGET_MISSING);
                None
            }
        }
    }

    pub fn delete(&self, index: usize) -> Option<Request> {
        let Some(note) = self.notes.get(index) else {
            tracing::warn!(index, "delete requested for a note that is not loaded");
            return None;
        };
        Some(Request::Delete {
            index,
            id: note.id.clone(),
        })
    }

    /// Loads the note at `index` into the draft and switches to edit mode.
    pub fn begin_edit(&mut self, index: usize) -> bool {
        let Some(note) = self.notes.get(index) else {
            return false;
        };
        self.draft = NoteDraft::new(note.title.clone(), note.content.clone());
        self.editing = Some(index);
        true
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.draft.clear();
    }

    pub fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Listed(Ok(notes)) => {
                tracing::debug!(count = notes.len(), "adopting note list");
                self.notes = notes;
                self.succeed();
            }
            Outcome::Listed(Err(err)) => self.fail(err.to_string()),
            Outcome::Created(Ok(note)) => {
                tracing::debug!(id = %note.id, "note created");
                self.notes.push(note);
                self.draft.clear();
                self.succeed();
            }
            Outcome::Created(Err(err)) => self.fail(err.to_string()),
            Outcome::Updated {
                index,
                id,
                draft,
                result: Ok(_),
            } => {
                match self.locate(index, &id) {
                    Some(slot) => {
                        let note = &mut self.notes[slot];
                        note.title = draft.title;
                        note.content = draft.content;
                    }
                    None => tracing::warn!(%id, "updated note vanished before the response landed"),
                }
                self.editing = None;
                self.draft.clear();
                self.succeed();
            }
            Outcome::Updated { result: Err(err), .. } => self.fail(err.to_string()),
            Outcome::Deleted {
                index,
                id,
                result: Ok(_),
            } => {
                match self.locate(index, &id) {
                    Some(slot) => {
                        self.notes.remove(slot);
                        self.editing = match self.editing {
                            Some(editing) if editing == slot => None,
                            Some(editing) if editing > slot => Some(editing - 1),
                            other => other,
                        };
                    }
                    None => tracing::debug!(%id, "deleted note already gone"),
                }
                self.succeed();
            }
            Outcome::Deleted {
                id, result: Err(err), ..
            } => {
                tracing::error!(%id, %err, "delete request failed");
                self.fail(DELETE_FAILED);
            }
        }
    }

    /// Prefers the captured index, falls back to the id if the list shifted.
    fn locate(&self, index: usize, id: &NoteId) -> Option<usize> {
        match self.notes.get(index) {
            Some(note) if &note.id == id => Some(index),
            _ => self.notes.iter().position(|note| &note.id == id),
        }
    }

    fn succeed(&mut self) {
        if self.clear_error_on_success {
            self.error = None;
        }
    }

    fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(%message, "note sync failed");
        self.error = Some(message);
    }
}
