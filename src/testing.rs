//! Scripted in-memory gateway for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::gateway::{Acknowledged, GatewayError, Note, NoteDraft, NoteGateway, NoteId};

#[derive(Debug)]
pub(crate) enum Reply {
    Notes(Vec<Note>),
    Note(Note),
    Ack(u16),
    Fail(GatewayError),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    List,
    Create(NoteDraft),
    Update(NoteId, NoteDraft),
    Delete(NoteId),
}

/// Answers calls with the queued replies in order and records every call.
#[derive(Debug, Default)]
pub(crate) struct FakeGateway {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeGateway {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn next(&self, call: Call) -> Reply {
        self.calls.lock().expect("calls lock").push(call.clone());
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply for {call:?}"))
    }

    fn acknowledge(reply: Reply) -> Result<Acknowledged, GatewayError> {
        match reply {
            Reply::Ack(status) => Ok(Acknowledged { status }),
            Reply::Fail(err) => Err(err),
            other => panic!("expected an acknowledgement, got {other:?}"),
        }
    }
}

impl NoteGateway for FakeGateway {
    fn list(&self) -> Result<Vec<Note>, GatewayError> {
        match self.next(Call::List) {
            Reply::Notes(notes) => Ok(notes),
            Reply::Fail(err) => Err(err),
            other => panic!("expected notes, got {other:?}"),
        }
    }

    fn create(&self, draft: &NoteDraft) -> Result<Note, GatewayError> {
        match self.next(Call::Create(draft.clone())) {
            Reply::Note(note) => Ok(note),
            Reply::Fail(err) => Err(err),
            other => panic!("expected a note, got {other:?}"),
        }
    }

    fn update(&self, id: &NoteId, draft: &NoteDraft) -> Result<Acknowledged, GatewayError> {
        Self::acknowledge(self.next(Call::Update(id.clone(), draft.clone())))
    }

    fn delete(&self, id: &NoteId) -> Result<Acknowledged, GatewayError> {
        Self::acknowledge(self.next(Call::Delete(id.clone())))
    }
}
