use crate::gateway::NoteGateway;
use crate::store::{NoteStore, Request};

/// Runs store requests against a gateway on the calling thread.
pub struct ActionDispatcher<'a, G: ?Sized> {
    gateway: &'a G,
}

impl<'a, G> ActionDispatcher<'a, G>
where
    G: NoteGateway + ?Sized,
{
    pub fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }

    pub fn run(&self, store: &mut NoteStore, request: Request) {
        let intent = request.intent();
        tracing::debug!(%intent, "dispatching request");
        let outcome = request.execute(self.gateway);
        store.apply(outcome);
    }

    pub fn load_all(&self, store: &mut NoteStore) {
        let request = store.load_request();
        self.run(store, request);
    }

    /// Returns `false` when the draft was incomplete and nothing was sent.
    pub fn submit(&self, store: &mut NoteStore) -> bool {
        match store.submit() {
            Some(request) => {
                self.run(store, request);
                true
            }
            None => false,
        }
    }

    pub fn delete(&self, store: &mut NoteStore, index: usize) -> bool {
        match store.delete(index) {
            Some(request) => {
                self.run(store, request);
                true
            }
            None => false,
        }
    }
}
