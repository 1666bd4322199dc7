use std::thread;
#[cfg(test)]
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::gateway::NoteGateway;
use crate::store::{Outcome, Request};

/// Background thread that owns the gateway and executes requests one at a
/// time, so the event loop stays responsive while calls are in flight.
///
/// There is no cancellation: dropping the worker closes the request channel
/// and whatever call is running finishes unobserved.
pub struct SyncWorker {
    requests: Sender<Request>,
    outcomes: Receiver<Outcome>,
    in_flight: usize,
}

impl SyncWorker {
    pub fn spawn<G>(gateway: G) -> Result<Self>
    where
        G: NoteGateway + Send + 'static,
    {
        let (request_tx, request_rx) = unbounded::<Request>();
        let (outcome_tx, outcome_rx) = unbounded::<Outcome>();
        thread::Builder::new()
            .name("note-sync".into())
            .spawn(move || {
                for request in request_rx.iter() {
                    let intent = request.intent();
                    let outcome = request.execute(&gateway);
                    if outcome_tx.send(outcome).is_err() {
                        tracing::debug!(%intent, "event loop gone; dropping outcome");
                        break;
                    }
                }
            })
            .context("spawning sync worker thread")?;
        Ok(Self {
            requests: request_tx,
            outcomes: outcome_rx,
            in_flight: 0,
        })
    }

    pub fn send(&mut self, request: Request) -> Result<()> {
        let intent = request.intent();
        self.requests
            .send(request)
            .map_err(|_| anyhow!("sync worker stopped; cannot {intent}"))?;
        self.in_flight += 1;
        Ok(())
    }

    /// Next completed call, if any. Never blocks.
    pub fn try_recv(&mut self) -> Option<Outcome> {
        match self.outcomes.try_recv() {
            Ok(outcome) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if self.in_flight > 0 {
                    tracing::error!(in_flight = self.in_flight, "sync worker exited early");
                    self.in_flight = 0;
                }
                None
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    #[cfg(test)]
    pub(crate) fn recv_timeout(&mut self, timeout: Duration) -> Option<Outcome> {
        let outcome = self.outcomes.recv_timeout(timeout).ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(outcome)
    }
}
