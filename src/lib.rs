pub mod app;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod store;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use gateway::{HttpGateway, Note, NoteDraft, NoteGateway, NoteId};
pub use store::{NoteStore, Outcome, Request};
