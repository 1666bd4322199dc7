use std::fmt::Write as _;
use std::io::{self, Read};

use anyhow::{bail, Result};
use clap::Args;

use crate::app::{ActionDispatcher, App};
use crate::config::AppConfig;
use crate::gateway::{Note, NoteGateway};
use crate::store::NoteStore;

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Title for the note
    pub title: String,
    /// Provide the note content inline. If omitted, reads from stdin.
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Note identifier as assigned by the backend
    pub id: String,
    /// Replacement title
    #[arg(long)]
    pub title: Option<String>,
    /// Replacement content
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Note identifier as assigned by the backend
    pub id: String,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

pub fn list_notes<G: NoteGateway>(config: &AppConfig, gateway: &G) -> Result<()> {
    let store = loaded_store(config, gateway)?;
    print!("{}", format_note_list(store.notes()));
    Ok(())
}

pub fn add_note<G: NoteGateway>(config: &AppConfig, gateway: &G, args: AddArgs) -> Result<()> {
    let content = match args.content {
        Some(content) => content,
        None => read_stdin()?.unwrap_or_default(),
    };
    let note = run_add(config, gateway, args.title, content)?;
    println!("Created note #{}", note.id);
    Ok(())
}

pub fn edit_note<G: NoteGateway>(config: &AppConfig, gateway: &G, args: EditArgs) -> Result<()> {
    let note = run_edit(config, gateway, args)?;
    println!("Updated note #{}", note.id);
    Ok(())
}

pub fn delete_note<G: NoteGateway>(
    config: &AppConfig,
    gateway: &G,
    args: DeleteArgs,
) -> Result<()> {
    run_delete(config, gateway, &args.id)?;
    println!("Deleted note #{}", args.id);
    Ok(())
}

fn loaded_store<G: NoteGateway>(config: &AppConfig, gateway: &G) -> Result<NoteStore> {
    let mut store = NoteStore::new(&config.behavior);
    ActionDispatcher::new(gateway).load_all(&mut store);
    check(&store)?;
    Ok(store)
}

fn run_add<G: NoteGateway>(
    config: &AppConfig,
    gateway: &G,
    title: String,
    content: String,
) -> Result<Note> {
    let mut store = loaded_store(config, gateway)?;
    store.set_title(title);
    store.set_content(content);
    if !ActionDispatcher::new(gateway).submit(&mut store) {
        bail!("note title and content must both be non-empty");
    }
    check(&store)?;
    match store.notes().last() {
        Some(note) => Ok(note.clone()),
        None => bail!("backend accepted the note but it is missing locally"),
    }
}

fn run_edit<G: NoteGateway>(config: &AppConfig, gateway: &G, args: EditArgs) -> Result<Note> {
    if args.title.is_none() && args.content.is_none() {
        bail!("nothing to change; pass --title and/or --content");
    }
    let mut store = loaded_store(config, gateway)?;
    let index = resolve(&store, &args.id)?;
    store.begin_edit(index);
    if let Some(title) = args.title {
        store.set_title(title);
    }
    if let Some(content) = args.content {
        store.set_content(content);
    }
    if !ActionDispatcher::new(gateway).submit(&mut store) {
        bail!("note title and content must both be non-empty");
    }
    check(&store)?;
    let index = resolve(&store, &args.id)?;
    match store.get(index) {
        Some(note) => Ok(note.clone()),
        None => bail!("note {} disappeared after update", args.id),
    }
}

fn run_delete<G: NoteGateway>(config: &AppConfig, gateway: &G, id: &str) -> Result<()> {
    let mut store = loaded_store(config, gateway)?;
    let index = resolve(&store, id)?;
    ActionDispatcher::new(gateway).delete(&mut store, index);
    check(&store)
}

fn resolve(store: &NoteStore, id: &str) -> Result<usize> {
    match store.index_of(id) {
        Some(index) => Ok(index),
        None => bail!("no note with id {id}"),
    }
}

fn check(store: &NoteStore) -> Result<()> {
    match store.error() {
        Some(message) => bail!("{message}"),
        None => Ok(()),
    }
}

fn format_note_list(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "No notes.\n".to_string();
    }
    let mut out = String::new();
    for note in notes {
        let _ = writeln!(&mut out, "#{}  {}", note.id, note.title);
        for line in note.content.lines() {
            let _ = writeln!(&mut out, "    {line}");
        }
        out.push('\n');
    }
    out
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf.trim_end_matches('\n').to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, Intent, NoteDraft, NoteId};
    use crate::testing::{Call, FakeGateway, Reply};

    type TestResult<T = ()> = Result<T>;

    #[test]
    fn list_output_shows_ids_titles_and_indented_content() {
        let notes = vec![
            Note::new(3, "Groceries", "milk\neggs"),
            Note::new("a7", "Call Sam", "tomorrow"),
        ];
        insta::assert_snapshot!(format_note_list(&notes), @r"
        #3  Groceries
            milk
            eggs

        #a7  Call Sam
            tomorrow
        ");
    }

    #[test]
    fn list_output_for_empty_collection() {
        assert_eq!(format_note_list(&[]), "No notes.\n");
    }

    #[test]
    fn cli_add_returns_server_note() -> TestResult {
        let gateway = FakeGateway::new([
            Reply::Notes(vec![]),
            Reply::Note(Note::new(7, "T", "C")),
        ]);
        let note = run_add(&AppConfig::default(), &gateway, "T".into(), "C".into())?;
        assert_eq!(note, Note::new(7, "T", "C"));
        Ok(())
    }

    #[test]
    fn cli_add_rejects_empty_content_without_calling_backend() {
        let gateway = FakeGateway::new([Reply::Notes(vec![])]);
        let err = run_add(&AppConfig::default(), &gateway, "T".into(), String::new())
            .expect_err("empty content");
        assert!(err.to_string().contains("non-empty"));
        assert_eq!(gateway.calls(), vec![Call::List]);
    }

    #[test]
    fn cli_add_reports_backend_rejection() {
        let gateway = FakeGateway::new([
            Reply::Notes(vec![]),
            Reply::Fail(GatewayError::Status {
                intent: Intent::Create,
                status: 400,
            }),
        ]);
        let err = run_add(&AppConfig::default(), &gateway, "T".into(), "C".into())
            .expect_err("rejected");
        assert_eq!(err.to_string(), "failed to add note (HTTP 400)");
    }

    #[test]
    fn cli_edit_keeps_untouched_fields() -> TestResult {
        let gateway = FakeGateway::new([
            Reply::Notes(vec![Note::new(3, "Title", "old")]),
            Reply::Ack(200),
        ]);
        let args = EditArgs {
            id: "3".into(),
            title: None,
            content: Some("new".into()),
        };
        let note = run_edit(&AppConfig::default(), &gateway, args)?;
        assert_eq!(note, Note::new(3, "Title", "new"));
        assert_eq!(
            gateway.calls().last(),
            Some(&Call::Update(NoteId::from(3), NoteDraft::new("Title", "new")))
        );
        Ok(())
    }

    #[test]
    fn cli_edit_unknown_id_fails() {
        let gateway = FakeGateway::new([Reply::Notes(vec![Note::new(3, "Title", "old")])]);
        let args = EditArgs {
            id: "4".into(),
            title: Some("x".into()),
            content: None,
        };
        let err = run_edit(&AppConfig::default(), &gateway, args).expect_err("unknown id");
        assert_eq!(err.to_string(), "no note with id 4");
    }

    #[test]
    fn cli_delete_ignores_status_but_not_transport_errors() -> TestResult {
        let gateway = FakeGateway::new([
            Reply::Notes(vec![Note::new(1, "a", "b")]),
            Reply::Ack(500),
        ]);
        run_delete(&AppConfig::default(), &gateway, "1")?;

        let gateway = FakeGateway::new([
            Reply::Notes(vec![Note::new(1, "a", "b")]),
            Reply::Fail(GatewayError::Transport("connection reset".into())),
        ]);
        let err = run_delete(&AppConfig::default(), &gateway, "1").expect_err("transport");
        assert_eq!(err.to_string(), "failed to delete note");
        Ok(())
    }

    #[test]
    fn cli_commands_stop_when_load_fails() {
        let gateway = FakeGateway::new([Reply::Fail(GatewayError::NotAList)]);
        let err = run_delete(&AppConfig::default(), &gateway, "1").expect_err("load failed");
        assert_eq!(err.to_string(), "fetched data is not a list");
        assert_eq!(gateway.calls(), vec![Call::List]);
    }
}
