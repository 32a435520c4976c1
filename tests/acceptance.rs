use inkwell_core::{
    Attributes, Command, EngineConfig, FormatDelta, Library, RichText, Serializer, Session,
    StepOutcome, StyleRun, TextDocument, UndoEngine, UndoState,
};
use tempfile::tempdir;

fn type_into(session: &mut Session, text: &str) {
    for ch in text.chars() {
        let at = session.document().len_chars();
        session.keystroke(at, ch).unwrap();
    }
}

#[test]
fn hello_bold_save_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("library.json");
    let mut library = Library::default();
    library.create("greeting");
    library.save(&path).unwrap();

    let mut library = Library::load(&path).unwrap();
    let record = library.find_mut("greeting").unwrap();
    let mut session = Session::open(record, EngineConfig::default());
    type_into(&mut session, "Hello");
    session.flush();
    session
        .format(0..5, FormatDelta::set(Attributes::BOLD))
        .unwrap();
    assert_eq!(session.engine().undo_labels(), vec!["Bold", "Typing"]);
    session.save(record).unwrap();
    library.save(&path).unwrap();
    drop(session);

    let mut library = Library::load(&path).unwrap();
    let record = library.find_mut("greeting").unwrap();
    let mut session = Session::open(record, EngineConfig::default());
    assert_eq!(session.engine().undo_depth(), 1);
    assert_eq!(session.engine().redo_depth(), 0);
    assert_eq!(session.document().styles(), &[StyleRun::new(5, Attributes::BOLD)]);

    assert_eq!(
        session.undo(),
        StepOutcome::Applied {
            label: "Bold".into()
        }
    );
    assert_eq!(session.document().text(), "Hello");
    assert_eq!(session.document().styles(), &[StyleRun::new(5, Attributes::empty())]);
    assert_eq!(session.undo(), StepOutcome::Empty);
}

#[test]
fn typing_abc_is_one_undo_unit() {
    let mut doc = RichText::from_text("");
    let mut engine = UndoEngine::default();
    for (at, ch) in ["a", "b", "c"].into_iter().enumerate() {
        let cmd = Command::insert(&doc, at, ch);
        engine.execute(&mut doc, cmd).unwrap();
    }
    engine.flush_typing_buffer();
    assert_eq!(engine.undo_depth(), 1);
    assert!(engine.undo(&mut doc).is_applied());
    assert_eq!(doc.text(), "");
}

#[test]
fn capacity_100_push_101() {
    let mut doc = RichText::from_text(&"x".repeat(101));
    let mut engine = UndoEngine::default();
    assert_eq!(engine.capacity(), 100);
    for i in 0..101 {
        let cmd = Command::format(&doc, i..i + 1, FormatDelta::set(Attributes::ITALIC)).unwrap();
        engine.execute(&mut doc, cmd).unwrap();
        assert!(engine.undo_depth() <= 100);
    }
    assert_eq!(engine.undo_depth(), 100);
    let mut undone = 0;
    while engine.undo(&mut doc).is_applied() {
        undone += 1;
    }
    assert_eq!(undone, 100);
    assert_eq!(doc.attrs_at(0), Attributes::ITALIC);
    assert!((1..101).all(|i| doc.attrs_at(i).is_empty()));
}

#[test]
fn retention_filter_bounds_payload() {
    let serializer = Serializer::default();
    let mut doc = RichText::from_text("");
    let mut engine = UndoEngine::default();
    // many separate typing runs and pastes, one formatting command
    for i in 0..80 {
        let at = doc.len_chars();
        let cmd = Command::insert(&doc, at, format!("chunk {i} "));
        engine.execute(&mut doc, cmd).unwrap();
        let at = doc.len_chars();
        let cmd = Command::insert(&doc, at, "z");
        engine.execute(&mut doc, cmd).unwrap();
    }
    let cmd = Command::format(&doc, 0..5, FormatDelta::set(Attributes::UNDERLINE)).unwrap();
    engine.execute(&mut doc, cmd).unwrap();

    let mut state = UndoState::default();
    assert_eq!(serializer.save(&mut engine, &mut state).unwrap(), 1);
    let raw: Vec<serde_json::Value> =
        serde_json::from_slice(state.undo_stack_data.as_deref().unwrap()).unwrap();
    assert_eq!(raw.len(), 1);
    assert!(raw.iter().all(|e| e["type"] != "typing" && e["type"] != "insert"));
}

#[test]
fn redo_does_not_survive_reload() {
    let mut library = Library::default();
    library.create("doc");
    let record = library.find_mut("doc").unwrap();
    let mut session = Session::open(record, EngineConfig::default());
    session.insert(0, "abcdef").unwrap();
    session.delete(0..3).unwrap();
    session
        .format(0..3, FormatDelta::set(Attributes::STRIKETHROUGH))
        .unwrap();
    session.undo();
    assert!(session.engine().can_redo());
    session.save(record).unwrap();
    assert!(record.undo.as_ref().unwrap().redo_stack_data.is_none());

    let session = Session::open(record, EngineConfig::default());
    assert!(!session.engine().can_redo());
    assert_eq!(session.engine().undo_labels(), vec!["Delete"]);
}

#[test]
fn oversized_history_on_disk_starts_fresh() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("library.json");
    let mut library = Library::default();
    let id = library.create("legacy").id;
    let record = library.find_mut("legacy").unwrap();
    record.text = "legacy text".into();
    record.undo_state_mut().undo_stack_data = Some(vec![b'['; 2 * 1024 * 1024]);
    library.save(&path).unwrap();

    let mut library = Library::load(&path).unwrap();
    let record = library.find_mut(&id.to_string()).unwrap();
    let session = Session::open(record, EngineConfig::default());
    assert!(!session.engine().can_undo());
    assert_eq!(session.document().text(), "legacy text");
    assert!(!record.undo.as_ref().unwrap().has_history());
}
