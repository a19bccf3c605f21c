//! Preview session behavior against in-memory storage, on a paused clock.

use loupe_canvas_preview::{MarkdownRenderer, Mode, PreviewSession, PreviewSettings, SaveStatus};
use loupe_plugin_api::testing::{FailingRenderer, MemoryStorage, SlowRenderer};
use loupe_plugin_api::{EventSender, EventType, Placeholder, Renderer, ResourceRef};
use std::sync::Arc;
use std::time::Duration;

const AUTOSAVE: Duration = Duration::from_millis(2000);

fn session_with(storage: &Arc<MemoryStorage>, renderer: Arc<dyn Renderer>) -> PreviewSession {
    PreviewSession::new(
        storage.clone(),
        renderer,
        &PreviewSettings::default(),
        EventSender::new(),
    )
}

fn markdown_session(storage: &Arc<MemoryStorage>) -> PreviewSession {
    session_with(storage, Arc::new(MarkdownRenderer::new()))
}

fn note(path: &str) -> Option<ResourceRef> {
    Some(ResourceRef::new(path))
}

fn shown_heading(session: &PreviewSession) -> Option<String> {
    session
        .preview()
        .document()
        .and_then(|doc| doc.first_heading().map(str::to_string))
}

/// Let spawned tasks run without moving the clock.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

async fn idle(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn test_preview_edit_autosave_and_rerender() {
    let storage = Arc::new(MemoryStorage::new().with_file("note.md", "# Hello"));
    let session = markdown_session(&storage);

    session.set_file(note("note.md")).await;
    assert_eq!(shown_heading(&session).as_deref(), Some("Hello"));
    assert_eq!(session.mode(), Mode::Preview);

    session.toggle_mode().await;
    assert_eq!(session.mode(), Mode::Edit);
    assert_eq!(session.buffer(), "# Hello");

    session.on_buffer_edit(format!("{} world", session.buffer()));
    assert_eq!(session.buffer(), "# Hello world");
    assert_eq!(session.save_status(), SaveStatus::Unsaved);

    idle(AUTOSAVE - Duration::from_millis(1)).await;
    assert_eq!(storage.write_count(), 0);

    idle(Duration::from_millis(1)).await;
    assert_eq!(
        storage.writes(),
        vec![("note.md".to_string(), "# Hello world".to_string())]
    );
    assert_eq!(session.save_status(), SaveStatus::Saved);

    session.toggle_mode().await;
    assert_eq!(session.mode(), Mode::Preview);
    assert_eq!(shown_heading(&session).as_deref(), Some("Hello world"));
    assert_eq!(storage.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_round_trip_without_edits_keeps_render() {
    let storage = Arc::new(MemoryStorage::new().with_file("note.md", "# Title\n\n- a\n- b"));
    let session = markdown_session(&storage);

    session.set_file(note("note.md")).await;
    let initial = session.preview();

    session.toggle_mode().await;
    session.toggle_mode().await;

    assert_eq!(session.mode(), Mode::Preview);
    assert_eq!(session.preview(), initial);
    assert_eq!(session.save_status(), SaveStatus::Saved);
    assert_eq!(storage.write_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_edits_saves_once_after_last() {
    let storage = Arc::new(MemoryStorage::new().with_file("note.md", "start"));
    let session = markdown_session(&storage);
    session.set_file(note("note.md")).await;
    session.toggle_mode().await;

    for i in 1..=5 {
        session.on_buffer_edit(format!("draft {i}"));
        idle(Duration::from_millis(1500)).await;
    }
    assert_eq!(storage.write_attempts(), 0);
    assert!(session.has_pending_autosave());

    // Last edit was 1500 ms ago.
    idle(Duration::from_millis(499)).await;
    assert_eq!(storage.write_attempts(), 0);
    idle(Duration::from_millis(1)).await;
    assert_eq!(storage.write_attempts(), 1);
    assert_eq!(storage.contents("note.md").as_deref(), Some("draft 5"));

    idle(Duration::from_secs(30)).await;
    assert_eq!(storage.write_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_keeps_buffer_and_recovers() {
    let storage = Arc::new(MemoryStorage::new().with_file("note.md", "original"));
    let session = markdown_session(&storage);
    session.set_file(note("note.md")).await;
    session.toggle_mode().await;

    storage.fail_writes(true);
    session.on_buffer_edit("changed");
    idle(AUTOSAVE).await;

    assert_eq!(session.save_status(), SaveStatus::Error);
    assert_eq!(session.buffer(), "changed");
    assert_eq!(storage.contents("note.md").as_deref(), Some("original"));
    assert_eq!(storage.write_attempts(), 1);

    storage.fail_writes(false);
    session.on_buffer_edit("changed again");
    assert_eq!(session.save_status(), SaveStatus::Unsaved);
    idle(AUTOSAVE).await;

    assert_eq!(session.save_status(), SaveStatus::Saved);
    assert_eq!(storage.contents("note.md").as_deref(), Some("changed again"));
}

#[tokio::test(start_paused = true)]
async fn test_leaving_edit_mode_retries_failed_save() {
    let storage = Arc::new(MemoryStorage::new().with_file("note.md", "# Old"));
    let session = markdown_session(&storage);
    session.set_file(note("note.md")).await;
    session.toggle_mode().await;

    storage.fail_writes(true);
    session.on_buffer_edit("# New");
    idle(AUTOSAVE).await;
    assert_eq!(session.save_status(), SaveStatus::Error);

    storage.fail_writes(false);
    session.toggle_mode().await;

    assert_eq!(session.save_status(), SaveStatus::Saved);
    assert_eq!(storage.contents("note.md").as_deref(), Some("# New"));
    assert_eq!(shown_heading(&session).as_deref(), Some("New"));
}

#[tokio::test(start_paused = true)]
async fn test_close_with_unsaved_edit_writes_once() {
    let storage = Arc::new(MemoryStorage::new().with_file("note.md", "v1"));
    let session = markdown_session(&storage);
    session.set_file(note("note.md")).await;
    session.toggle_mode().await;

    session.on_buffer_edit("v2");
    session.on_buffer_edit("v3");
    session.close().await;

    assert_eq!(
        storage.writes(),
        vec![("note.md".to_string(), "v3".to_string())]
    );
    assert!(!session.has_pending_autosave());

    idle(Duration::from_secs(10)).await;
    assert_eq!(storage.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_close_when_saved_writes_nothing() {
    let storage = Arc::new(MemoryStorage::new().with_file("note.md", "v1"));
    let session = markdown_session(&storage);
    session.set_file(note("note.md")).await;
    session.toggle_mode().await;

    session.close().await;
    assert_eq!(storage.write_attempts(), 0);
    assert!(session.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_switching_resource_flushes_unsaved_edits_first() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("a.md", "# A")
            .with_file("b.md", "# B"),
    );
    let session = markdown_session(&storage);
    session.set_file(note("a.md")).await;
    session.toggle_mode().await;
    session.on_buffer_edit("# A edited");

    session.set_file(note("b.md")).await;

    assert_eq!(
        storage.writes(),
        vec![("a.md".to_string(), "# A edited".to_string())]
    );
    assert_eq!(session.active_resource(), note("b.md"));
    assert_eq!(session.mode(), Mode::Preview);
    assert_eq!(session.save_status(), SaveStatus::Saved);
    assert_eq!(shown_heading(&session).as_deref(), Some("B"));

    // The cancelled autosave for a.md never fires.
    idle(AUTOSAVE * 2).await;
    assert_eq!(storage.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_switch_waits_for_save_in_flight() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("a.md", "a")
            .with_file("b.md", "b"),
    );
    storage.set_write_delay(Duration::from_millis(300));
    let session = markdown_session(&storage);
    session.set_file(note("a.md")).await;
    session.toggle_mode().await;
    session.on_buffer_edit("a2");

    idle(AUTOSAVE).await;
    assert_eq!(session.save_status(), SaveStatus::Saving);

    let switch = {
        let session = session.clone();
        tokio::spawn(async move { session.set_file(note("b.md")).await })
    };
    settle().await;
    assert_eq!(session.active_resource(), note("a.md"));
    assert_eq!(session.mode(), Mode::Edit);

    idle(Duration::from_millis(300)).await;
    switch.await.unwrap();

    assert_eq!(storage.contents("a.md").as_deref(), Some("a2"));
    assert_eq!(storage.write_count(), 1);
    assert_eq!(session.active_resource(), note("b.md"));
    assert_eq!(session.buffer(), "b");
}

#[tokio::test(start_paused = true)]
async fn test_edit_during_save_stays_dirty() {
    let storage = Arc::new(MemoryStorage::new().with_file("note.md", "one"));
    storage.set_write_delay(Duration::from_millis(300));
    let session = markdown_session(&storage);
    session.set_file(note("note.md")).await;
    session.toggle_mode().await;

    session.on_buffer_edit("two");
    idle(AUTOSAVE).await;
    assert_eq!(session.save_status(), SaveStatus::Saving);

    session.on_buffer_edit("three");
    assert_eq!(session.save_status(), SaveStatus::Saving);

    idle(Duration::from_millis(300)).await;
    assert_eq!(storage.contents("note.md").as_deref(), Some("two"));
    assert_eq!(session.save_status(), SaveStatus::Unsaved);

    // The second autosave was scheduled by the edit made during the write.
    idle(AUTOSAVE - Duration::from_millis(300)).await;
    assert_eq!(session.save_status(), SaveStatus::Saving);
    idle(Duration::from_millis(300)).await;
    assert_eq!(storage.contents("note.md").as_deref(), Some("three"));
    assert_eq!(session.save_status(), SaveStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn test_stale_render_is_discarded() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("slow.md", "# Slow")
            .with_file("fast.md", "# Fast"),
    );
    let renderer = Arc::new(SlowRenderer::new(Arc::new(MarkdownRenderer::new())));
    renderer.delay("slow.md", Duration::from_millis(500));
    let session = session_with(&storage, renderer.clone());

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.set_file(note("slow.md")).await })
    };
    settle().await;
    assert_eq!(renderer.calls(), vec!["slow.md".to_string()]);

    session.set_file(note("fast.md")).await;
    assert_eq!(shown_heading(&session).as_deref(), Some("Fast"));

    idle(Duration::from_millis(500)).await;
    first.await.unwrap();
    assert_eq!(session.active_resource(), note("fast.md"));
    assert_eq!(shown_heading(&session).as_deref(), Some("Fast"));
}

#[tokio::test(start_paused = true)]
async fn test_load_failure_shows_placeholder_and_refuses_edits() {
    let storage = Arc::new(MemoryStorage::new().with_file("good.md", "# Good"));
    let session = markdown_session(&storage);

    session.set_file(note("missing.md")).await;
    assert_eq!(session.preview().placeholder(), Some(Placeholder::LoadFailed));
    assert_eq!(session.save_status(), SaveStatus::Saved);

    session.toggle_mode().await;
    assert_eq!(session.mode(), Mode::Preview);
    session.on_buffer_edit("typed");
    assert_eq!(session.save_status(), SaveStatus::Saved);
    idle(AUTOSAVE).await;
    assert_eq!(storage.write_attempts(), 0);

    session.set_file(note("good.md")).await;
    assert_eq!(shown_heading(&session).as_deref(), Some("Good"));
}

#[tokio::test(start_paused = true)]
async fn test_render_failure_leaves_buffer_editable() {
    let storage = Arc::new(MemoryStorage::new().with_file("note.md", "text"));
    let session = session_with(&storage, Arc::new(FailingRenderer));

    session.set_file(note("note.md")).await;
    assert_eq!(session.preview().placeholder(), Some(Placeholder::RenderFailed));
    assert_eq!(session.buffer(), "text");
    assert_eq!(session.save_status(), SaveStatus::Saved);

    session.toggle_mode().await;
    assert_eq!(session.mode(), Mode::Edit);
    session.on_buffer_edit("text, edited");
    session.toggle_mode().await;

    assert_eq!(storage.contents("note.md").as_deref(), Some("text, edited"));
    assert_eq!(session.preview().placeholder(), Some(Placeholder::RenderFailed));
}

#[tokio::test(start_paused = true)]
async fn test_status_changes_are_published() {
    let storage = Arc::new(MemoryStorage::new().with_file("note.md", "x"));
    let events = EventSender::new();
    let mut rx = events.subscribe();
    let session = PreviewSession::new(
        storage.clone(),
        Arc::new(MarkdownRenderer::new()),
        &PreviewSettings::default(),
        events,
    );

    session.set_file(note("note.md")).await;
    session.toggle_mode().await;
    session.on_buffer_edit("y");
    idle(AUTOSAVE).await;

    let mut kinds = Vec::new();
    let mut statuses = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if event.event_type() == EventType::SaveStatusChanged {
            assert_eq!(event.get_metadata("resource"), Some("note.md"));
            statuses.push(event.data().to_string());
        }
        kinds.push(event.event_type());
    }

    assert_eq!(
        &kinds[..3],
        &[
            EventType::ResourceSelected,
            EventType::ResourceLoaded,
            EventType::ModeChanged
        ]
    );
    assert_eq!(statuses, vec!["Unsaved changes", "Saving...", "Saved"]);
}

#[tokio::test(start_paused = true)]
async fn test_edit_during_switch_flush_is_written_before_rebinding() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("a.md", "a")
            .with_file("b.md", "b"),
    );
    storage.set_write_delay(Duration::from_millis(300));
    let session = markdown_session(&storage);
    session.set_file(note("a.md")).await;
    session.toggle_mode().await;
    session.on_buffer_edit("a2");

    let switch = {
        let session = session.clone();
        tokio::spawn(async move { session.set_file(note("b.md")).await })
    };
    settle().await;
    assert_eq!(session.save_status(), SaveStatus::Saving);

    session.on_buffer_edit("a3");
    assert_eq!(session.buffer(), "a3");

    // First write lands, the newer edit is written next.
    idle(Duration::from_millis(300)).await;
    assert_eq!(session.active_resource(), note("a.md"));
    assert_eq!(session.save_status(), SaveStatus::Saving);

    idle(Duration::from_millis(300)).await;
    switch.await.unwrap();

    assert_eq!(
        storage.writes(),
        vec![
            ("a.md".to_string(), "a2".to_string()),
            ("a.md".to_string(), "a3".to_string()),
        ]
    );
    assert_eq!(session.active_resource(), note("b.md"));
    assert_eq!(session.buffer(), "b");
    assert_eq!(session.save_status(), SaveStatus::Saved);

    idle(AUTOSAVE * 2).await;
    assert_eq!(storage.write_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_edit_during_close_flush_is_written() {
    let storage = Arc::new(MemoryStorage::new().with_file("note.md", "v1"));
    storage.set_write_delay(Duration::from_millis(300));
    let session = markdown_session(&storage);
    session.set_file(note("note.md")).await;
    session.toggle_mode().await;
    session.on_buffer_edit("v2");

    let close = {
        let session = session.clone();
        tokio::spawn(async move { session.close().await })
    };
    settle().await;
    assert_eq!(session.save_status(), SaveStatus::Saving);

    session.on_buffer_edit("v3");
    idle(Duration::from_millis(300)).await;
    assert!(!session.is_closed());

    idle(Duration::from_millis(300)).await;
    close.await.unwrap();

    assert!(session.is_closed());
    assert_eq!(storage.contents("note.md").as_deref(), Some("v3"));
    assert_eq!(session.save_status(), SaveStatus::Saved);

    session.on_buffer_edit("v4");
    assert_eq!(session.buffer(), "v3");
    idle(AUTOSAVE * 2).await;
    assert_eq!(storage.write_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_binding_after_failed_save_starts_a_clean_lifecycle() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("a.md", "a")
            .with_file("b.md", "b"),
    );
    let session = markdown_session(&storage);
    session.set_file(note("a.md")).await;
    session.toggle_mode().await;

    storage.fail_writes(true);
    session.on_buffer_edit("a2");
    session.set_file(note("b.md")).await;

    // The failed flush is attempted once and does not block the switch.
    assert_eq!(storage.write_attempts(), 1);
    assert_eq!(storage.contents("a.md").as_deref(), Some("a"));
    assert_eq!(session.active_resource(), note("b.md"));
    assert_eq!(session.save_status(), SaveStatus::Saved);
    assert!(!SaveStatus::Error.can_transition_to(SaveStatus::Saved));

    storage.fail_writes(false);
    session.on_buffer_edit("b2");
    assert_eq!(session.save_status(), SaveStatus::Unsaved);
    idle(AUTOSAVE).await;
    assert_eq!(storage.contents("b.md").as_deref(), Some("b2"));
}
