use artifact_core::{
    ArtifactId, ArtifactKind, Coordinator, CoordinatorError, GatewayError, ManualClock,
    MemoryGateway, PendingChanges, QueuedSpawner, Rejection, SaveOrigin, SaveRequest,
    SelectOutcome, SessionConfig, SessionEvent, SessionState,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

/// Rejects `eval(` as unsafe and the marker `SYNTAX` as a syntax error.
fn strict(_kind: ArtifactKind, text: &str) -> Result<(), Rejection> {
    if text.contains("eval(") {
        return Err(Rejection::UnsafePattern {
            pattern: "eval(".to_string(),
        });
    }
    if let Some(offset) = text.find("SYNTAX") {
        return Err(Rejection::SyntaxError {
            detail: format!("unexpected token at 1:{}", offset + 1),
        });
    }
    Ok(())
}

struct Harness {
    gateway: Arc<MemoryGateway>,
    clock: Arc<ManualClock>,
    spawner: Arc<QueuedSpawner>,
    coordinator: Coordinator,
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl Harness {
    fn new(gateway: MemoryGateway) -> Self {
        Self::with_confirmation(gateway, |_: &PendingChanges| false)
    }

    fn with_confirmation(
        gateway: MemoryGateway,
        confirm: impl FnMut(&PendingChanges) -> bool + Send + 'static,
    ) -> Self {
        let gateway = Arc::new(gateway);
        let clock = Arc::new(ManualClock::new());
        let spawner = Arc::new(QueuedSpawner::new());
        let mut coordinator = Coordinator::new(gateway.clone(), Arc::new(strict))
            .with_clock(clock.clone())
            .with_spawner(spawner.clone())
            .with_confirmation(confirm)
            .with_config(SessionConfig {
                editor_identity: "tester".to_string(),
                ..SessionConfig::default()
            });

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        coordinator.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let mut harness = Self {
            gateway,
            clock,
            spawner,
            coordinator,
            events,
        };
        harness.coordinator.refresh();
        harness.settle();
        harness
    }

    /// Run every queued gateway call and apply the results.
    fn settle(&mut self) {
        while self.spawner.run_all() > 0 {
            self.coordinator.poll();
        }
        self.coordinator.poll();
    }

    fn advance(&mut self, ms: u64) {
        self.clock.advance_ms(ms);
        self.coordinator.poll();
    }

    fn state(&self) -> SessionState {
        self.coordinator.session().unwrap().state()
    }

    fn id(&self, path: &str) -> ArtifactId {
        self.coordinator.find_by_path(path).unwrap().id.clone()
    }

    fn take_events(&self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

fn store_with_app_js() -> MemoryGateway {
    let gateway = MemoryGateway::new();
    gateway
        .seed_at_version("site/app.js", ArtifactKind::JavaScript, "a=1", 3)
        .unwrap();
    gateway
}

fn store_with_two() -> MemoryGateway {
    let gateway = MemoryGateway::new();
    gateway
        .seed("a/first.js", ArtifactKind::JavaScript, "let a = 1;")
        .unwrap();
    gateway
        .seed("b/second.css", ArtifactKind::Css, "p {}")
        .unwrap();
    gateway
}

#[test]
fn test_refresh_selects_first_artifact() {
    let h = Harness::new(store_with_two());

    assert_eq!(h.coordinator.artifacts().len(), 2);
    let session = h.coordinator.session().unwrap();
    assert_eq!(session.artifact().path, "a/first.js");
    assert_eq!(session.buffer(), "let a = 1;");
    assert_eq!(session.state(), SessionState::Clean);
    assert!(h.coordinator.is_idle());
}

#[test]
fn test_autosave_after_quiet_period() {
    let mut h = Harness::new(store_with_app_js());
    assert_eq!(h.coordinator.session().unwrap().artifact().version, 3);

    h.coordinator.edit("a=2").unwrap();
    assert_eq!(h.state(), SessionState::Dirty);

    h.advance(2999);
    assert_eq!(h.state(), SessionState::Dirty);
    assert_eq!(h.gateway.write_calls(), 0);

    h.advance(1);
    assert_eq!(h.state(), SessionState::Saving);
    h.settle();

    let session = h.coordinator.session().unwrap();
    assert_eq!(session.state(), SessionState::Clean);
    assert_eq!(session.baseline(), "a=2");
    assert_eq!(session.artifact().version, 4);
    assert!(!session.is_dirty());
    assert_eq!(session.artifact().updated_by, "tester");
    assert_eq!(h.gateway.write_calls(), 1);
    assert!(h.coordinator.is_idle());
}

#[test]
fn test_steady_edits_never_autosave() {
    let mut h = Harness::new(store_with_app_js());

    for i in 0..50 {
        h.coordinator.edit(format!("a={i}x")).unwrap();
        h.advance(1000);
        h.settle();
    }

    assert_eq!(h.gateway.write_calls(), 0);
    assert_eq!(h.state(), SessionState::Dirty);
}

#[test]
fn test_edit_back_to_baseline_is_clean_and_disarms_timer() {
    let mut h = Harness::new(store_with_app_js());

    h.coordinator.edit("a=2").unwrap();
    assert!(h.coordinator.next_deadline().is_some());
    h.coordinator.edit("a=1").unwrap();

    assert_eq!(h.state(), SessionState::Clean);
    assert_eq!(h.coordinator.next_deadline(), None);
    h.advance(10_000);
    assert_eq!(h.gateway.write_calls(), 0);
}

#[test]
fn test_manual_save_round_trip() {
    let mut h = Harness::new(store_with_app_js());

    h.coordinator.edit("a=42").unwrap();
    assert_eq!(h.coordinator.save().unwrap(), SaveRequest::Started);
    assert_eq!(h.coordinator.next_deadline(), None);
    h.settle();

    let session = h.coordinator.session().unwrap();
    assert_eq!(session.state(), SessionState::Clean);
    assert_eq!(session.baseline(), "a=42");
    assert!(session.last_saved_at().is_some());
    assert_eq!(h.gateway.get(&session.artifact().id).unwrap().content, "a=42");
    assert!(h.take_events().contains(&SessionEvent::Saved {
        artifact_id: session.artifact().id.clone(),
        origin: SaveOrigin::Manual,
        version: 4,
    }));
}

#[test]
fn test_manual_save_of_clean_buffer_does_nothing() {
    let mut h = Harness::new(store_with_app_js());

    assert_eq!(h.coordinator.save().unwrap(), SaveRequest::NothingToSave);
    h.settle();
    assert_eq!(h.gateway.write_calls(), 0);
}

#[test]
fn test_unsafe_pattern_blocks_manual_save() {
    let mut h = Harness::new(store_with_app_js());

    h.coordinator.edit(r#"eval("x")"#).unwrap();
    let request = h.coordinator.save().unwrap();
    h.settle();

    assert!(matches!(
        request,
        SaveRequest::Rejected(Rejection::UnsafePattern { .. })
    ));
    let session = h.coordinator.session().unwrap();
    assert_eq!(session.state(), SessionState::Rejected);
    assert_eq!(session.buffer(), r#"eval("x")"#);
    assert_eq!(session.rejection().unwrap().category(), "unsafe");
    assert_eq!(h.gateway.write_calls(), 0);
}

#[test]
fn test_rejected_autosave_writes_nothing_and_next_edit_clears_rejection() {
    let mut h = Harness::new(store_with_app_js());

    h.coordinator.edit("a=SYNTAX").unwrap();
    h.advance(3000);
    h.settle();

    assert_eq!(h.state(), SessionState::Rejected);
    assert_eq!(h.gateway.write_calls(), 0);
    assert!(matches!(
        h.coordinator.session().unwrap().rejection(),
        Some(Rejection::SyntaxError { .. })
    ));
    assert!(h.take_events().iter().any(|e| matches!(
        e,
        SessionEvent::Rejected {
            origin: SaveOrigin::Auto,
            ..
        }
    )));

    h.coordinator.edit("a=3").unwrap();
    assert_eq!(h.state(), SessionState::Dirty);
    assert_eq!(h.coordinator.session().unwrap().rejection(), None);

    h.advance(3000);
    h.settle();
    assert_eq!(h.state(), SessionState::Clean);
    assert_eq!(h.gateway.write_calls(), 1);
}

#[test]
fn test_edits_during_save_are_kept() {
    let mut h = Harness::new(store_with_app_js());

    h.coordinator.edit("a=2").unwrap();
    h.coordinator.save().unwrap();
    assert_eq!(h.state(), SessionState::Saving);

    h.coordinator.edit("a=3").unwrap();
    assert_eq!(h.state(), SessionState::Saving);
    assert_eq!(
        h.coordinator.session().unwrap().saving_content(),
        Some("a=2")
    );

    h.settle();
    let session = h.coordinator.session().unwrap();
    assert_eq!(session.buffer(), "a=3");
    assert_eq!(session.baseline(), "a=2");
    assert_eq!(session.state(), SessionState::Dirty);
    assert!(h.coordinator.next_deadline().is_some());

    h.advance(3000);
    h.settle();
    let session = h.coordinator.session().unwrap();
    assert_eq!(session.state(), SessionState::Clean);
    assert_eq!(session.baseline(), "a=3");
    assert_eq!(h.gateway.write_calls(), 2);
}

#[test]
fn test_save_during_save_is_queued_and_replayed() {
    let mut h = Harness::new(store_with_app_js());

    h.coordinator.edit("a=2").unwrap();
    h.coordinator.save().unwrap();
    h.coordinator.edit("a=3").unwrap();
    assert_eq!(h.coordinator.save().unwrap(), SaveRequest::Queued);
    assert_eq!(
        h.coordinator.session().unwrap().queued_save(),
        Some(SaveOrigin::Manual)
    );

    h.settle();

    let session = h.coordinator.session().unwrap();
    assert_eq!(session.state(), SessionState::Clean);
    assert_eq!(session.baseline(), "a=3");
    assert_eq!(session.artifact().version, 5);
    assert_eq!(h.gateway.write_calls(), 2);
}

#[test]
fn test_timer_elapsing_during_save_is_coalesced() {
    let mut h = Harness::new(store_with_app_js());

    h.coordinator.edit("a=2").unwrap();
    h.advance(3000);
    assert_eq!(h.state(), SessionState::Saving);

    h.coordinator.edit("a=3").unwrap();
    h.advance(3000);
    assert_eq!(
        h.coordinator.session().unwrap().queued_save(),
        Some(SaveOrigin::Auto)
    );
    assert_eq!(h.spawner.pending(), 1);

    h.settle();
    assert_eq!(h.coordinator.session().unwrap().baseline(), "a=3");
    assert_eq!(h.gateway.write_calls(), 2);
}

#[test]
fn test_failed_autosave_is_quiet_and_not_retried() {
    let mut h = Harness::new(store_with_app_js());
    h.gateway
        .fail_next_write(GatewayError::Unavailable("offline".to_string()));

    h.coordinator.edit("a=2").unwrap();
    h.advance(3000);
    h.settle();

    let session = h.coordinator.session().unwrap();
    assert_eq!(session.state(), SessionState::Dirty);
    assert_eq!(session.buffer(), "a=2");
    assert_eq!(session.baseline(), "a=1");
    assert_eq!(session.last_failure().unwrap().origin, SaveOrigin::Auto);
    assert_eq!(h.coordinator.next_deadline(), None);

    let events = h.take_events();
    assert!(events.contains(&SessionEvent::StateChanged {
        artifact_id: session.artifact().id.clone(),
        from: SessionState::Saving,
        to: SessionState::SaveFailed,
    }));

    h.advance(60_000);
    assert_eq!(h.gateway.write_calls(), 1);

    // The next edit starts a new cycle.
    h.coordinator.edit("a=2;").unwrap();
    h.advance(3000);
    h.settle();
    assert_eq!(h.state(), SessionState::Clean);
    assert_eq!(h.coordinator.session().unwrap().last_failure(), None);
}

#[test]
fn test_failed_manual_save_is_reported() {
    let mut h = Harness::new(store_with_app_js());
    h.gateway
        .fail_next_write(GatewayError::Storage("disk full".to_string()));

    h.coordinator.edit("a=2").unwrap();
    h.coordinator.save().unwrap();
    h.settle();

    let failure = h.coordinator.session().unwrap().last_failure().unwrap();
    assert!(failure.origin.surfaces_failure());
    assert_eq!(failure.error, GatewayError::Storage("disk full".to_string()));
    assert!(h.take_events().iter().any(|e| matches!(
        e,
        SessionEvent::SaveFailed {
            origin: SaveOrigin::Manual,
            ..
        }
    )));
    assert_eq!(h.state(), SessionState::Dirty);
}

#[test]
fn test_restore_loads_without_writing() {
    let mut h = Harness::new(store_with_app_js());

    h.coordinator.edit("a=2").unwrap();
    h.coordinator.save().unwrap();
    h.settle();

    assert_eq!(
        h.coordinator.restore(1),
        Err(CoordinatorError::HistoryNotLoaded)
    );
    h.coordinator.load_history().unwrap();
    h.settle();

    let versions: Vec<u64> = h
        .coordinator
        .session()
        .unwrap()
        .history()
        .unwrap()
        .iter()
        .map(|e| e.version)
        .collect();
    assert_eq!(versions, vec![3, 2, 1]);

    let writes_before = h.gateway.write_calls();
    h.coordinator.restore(3).unwrap();
    let session = h.coordinator.session().unwrap();
    assert_eq!(session.buffer(), "a=1");
    assert_eq!(session.state(), SessionState::Dirty);
    assert_eq!(h.coordinator.next_deadline(), None);

    h.advance(10_000);
    h.settle();
    assert_eq!(h.gateway.write_calls(), writes_before);
    assert_eq!(
        h.coordinator.restore(99),
        Err(CoordinatorError::UnknownVersion(99))
    );
}

#[test]
fn test_restore_of_baseline_content_is_clean() {
    let gateway = MemoryGateway::new();
    gateway
        .seed_at_version("x.json", ArtifactKind::Json, "{}", 2)
        .unwrap();
    let mut h = Harness::new(gateway);

    h.coordinator.load_history().unwrap();
    h.settle();
    h.coordinator.restore(1).unwrap();

    assert_eq!(h.state(), SessionState::Clean);
}

#[test]
fn test_pull_remote_loads_reference_into_buffer() {
    let gateway = store_with_app_js();
    gateway.insert_reference("site/app.js", "a=remote");
    let mut h = Harness::new(gateway);

    h.coordinator.pull_remote(None).unwrap();
    assert_eq!(
        h.coordinator.session().unwrap().pull_in_flight(),
        Some("site/app.js")
    );
    h.settle();

    let session = h.coordinator.session().unwrap();
    assert_eq!(session.buffer(), "a=remote");
    assert_eq!(session.state(), SessionState::Dirty);
    assert_eq!(session.pull_in_flight(), None);
    h.advance(10_000);
    assert_eq!(h.gateway.write_calls(), 0);
}

#[test]
fn test_pull_remote_failure_keeps_buffer() {
    let mut h = Harness::new(store_with_app_js());

    h.coordinator.edit("a=local").unwrap();
    h.coordinator.pull_remote(Some("missing/file.js")).unwrap();
    h.settle();

    assert_eq!(h.coordinator.session().unwrap().buffer(), "a=local");
    assert!(h.take_events().iter().any(|e| matches!(
        e,
        SessionEvent::RemoteFetchFailed { path, .. } if path == "missing/file.js"
    )));
    assert_eq!(h.gateway.fetch_calls(), 1);
}

#[test]
fn test_select_dirty_session_requires_confirmation() {
    let asked = Arc::new(Mutex::new(Vec::new()));
    let answers = asked.clone();
    let mut h = Harness::with_confirmation(store_with_two(), move |pending| {
        let mut asked = answers.lock().unwrap();
        asked.push(pending.clone());
        asked.len() > 1
    });
    let first = h.id("a/first.js");
    let second = h.id("b/second.css");

    h.coordinator.edit("let a = 2;").unwrap();
    assert_eq!(
        h.coordinator.select(&second).unwrap(),
        SelectOutcome::Declined
    );
    let session = h.coordinator.session().unwrap();
    assert_eq!(session.artifact().id, first);
    assert_eq!(session.buffer(), "let a = 2;");
    assert!(h.coordinator.next_deadline().is_some());

    assert_eq!(
        h.coordinator.select(&second).unwrap(),
        SelectOutcome::Selected
    );
    assert_eq!(h.coordinator.session().unwrap().artifact().id, second);
    assert_eq!(h.coordinator.next_deadline(), None);

    let asked = asked.lock().unwrap();
    assert_eq!(asked.len(), 2);
    assert_eq!(asked[0].artifact_id, first);
    assert!(asked[0].unsaved_buffer);

    h.advance(10_000);
    assert_eq!(h.gateway.write_calls(), 0);
}

#[test]
fn test_select_clean_session_needs_no_confirmation() {
    let mut h = Harness::new(store_with_two());
    let first = h.id("a/first.js");
    let second = h.id("b/second.css");

    assert_eq!(
        h.coordinator.select(&first).unwrap(),
        SelectOutcome::AlreadySelected
    );
    assert_eq!(
        h.coordinator.select(&second).unwrap(),
        SelectOutcome::Selected
    );
    assert_eq!(
        h.coordinator.select(&ArtifactId::new("art-99")),
        Err(CoordinatorError::UnknownArtifact(ArtifactId::new("art-99")))
    );
}

#[test]
fn test_stale_write_does_not_touch_new_session() {
    let mut h = Harness::with_confirmation(store_with_two(), |_: &PendingChanges| true);
    let first = h.id("a/first.js");
    let second = h.id("b/second.css");

    h.coordinator.edit("let a = 2;").unwrap();
    h.coordinator.save().unwrap();
    h.coordinator.select(&second).unwrap();
    h.settle();

    let session = h.coordinator.session().unwrap();
    assert_eq!(session.artifact().id, second);
    assert_eq!(session.state(), SessionState::Clean);
    assert_eq!(session.buffer(), "p {}");
    // The list still learns the new version of the first artifact.
    assert_eq!(h.coordinator.artifact(&first).unwrap().version, 2);
}

#[test]
fn test_artifact_vanishing_orphans_session() {
    let mut h = Harness::new(store_with_app_js());
    let id = h.id("site/app.js");

    h.coordinator.edit("a=2").unwrap();
    assert!(h.gateway.remove_externally(&id));
    h.coordinator.refresh();
    h.settle();

    let session = h.coordinator.session().unwrap();
    assert_eq!(session.state(), SessionState::Orphaned);
    assert_eq!(session.buffer(), "a=2");
    assert_eq!(h.coordinator.next_deadline(), None);
    assert_eq!(
        h.coordinator.save(),
        Err(CoordinatorError::Orphaned(id.clone()))
    );
    assert_eq!(
        h.coordinator.edit("a=3"),
        Err(CoordinatorError::Orphaned(id))
    );
    assert_eq!(h.gateway.write_calls(), 0);
}

#[test]
fn test_write_to_deleted_artifact_orphans_session() {
    let mut h = Harness::new(store_with_app_js());
    let id = h.id("site/app.js");

    h.coordinator.edit("a=2").unwrap();
    h.coordinator.save().unwrap();
    h.gateway.remove_externally(&id);
    h.settle();

    assert_eq!(h.state(), SessionState::Orphaned);
    assert!(h.coordinator.artifacts().is_empty());
}

#[test]
fn test_delete_selected_artifact() {
    let mut h = Harness::new(store_with_two());
    let first = h.id("a/first.js");

    h.coordinator.delete(&first).unwrap();
    h.settle();

    assert_eq!(h.state(), SessionState::Orphaned);
    assert_eq!(h.coordinator.artifacts().len(), 1);
    assert!(h.gateway.get(&first).is_none());
    let events = h.take_events();
    assert!(events.contains(&SessionEvent::Orphaned {
        artifact_id: first.clone(),
    }));
    assert!(events.contains(&SessionEvent::Deleted { artifact_id: first }));

    // Leaving an orphaned clean session needs no confirmation.
    let second = h.id("b/second.css");
    assert_eq!(
        h.coordinator.select(&second).unwrap(),
        SelectOutcome::Selected
    );
}

#[test]
fn test_create_opens_new_artifact() {
    let mut h = Harness::new(store_with_two());

    h.coordinator
        .create("c/new.html", "", ArtifactKind::Html, "<p></p>")
        .unwrap();
    h.settle();

    assert_eq!(h.coordinator.artifacts().len(), 3);
    let session = h.coordinator.session().unwrap();
    assert_eq!(session.artifact().path, "c/new.html");
    assert_eq!(session.artifact().name, "new.html");
    assert_eq!(session.artifact().version, 1);

    h.coordinator
        .create("c/new.html", "", ArtifactKind::Html, "")
        .unwrap();
    h.settle();
    assert!(h.take_events().iter().any(|e| matches!(
        e,
        SessionEvent::CreateFailed {
            error: GatewayError::PathExists(_),
            ..
        }
    )));
    assert_eq!(
        h.coordinator.create("  ", "", ArtifactKind::Text, ""),
        Err(CoordinatorError::EmptyPath)
    );
}

#[test]
fn test_create_keeps_dirty_session() {
    let mut h = Harness::new(store_with_two());

    h.coordinator.edit("let a = 3;").unwrap();
    h.coordinator
        .create("z.txt", "notes", ArtifactKind::Text, "")
        .unwrap();
    h.settle();

    let session = h.coordinator.session().unwrap();
    assert_eq!(session.artifact().path, "a/first.js");
    assert_eq!(session.buffer(), "let a = 3;");
    assert!(h.coordinator.find_by_path("z.txt").is_some());
}

#[test]
fn test_discard_returns_to_baseline() {
    let mut h = Harness::new(store_with_app_js());

    h.coordinator.edit("a=9").unwrap();
    h.coordinator.discard().unwrap();

    assert_eq!(h.state(), SessionState::Clean);
    assert_eq!(h.coordinator.session().unwrap().buffer(), "a=1");
    assert!(h.coordinator.is_idle());
}

#[test]
fn test_refresh_adopts_newer_content_for_clean_session() {
    let mut h = Harness::new(store_with_app_js());
    let id = h.id("site/app.js");

    use artifact_core::Gateway;
    h.gateway.write_artifact(&id, "a=other", "bob").unwrap();
    h.coordinator.refresh();
    h.settle();

    let session = h.coordinator.session().unwrap();
    assert_eq!(session.buffer(), "a=other");
    assert_eq!(session.baseline(), "a=other");
    assert_eq!(session.artifact().updated_by, "bob");
    assert_eq!(session.state(), SessionState::Clean);
}

#[test]
fn test_commands_without_session() {
    let mut h = Harness::new(MemoryGateway::new());

    assert!(h.coordinator.session().is_none());
    assert_eq!(h.coordinator.edit("x"), Err(CoordinatorError::NoSession));
    assert_eq!(h.coordinator.save(), Err(CoordinatorError::NoSession));
    assert_eq!(
        h.coordinator.load_history(),
        Err(CoordinatorError::NoSession)
    );
    assert_eq!(
        h.coordinator.pull_remote(None),
        Err(CoordinatorError::NoSession)
    );
}

#[test]
fn test_tree_groups_artifacts_by_folder() {
    let h = Harness::new(store_with_two());
    let tree = h.coordinator.tree();

    assert_eq!(tree.file_count(), 2);
    assert_eq!(tree.folder("a").unwrap().files()[0].name, "first.js");
    assert_eq!(tree.folder("b").unwrap().files()[0].name, "second.css");
}
