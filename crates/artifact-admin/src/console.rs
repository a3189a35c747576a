//! Line-oriented console over a [`Coordinator`].
//!
//! The console turns parsed commands into coordinator calls and prints coordinator events as they
//! arrive. It never blocks on the store: commands return immediately and results show up on a
//! later [`Console::tick`].

use crate::command::{self, HELP, ParsedCommand};
use artifact_core::{
    ArtifactId, ArtifactKind, Coordinator, CoordinatorError, FolderNode, PendingChanges,
    SaveOrigin, SaveRequest, SelectOutcome, SessionEvent,
};
use std::fs;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

/// How often the host loop polls the coordinator while waiting for input.
pub const TICK: Duration = Duration::from_millis(50);

/// Whether the console keeps running after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command.
    Continue,
    /// Leave.
    Quit,
}

/// The admin console.
pub struct Console<W: Write> {
    coordinator: Coordinator,
    events: Receiver<SessionEvent>,
    force_discard: Arc<AtomicBool>,
    out: W,
}

impl<W: Write> Console<W> {
    /// Wrap `coordinator`, installing the console's discard confirmation and event feed.
    pub fn new(coordinator: Coordinator, out: W) -> Self {
        let force_discard = Arc::new(AtomicBool::new(false));
        let flag = force_discard.clone();
        let mut coordinator = coordinator
            .with_confirmation(move |_: &PendingChanges| flag.swap(false, Ordering::SeqCst));

        let (tx, events) = mpsc::channel();
        coordinator.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });

        Self {
            coordinator,
            events,
            force_discard,
            out,
        }
    }

    /// The hosted coordinator.
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Print the prompt.
    pub fn prompt(&mut self) -> io::Result<()> {
        match self.coordinator.session() {
            Some(session) => {
                let marker = if session.is_dirty() { "*" } else { "" };
                write!(
                    self.out,
                    "[{}{marker} {}]> ",
                    session.artifact().path,
                    session.state()
                )?;
            }
            None => write!(self.out, "> ")?,
        }
        self.out.flush()
    }

    /// Run one input line.
    pub fn execute(&mut self, line: &str) -> io::Result<Flow> {
        let flow = self.run(command::parse(line))?;
        self.report_events()?;
        Ok(flow)
    }

    /// Apply finished store calls and timers, then print what happened.
    pub fn tick(&mut self) -> io::Result<()> {
        self.coordinator.poll();
        self.report_events()
    }

    /// Tick until no store call is outstanding and no autosave is pending.
    pub fn drain(&mut self) -> io::Result<()> {
        loop {
            self.tick()?;
            if self.coordinator.is_idle() {
                return Ok(());
            }
            thread::sleep(TICK);
        }
    }

    fn run(&mut self, command: ParsedCommand) -> io::Result<Flow> {
        match command {
            ParsedCommand::Empty => {}
            ParsedCommand::Help => {
                for (usage, summary) in HELP {
                    writeln!(self.out, "  {usage:<20} {summary}")?;
                }
            }
            ParsedCommand::List => self.list()?,
            ParsedCommand::Open { path, force } => self.open(&path, force)?,
            ParsedCommand::Show => self.show()?,
            ParsedCommand::Set { text } => {
                let result = self.coordinator.edit(text);
                self.report(result)?;
            }
            ParsedCommand::Append { text } => {
                let Some(session) = self.coordinator.session() else {
                    self.fail(CoordinatorError::NoSession)?;
                    return Ok(Flow::Continue);
                };
                let mut buffer = session.buffer().to_string();
                if !buffer.is_empty() && !buffer.ends_with('\n') {
                    buffer.push('\n');
                }
                buffer.push_str(&text);
                let result = self.coordinator.edit(buffer);
                self.report(result)?;
            }
            ParsedCommand::Load { file } => match fs::read_to_string(&file) {
                Ok(text) => {
                    let result = self.coordinator.edit(text);
                    self.report(result)?;
                }
                Err(e) => writeln!(self.out, "cannot read {file}: {e}")?,
            },
            ParsedCommand::Save => match self.coordinator.save() {
                Ok(SaveRequest::Started) => writeln!(self.out, "saving...")?,
                Ok(SaveRequest::Queued) => {
                    writeln!(self.out, "a save is in flight; this one runs after it")?
                }
                Ok(SaveRequest::NothingToSave) => writeln!(self.out, "nothing to save")?,
                // Reported through the `Rejected` event.
                Ok(SaveRequest::Rejected(_)) => {}
                Err(e) => self.fail(e)?,
            },
            ParsedCommand::Discard => {
                let result = self.coordinator.discard();
                self.report(result)?;
            }
            ParsedCommand::Status => self.status()?,
            ParsedCommand::History => {
                let result = self.coordinator.load_history();
                self.report(result)?;
            }
            ParsedCommand::Restore { version } => {
                let result = self.coordinator.restore(version);
                self.report(result)?;
            }
            ParsedCommand::Pull { path } => {
                let result = self.coordinator.pull_remote(path.as_deref());
                self.report(result)?;
            }
            ParsedCommand::New { path, kind } => {
                let kind = kind.unwrap_or_else(|| ArtifactKind::from_path(&path));
                let result = self.coordinator.create(&path, "", kind, "");
                self.report(result)?;
            }
            ParsedCommand::Remove { path } => match self.id_for(&path) {
                Some(id) => {
                    let result = self.coordinator.delete(&id);
                    self.report(result)?;
                }
                None => writeln!(self.out, "no artifact at {path}")?,
            },
            ParsedCommand::Refresh => self.coordinator.refresh(),
            ParsedCommand::Quit { force } => {
                if !force && self.coordinator.has_pending_changes() {
                    writeln!(
                        self.out,
                        "unsaved changes; save or discard them, or use quit! to leave anyway"
                    )?;
                    return Ok(Flow::Continue);
                }
                return Ok(Flow::Quit);
            }
            ParsedCommand::Invalid { message } => writeln!(self.out, "{message}")?,
            ParsedCommand::Unknown { name } => {
                writeln!(self.out, "unknown command '{name}' (try help)")?
            }
        }
        Ok(Flow::Continue)
    }

    fn report(&mut self, result: Result<(), CoordinatorError>) -> io::Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: CoordinatorError) -> io::Result<()> {
        writeln!(self.out, "error: {error}")
    }

    fn id_for(&self, path: &str) -> Option<ArtifactId> {
        self.coordinator.find_by_path(path).map(|a| a.id.clone())
    }

    fn open(&mut self, path: &str, force: bool) -> io::Result<()> {
        let Some(id) = self.id_for(path) else {
            return writeln!(self.out, "no artifact at {path}");
        };
        self.force_discard.store(force, Ordering::SeqCst);
        let outcome = self.coordinator.select(&id);
        self.force_discard.store(false, Ordering::SeqCst);
        match outcome {
            Ok(SelectOutcome::Selected) => Ok(()),
            Ok(SelectOutcome::AlreadySelected) => writeln!(self.out, "already editing {path}"),
            Ok(SelectOutcome::Declined) => writeln!(
                self.out,
                "the current artifact has unsaved changes; use open! to discard them"
            ),
            Err(e) => self.fail(e),
        }
    }

    fn list(&mut self) -> io::Result<()> {
        if self.coordinator.artifacts().is_empty() {
            return writeln!(self.out, "no artifacts");
        }
        let tree = self.coordinator.tree();
        let selected = self.coordinator.session().map(|s| s.artifact().id.clone());
        let mut lines = Vec::new();
        render_folder(&self.coordinator, &tree, 0, selected.as_ref(), &mut lines);
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn show(&mut self) -> io::Result<()> {
        let Some(session) = self.coordinator.session() else {
            return writeln!(self.out, "no artifact selected");
        };
        let artifact = session.artifact();
        writeln!(
            self.out,
            "--- {} v{} ({}) ---",
            artifact.path,
            artifact.version,
            session.state()
        )?;
        let buffer = session.buffer();
        write!(self.out, "{buffer}")?;
        if !buffer.is_empty() && !buffer.ends_with('\n') {
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn status(&mut self) -> io::Result<()> {
        let Some(session) = self.coordinator.session() else {
            return writeln!(self.out, "no artifact selected");
        };
        let artifact = session.artifact();
        let mut lines = vec![
            format!("artifact: {} ({}, {})", artifact.path, artifact.id, artifact.kind),
            format!("version:  {} by {}", artifact.version, artifact.updated_by),
            format!(
                "state:    {}{}",
                session.state(),
                if session.is_dirty() { ", unsaved changes" } else { "" }
            ),
        ];
        if let Some(deadline) = session.autosave_deadline() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            lines.push(format!("autosave: in {} ms", remaining.as_millis()));
        }
        if let Some(content) = session.saving_content() {
            lines.push(format!("saving:   {} bytes in flight", content.len()));
        }
        if let Some(rejection) = session.rejection() {
            lines.push(format!("rejected: {rejection}"));
        }
        if let Some(failure) = session.last_failure() {
            lines.push(format!("last save failed: {}", failure.error));
        }
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn report_events(&mut self) -> io::Result<()> {
        while let Ok(event) = self.events.try_recv() {
            for line in self.describe(&event) {
                writeln!(self.out, "{line}")?;
            }
        }
        Ok(())
    }

    fn path_of(&self, id: &ArtifactId) -> String {
        if let Some(artifact) = self.coordinator.artifact(id) {
            return artifact.path.clone();
        }
        match self.coordinator.session() {
            Some(session) if &session.artifact().id == id => session.artifact().path.clone(),
            _ => id.to_string(),
        }
    }

    fn describe(&self, event: &SessionEvent) -> Vec<String> {
        let line = match event {
            SessionEvent::SessionOpened { artifact_id } => {
                format!("editing {}", self.path_of(artifact_id))
            }
            SessionEvent::SessionClosed { .. } | SessionEvent::StateChanged { .. } => {
                return Vec::new();
            }
            SessionEvent::Saved {
                artifact_id,
                origin,
                version,
            } => {
                let suffix = match origin {
                    SaveOrigin::Manual => "",
                    SaveOrigin::Auto => " (autosave)",
                };
                format!("saved {} v{version}{suffix}", self.path_of(artifact_id))
            }
            SessionEvent::SaveFailed { origin, error, .. } => match origin {
                SaveOrigin::Manual => format!("save failed: {error}"),
                SaveOrigin::Auto => {
                    format!("autosave failed: {error}; the next edit will try again")
                }
            },
            SessionEvent::Rejected {
                origin, rejection, ..
            } => match origin {
                SaveOrigin::Manual => format!("not saved: {rejection}"),
                SaveOrigin::Auto => format!("autosave skipped: {rejection}"),
            },
            SessionEvent::HistoryLoaded { artifact_id, .. } => {
                return self.describe_history(artifact_id);
            }
            SessionEvent::HistoryFailed { error, .. } => format!("history unavailable: {error}"),
            SessionEvent::Restored { version, .. } => {
                format!("restored v{version} into the buffer (not saved)")
            }
            SessionEvent::RemotePulled { path, .. } => {
                format!("pulled {path} into the buffer (not saved)")
            }
            SessionEvent::RemotePullSuperseded { path, .. } => {
                format!("pull of {path} ignored: the buffer was edited meanwhile")
            }
            SessionEvent::RemoteFetchFailed { path, error, .. } => {
                format!("pull of {path} failed: {error}")
            }
            SessionEvent::ArtifactsRefreshed { count } => format!("{count} artifact(s)"),
            SessionEvent::RefreshFailed { error } => format!("refresh failed: {error}"),
            SessionEvent::Orphaned { artifact_id } => format!(
                "{} no longer exists in the store; open another artifact",
                self.path_of(artifact_id)
            ),
            SessionEvent::Created { path, .. } => format!("created {path}"),
            SessionEvent::CreateFailed { path, error } => {
                format!("cannot create {path}: {error}")
            }
            SessionEvent::Deleted { artifact_id } => {
                format!("deleted {}", self.path_of(artifact_id))
            }
            SessionEvent::DeleteFailed { artifact_id, error } => {
                format!("cannot delete {}: {error}", self.path_of(artifact_id))
            }
        };
        vec![line]
    }

    fn describe_history(&self, artifact_id: &ArtifactId) -> Vec<String> {
        let path = self.path_of(artifact_id);
        let Some(entries) = self.coordinator.session().and_then(|s| s.history()) else {
            return Vec::new();
        };
        if entries.is_empty() {
            return vec![format!("no previous versions of {path}")];
        }
        let mut lines = vec![format!("previous versions of {path}:")];
        for entry in entries {
            let preview = entry.content.lines().next().unwrap_or("");
            let preview: String = preview.chars().take(40).collect();
            lines.push(format!(
                "  v{:<4} {:<12} {}",
                entry.version, entry.created_by, preview
            ));
        }
        lines
    }
}

fn render_folder(
    coordinator: &Coordinator,
    folder: &FolderNode<ArtifactId>,
    depth: usize,
    selected: Option<&ArtifactId>,
    lines: &mut Vec<String>,
) {
    let indent = "  ".repeat(depth);
    for child in folder.folders() {
        lines.push(format!("{indent}{}/", child.name()));
        render_folder(coordinator, child, depth + 1, selected, lines);
    }
    for file in folder.files() {
        let marker = if Some(&file.item) == selected { "*" } else { " " };
        match coordinator.artifact(&file.item) {
            Some(artifact) => lines.push(format!(
                "{indent}{marker} {}  v{} [{}]",
                file.name, artifact.version, artifact.kind
            )),
            None => lines.push(format!("{indent}{marker} {}", file.name)),
        }
    }
}
