//! Debugger session state machine.
//!
//! A session owns one [`JdwpClient`] and runs a single event loop task
//! that is the sole writer of session state. Callers interact through
//! intents (resume, step over, stop) and observe the session through a
//! stream of [`SessionEvent`]s; neither path touches the state
//! directly, so there is no lock around it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::client::JdwpClient;
use crate::error::DebugError;
use crate::wire::event_kind;
use crate::wire::step;
use crate::wire::suspend_policy;
use crate::wire::EventBatch;
use crate::wire::Location;
use crate::wire::Modifier;
use crate::wire::VmEvent;

/// How to reach the debuggee and what to install once attached.
#[derive(Debug, Clone)]
pub struct AttachConfig {
    pub host: String,
    pub port: u16,
    /// Fully qualified main class name, dot-separated.
    pub main_class: String,
    /// 1-based source lines to break on.
    pub breakpoint_lines: Vec<u32>,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Attaching,
    Running,
    Paused,
}

/// Caller requests into the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugIntent {
    Resume,
    StepOver,
    Stop,
}

/// What the session reports back to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Attached,
    Paused { thread: u64, line: Option<u32> },
    Resumed,
    Disconnected,
}

/// Bytecode-index-to-line tables for the main class, keyed by method.
#[derive(Debug, Default)]
pub(crate) struct LineMap {
    methods: HashMap<(u64, u64), Vec<(u64, u32)>>,
}

impl LineMap {
    pub(crate) fn insert(&mut self, class_id: u64, method_id: u64, mut table: Vec<(u64, u32)>) {
        table.sort_by_key(|&(index, _)| index);
        self.methods.insert((class_id, method_id), table);
    }

    /// Source line for a location: the entry with the largest bytecode
    /// index not past the location's.
    pub(crate) fn line_at(&self, location: Location) -> Option<u32> {
        let table = self.methods.get(&(location.class_id, location.method_id))?;
        table
            .iter()
            .take_while(|&&(index, _)| index <= location.index)
            .last()
            .map(|&(_, line)| line)
    }

    /// First executable location on a source line, if any.
    pub(crate) fn location_of_line(&self, line: u32) -> Option<Location> {
        for (&(class_id, method_id), table) in &self.methods {
            for &(index, table_line) in table {
                if table_line == line {
                    return Some(Location {
                        type_tag: 1,
                        class_id,
                        method_id,
                        index,
                    });
                }
            }
        }
        None
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// What a composite event batch means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BatchOutcome {
    Pause,
    Continue,
    Disconnect,
}

/// VM death wins over everything else in the batch; any breakpoint or
/// step hit pauses; everything else lets execution continue.
pub(crate) fn batch_outcome(batch: &EventBatch) -> BatchOutcome {
    let mut outcome = BatchOutcome::Continue;
    for event in &batch.events {
        match event {
            VmEvent::VmDeath { .. } => return BatchOutcome::Disconnect,
            VmEvent::Breakpoint { .. } | VmEvent::Step { .. } => outcome = BatchOutcome::Pause,
            _ => {}
        }
    }
    outcome
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IntentAction {
    Ignore,
    Resume,
    Step,
    Terminate,
}

/// Resume and step only act while paused; stop acts from any state.
pub(crate) fn intent_action(state: SessionState, intent: DebugIntent) -> IntentAction {
    match intent {
        DebugIntent::Stop => IntentAction::Terminate,
        DebugIntent::Resume if state == SessionState::Paused => IntentAction::Resume,
        DebugIntent::StepOver if state == SessionState::Paused => IntentAction::Step,
        DebugIntent::Resume | DebugIntent::StepOver => IntentAction::Ignore,
    }
}

/// Handle to a live session. Dropping it stops the event loop once its
/// intent channel drains.
pub struct DebuggerSession {
    intents: mpsc::UnboundedSender<DebugIntent>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl DebuggerSession {
    /// Connect to the debuggee, install breakpoints, and start it.
    ///
    /// Connection-refused failures are retried up to the configured
    /// limit, since the debuggee may not have opened its listener yet.
    /// If the main class is not loaded yet, breakpoint installation is
    /// deferred until its class-prepare event.
    pub async fn attach(config: AttachConfig) -> Result<Self, DebugError> {
        let (client, batches) = connect_with_retry(&config).await?;
        let client = Arc::new(client);

        client.fetch_id_sizes().await?;

        let signature = format!("L{};", config.main_class.replace('.', "/"));
        let classes = client.classes_by_name(&signature).await?;

        let mut lines = LineMap::default();
        let mut deferred = Vec::new();
        if let Some(&class_id) = classes.first() {
            lines = build_line_map(&client, class_id).await?;
            install_breakpoints(&client, &lines, &config.breakpoint_lines).await?;
        } else {
            // Main class not loaded yet; watch for it and install then.
            client
                .set_event_request(
                    event_kind::CLASS_PREPARE,
                    suspend_policy::ALL,
                    &[
                        Modifier::ClassMatch(config.main_class.clone()),
                        Modifier::Count(1),
                    ],
                )
                .await?;
            deferred = config.breakpoint_lines.clone();
        }

        // The VM launched suspended; everything is armed, let it run.
        client.resume().await?;

        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let _ = event_tx.send(SessionEvent::Attached);

        tokio::spawn(run_event_loop(
            client, batches, intent_rx, lines, deferred, event_tx,
        ));

        Ok(Self {
            intents: intent_tx,
            events: event_rx,
        })
    }

    pub fn resume(&self) {
        let _ = self.intents.send(DebugIntent::Resume);
    }

    pub fn step_over(&self) {
        let _ = self.intents.send(DebugIntent::StepOver);
    }

    /// Idempotent; safe to call after the session already ended.
    pub fn stop(&self) {
        let _ = self.intents.send(DebugIntent::Stop);
    }

    /// Next session event, or `None` once the session has ended.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }
}

async fn connect_with_retry(
    config: &AttachConfig,
) -> Result<(JdwpClient, mpsc::UnboundedReceiver<EventBatch>), DebugError> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match JdwpClient::connect(&config.host, config.port).await {
            Ok(connected) => return Ok(connected),
            Err(error) if error.is_connection_refused() && attempts <= config.max_retries => {
                tracing::debug!(attempts, "debuggee not listening yet, retrying");
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(error) if error.is_connection_refused() => {
                return Err(DebugError::AttachFailed { attempts });
            }
            Err(error) => return Err(error),
        }
    }
}

async fn build_line_map(client: &JdwpClient, class_id: u64) -> Result<LineMap, DebugError> {
    let mut lines = LineMap::default();
    for method in client.methods(class_id).await? {
        match client.line_table(class_id, method.id).await {
            Ok(table) => lines.insert(class_id, method.id, table),
            // Abstract and native methods have no line table.
            Err(DebugError::Command(_)) => {}
            Err(error) => return Err(error),
        }
    }
    Ok(lines)
}

async fn install_breakpoints(
    client: &JdwpClient,
    lines: &LineMap,
    requested: &[u32],
) -> Result<(), DebugError> {
    for &line in requested {
        match lines.location_of_line(line) {
            Some(location) => {
                client.set_breakpoint(location).await?;
                tracing::debug!(line, "breakpoint installed");
            }
            None => {
                // Not an executable line; nothing to anchor to.
                tracing::trace!(line, "no code at breakpoint line, skipping");
            }
        }
    }
    Ok(())
}

async fn run_event_loop(
    client: Arc<JdwpClient>,
    mut batches: mpsc::UnboundedReceiver<EventBatch>,
    mut intents: mpsc::UnboundedReceiver<DebugIntent>,
    mut lines: LineMap,
    mut deferred: Vec<u32>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let mut state = SessionState::Running;
    let mut current_thread = 0u64;
    let mut pending_step: Option<u32> = None;

    loop {
        tokio::select! {
            batch = batches.recv() => {
                let Some(batch) = batch else {
                    let _ = events.send(SessionEvent::Disconnected);
                    return;
                };
                match batch_outcome(&batch) {
                    BatchOutcome::Disconnect => {
                        let _ = events.send(SessionEvent::Disconnected);
                        return;
                    }
                    BatchOutcome::Pause => {
                        let (thread, line) =
                            pause_point(&batch, &lines, &client, &mut pending_step).await;
                        state = SessionState::Paused;
                        current_thread = thread;
                        let _ = events.send(SessionEvent::Paused { thread, line });
                    }
                    BatchOutcome::Continue => {
                        handle_prepare(&batch, &client, &mut lines, &mut deferred).await;
                        if batch.suspend_policy != suspend_policy::NONE
                            && client.resume().await.is_err()
                        {
                            let _ = events.send(SessionEvent::Disconnected);
                            return;
                        }
                    }
                }
            }
            intent = intents.recv() => {
                let Some(intent) = intent else { return };
                match intent_action(state, intent) {
                    IntentAction::Ignore => {}
                    IntentAction::Resume => {
                        if client.resume().await.is_err() {
                            let _ = events.send(SessionEvent::Disconnected);
                            return;
                        }
                        state = SessionState::Running;
                        let _ = events.send(SessionEvent::Resumed);
                    }
                    IntentAction::Step => {
                        match request_step(&client, current_thread, &mut pending_step).await {
                            Ok(()) => {
                                state = SessionState::Running;
                                let _ = events.send(SessionEvent::Resumed);
                            }
                            Err(_) => {
                                let _ = events.send(SessionEvent::Disconnected);
                                return;
                            }
                        }
                    }
                    IntentAction::Terminate => {
                        let _ = client.dispose().await;
                        let _ = events.send(SessionEvent::Disconnected);
                        return;
                    }
                }
            }
        }
    }
}

/// Thread and source line of the event that caused a pause. A step
/// event's one-shot request is cleared so a later breakpoint hit does
/// not race a stale step.
async fn pause_point(
    batch: &EventBatch,
    lines: &LineMap,
    client: &JdwpClient,
    pending_step: &mut Option<u32>,
) -> (u64, Option<u32>) {
    let mut paused_thread = 0;
    let mut paused_line = None;
    for event in &batch.events {
        match *event {
            VmEvent::Breakpoint {
                thread, location, ..
            } => {
                paused_thread = thread;
                paused_line = lines.line_at(location);
            }
            VmEvent::Step {
                request_id,
                thread,
                location,
            } => {
                paused_thread = thread;
                paused_line = lines.line_at(location);
                if pending_step.take() == Some(request_id) {
                    let _ = client
                        .clear_event_request(event_kind::SINGLE_STEP, request_id)
                        .await;
                }
            }
            _ => {}
        }
    }
    (paused_thread, paused_line)
}

/// Install deferred breakpoints once the main class is prepared.
async fn handle_prepare(
    batch: &EventBatch,
    client: &JdwpClient,
    lines: &mut LineMap,
    deferred: &mut Vec<u32>,
) {
    for event in &batch.events {
        let VmEvent::ClassPrepare { type_id, .. } = *event else {
            continue;
        };
        if deferred.is_empty() {
            continue;
        }
        match build_line_map(client, type_id).await {
            Ok(map) if !map.is_empty() => {
                let requested = std::mem::take(deferred);
                if let Err(error) = install_breakpoints(client, &map, &requested).await {
                    tracing::warn!(%error, "deferred breakpoint install failed");
                }
                *lines = map;
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(%error, "could not read line tables after class prepare");
            }
        }
    }
}

/// Replace any stale step request with a fresh one-shot line step over
/// the current frame, then resume.
async fn request_step(
    client: &JdwpClient,
    thread: u64,
    pending_step: &mut Option<u32>,
) -> Result<(), DebugError> {
    if let Some(stale) = pending_step.take() {
        let _ = client
            .clear_event_request(event_kind::SINGLE_STEP, stale)
            .await;
    }
    let request_id = client
        .set_event_request(
            event_kind::SINGLE_STEP,
            suspend_policy::ALL,
            &[
                Modifier::Step {
                    thread,
                    size: step::SIZE_LINE,
                    depth: step::DEPTH_OVER,
                },
                Modifier::Count(1),
            ],
        )
        .await?;
    *pending_step = Some(request_id);
    client.resume().await
}
