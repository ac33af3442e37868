// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon engine loop.
//!
//! One task owns the scheduler and every per-target controller. It
//! multiplexes notifier batches, settle/retry timers, build completions,
//! hook completions, listener commands, and the heartbeat tick. Builds run
//! as spawned tasks around child processes; their completions come back
//! through an internal channel. Errors inside the loop are logged and
//! never escape to the daemon top level.

use polter_adapters::{AlertAdapter, Notifier, WatchBatch, WatchError, WatchExpression};
use polter_core::{BuildRecord, BuildStatus, Target};
use polter_engine::{
    hooks::HookContext, relaunch, scheduler::QueueSnapshot, BuildOptions, BuildOutcome,
    BuildRequest, Builder, HookRunner, ManualOutcome, Scheduler,
};
use polter_engine::controller::RETRY_BASE_DELAY;
use polter_engine::priority::ChangeType;
use polter_engine::relaunch::Relauncher;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, error, info, warn};

use crate::env;
use crate::lifecycle::DaemonState;

/// Capacity of the internal channels; backpressure beyond this is fine.
const CHANNEL_CAPACITY: usize = 256;

/// How often running builds are checked against their soft deadline.
const OVERDUE_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Cap on the notifier reconnect backoff.
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Command posted into the engine loop by the listener.
#[derive(Debug)]
pub enum DaemonCommand {
    Build {
        target: String,
        force: bool,
        reply: oneshot::Sender<ManualOutcome>,
    },
    Queue {
        reply: oneshot::Sender<QueueSnapshot>,
    },
    Shutdown,
}

/// Internal completions flowing back into the loop.
enum EngineEvent {
    BuildDone {
        target: String,
        outcome: BuildOutcome,
    },
    HooksDone {
        target: String,
    },
}

/// The engine loop and everything it owns.
pub struct DaemonRuntime<N: Notifier, A: AlertAdapter> {
    state: DaemonState,
    notifier: N,
    alerts: A,
    alerts_enabled: bool,
    scheduler: Scheduler,
    hook_runner: HookRunner,
    relauncher: Relauncher,
    targets: HashMap<String, Target>,
    /// Per-target compiled expressions, for change classification.
    expressions: HashMap<String, WatchExpression>,
    /// Subscription name → targets fed by it.
    subscription_targets: HashMap<String, Vec<String>>,
    /// Subscription name + expression, kept for re-subscribing after a
    /// notifier reconnect.
    subscriptions: Vec<(String, WatchExpression)>,
    cancel_tokens: HashMap<String, Arc<Notify>>,
    /// `None` while the notifier connection is down and a reconnect is
    /// pending.
    watch_rx: Option<mpsc::Receiver<WatchBatch>>,
    engine_tx: mpsc::Sender<EngineEvent>,
    engine_rx: mpsc::Receiver<EngineEvent>,
    command_rx: mpsc::Receiver<DaemonCommand>,
    reconnect_at: Option<Instant>,
    reconnect_attempt: u32,
    /// Last terminal status per target, for recovery alerts.
    last_outcome: HashMap<String, BuildStatus>,
}

impl<N: Notifier, A: AlertAdapter> DaemonRuntime<N, A> {
    /// Wire the notifier and build the scheduler.
    ///
    /// Notifier failure here is fatal: a daemon that cannot watch files
    /// has nothing to do.
    pub async fn new(
        state: DaemonState,
        notifier: N,
        alerts: A,
        command_rx: mpsc::Receiver<DaemonCommand>,
    ) -> Result<Self, WatchError> {
        notifier.connect().await?;
        notifier.watch_project(&state.project_root).await?;

        let (watch_tx, watch_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (engine_tx, engine_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let mut scheduler = Scheduler::new(
            state.config.parallelization(),
            state.config.build_timeout_multiplier(),
        );

        let mut targets = HashMap::new();
        let mut expressions = HashMap::new();
        // One subscription per unique watch expression; fan-out is ours
        let mut by_expression: HashMap<String, (WatchExpression, Vec<String>)> = HashMap::new();

        for target in &state.targets {
            let expression =
                WatchExpression::compile(&state.project_root, &target.watch_paths)?;
            by_expression
                .entry(expression.share_key())
                .or_insert_with(|| (expression.clone(), Vec::new()))
                .1
                .push(target.name.clone());
            expressions.insert(target.name.clone(), expression);
            scheduler.add_target(target.clone());
            targets.insert(target.name.clone(), target.clone());
        }

        let mut subscription_targets = HashMap::new();
        let mut subscriptions = Vec::new();
        for (index, (_, (expression, fed))) in by_expression.into_iter().enumerate() {
            let name = format!("watch-{index}");
            notifier
                .subscribe(&name, expression.clone(), watch_tx.clone())
                .await?;
            subscription_targets.insert(name.clone(), fed);
            subscriptions.push((name, expression));
        }

        let alerts_enabled = state.config.notifications_enabled();
        Ok(Self {
            state,
            notifier,
            alerts,
            alerts_enabled,
            scheduler,
            hook_runner: HookRunner::new(),
            relauncher: Relauncher::new(),
            targets,
            expressions,
            subscription_targets,
            subscriptions,
            cancel_tokens: HashMap::new(),
            watch_rx: Some(watch_rx),
            engine_tx,
            engine_rx,
            command_rx,
            reconnect_at: None,
            reconnect_attempt: 0,
            last_outcome: HashMap::new(),
        })
    }

    /// Run until a shutdown command or signal; returns the daemon state so
    /// the caller can release it.
    pub async fn run(mut self, shutdown: Arc<Notify>) -> DaemonState {
        let mut heartbeat = tokio::time::interval(env::heartbeat_interval());
        let mut overdue_check = tokio::time::interval(OVERDUE_CHECK_INTERVAL);

        loop {
            let deadline = self.scheduler.next_deadline();
            let reconnect_at = self.reconnect_at;

            tokio::select! {
                batch = recv_watch(&mut self.watch_rx) => {
                    match batch {
                        Some(batch) => self.on_watch_batch(batch),
                        None => self.on_notifier_lost(),
                    }
                }

                event = self.engine_rx.recv() => {
                    if let Some(event) = event {
                        self.on_engine_event(event);
                    }
                }

                command = self.command_rx.recv() => {
                    match command {
                        Some(DaemonCommand::Build { target, force, reply }) => {
                            let outcome = self.scheduler.request_manual(&target);
                            debug!(target = %target, force, ?outcome, "manual build request");
                            let _ = reply.send(outcome);
                        }
                        Some(DaemonCommand::Queue { reply }) => {
                            let _ = reply.send(self.scheduler.snapshot(Instant::now()));
                        }
                        Some(DaemonCommand::Shutdown) => {
                            info!("shutdown requested via command");
                            break;
                        }
                        None => break,
                    }
                }

                _ = shutdown.notified() => {
                    info!("shutdown signal received");
                    break;
                }

                _ = heartbeat.tick() => {
                    self.heartbeat();
                }

                _ = overdue_check.tick() => {
                    for (target, elapsed) in self.scheduler.overdue(Instant::now()) {
                        warn!(
                            target = %target,
                            elapsed_secs = elapsed.as_secs(),
                            "build exceeded its soft timeout; letting it finish"
                        );
                    }
                }

                _ = sleep_until_opt(deadline) => {
                    self.scheduler.on_tick(Instant::now());
                }

                _ = sleep_until_opt(reconnect_at) => {
                    self.try_reconnect().await;
                }
            }

            self.dispatch_ready();
        }

        self.shutdown().await
    }

    /// The watch channel closed: every sender died with the notifier
    /// session. Past startup this is recoverable — schedule a reconnect
    /// with backoff instead of tearing the daemon down.
    fn on_notifier_lost(&mut self) {
        self.watch_rx = None;
        self.reconnect_attempt = 0;
        let delay = reconnect_delay(self.reconnect_attempt);
        self.reconnect_at = Some(Instant::now() + delay);
        error!(
            delay_ms = delay.as_millis() as u64,
            "notifier connection lost; reconnecting with backoff"
        );
    }

    /// One reconnect attempt: fresh channel, fresh session, re-watch the
    /// project, re-register every subscription. Failure re-arms the timer
    /// with the next backoff step.
    async fn try_reconnect(&mut self) {
        self.reconnect_at = None;
        let (watch_tx, watch_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let result: Result<(), WatchError> = async {
            // Drop whatever is left of the dead session first
            let _ = self.notifier.disconnect().await;
            self.notifier.connect().await?;
            self.notifier.watch_project(&self.state.project_root).await?;
            for (name, expression) in &self.subscriptions {
                self.notifier
                    .subscribe(name, expression.clone(), watch_tx.clone())
                    .await?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(
                    attempts = self.reconnect_attempt + 1,
                    "notifier reconnected, watching resumed"
                );
                self.watch_rx = Some(watch_rx);
                self.reconnect_attempt = 0;
            }
            Err(e) => {
                self.reconnect_attempt = self.reconnect_attempt.saturating_add(1);
                let delay = reconnect_delay(self.reconnect_attempt);
                self.reconnect_at = Some(Instant::now() + delay);
                warn!(
                    error = %e,
                    attempt = self.reconnect_attempt,
                    delay_ms = delay.as_millis() as u64,
                    "notifier reconnect failed; backing off"
                );
            }
        }
    }

    /// Fan a notifier batch out to the targets fed by its subscription.
    fn on_watch_batch(&mut self, batch: WatchBatch) {
        if env::debug_input() {
            info!(
                subscription = %batch.subscription,
                events = batch.events.len(),
                "file-event batch received"
            );
        }
        let Some(fed) = self.subscription_targets.get(&batch.subscription).cloned() else {
            debug!(subscription = %batch.subscription, "batch for unknown subscription");
            return;
        };

        // Deletions don't trigger builds; a deleted file that is half of
        // a rename shows up again as a create event
        let files: Vec<PathBuf> = batch
            .events
            .iter()
            .filter(|e| e.exists)
            .map(|e| e.path.clone())
            .collect();
        if files.is_empty() {
            return;
        }

        let now = Instant::now();
        for file in files {
            let change_type = self.classify(&file);
            for target in &fed {
                self.scheduler
                    .on_changes(target, vec![file.clone()], change_type, now);
            }
        }
    }

    /// Direct when exactly one target watches the path, shared when
    /// several do, generated when the path is a declared build output.
    fn classify(&self, path: &std::path::Path) -> ChangeType {
        let is_output = self.targets.values().any(|t| {
            t.output_path
                .as_ref()
                .map(|out| self.state.project_root.join(out).as_path() == path)
                .unwrap_or(false)
        });
        if is_output {
            return ChangeType::Generated;
        }
        let affected = self
            .expressions
            .values()
            .filter(|e| e.matches(path))
            .count();
        if affected > 1 {
            ChangeType::Shared
        } else {
            ChangeType::Direct
        }
    }

    /// Start every build the scheduler hands out.
    fn dispatch_ready(&mut self) {
        let requests = self.scheduler.dispatch(Instant::now());
        for request in requests {
            self.start_build(request);
        }
    }

    fn start_build(&mut self, request: BuildRequest) {
        let Some(target) = self.targets.get(&request.target).cloned() else {
            self.scheduler.drop_running(&request.target);
            return;
        };

        // Ownership check: a different live daemon may have claimed the
        // record since startup (ALREADY_OWNED); drop the request if so
        if let Some(current) = self.state.store.read(&request.target) {
            let owner = &current.process;
            if owner.pid != std::process::id() && self.state.store.owner_is_live(owner) {
                warn!(
                    target = %request.target,
                    owner_pid = owner.pid,
                    "state record owned by another live daemon, dropping build"
                );
                self.scheduler.drop_running(&request.target);
                return;
            }
        }

        let building = BuildRecord {
            status: BuildStatus::Building,
            timestamp: epoch_ms(),
            builder: Some(target.kind.builder_tag().to_string()),
            ..Default::default()
        };
        if let Err(e) = self.state.store.update_build_status(&request.target, building) {
            warn!(target = %request.target, error = %e, "failed to mark building");
        }

        let cancel = Arc::new(Notify::new());
        self.cancel_tokens
            .insert(request.target.clone(), Arc::clone(&cancel));

        info!(
            target = %request.target,
            files = request.files.len(),
            attempt = request.attempt,
            score = request.score,
            id = %request.id,
            "build dispatched"
        );

        let builder = Builder::new(target, &self.state.project_root);
        let log_file = self.state.paths.project.target_log_file(&request.target);
        let tx = self.engine_tx.clone();
        tokio::spawn(async move {
            let options = BuildOptions {
                log_file: Some(log_file),
                passthrough: false,
                env: Vec::new(),
                cancel: Some(cancel),
            };
            let outcome = builder.run(&request.files, &options).await;
            let _ = tx
                .send(EngineEvent::BuildDone {
                    target: request.target,
                    outcome,
                })
                .await;
        });
    }

    fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::BuildDone { target, outcome } => self.on_build_done(&target, outcome),
            EngineEvent::HooksDone { target } => {
                if self.scheduler.on_hooks_finished(&target) {
                    debug!(target = %target, "deferred follow-up released by hook completion");
                }
            }
        }
    }

    fn on_build_done(&mut self, target_name: &str, outcome: BuildOutcome) {
        self.cancel_tokens.remove(target_name);

        let status = outcome.record.status;
        let duration = Duration::from_millis(outcome.record.duration_ms.unwrap_or(0));

        if let Err(e) = self
            .state
            .store
            .update_build_status(target_name, outcome.record.clone())
        {
            warn!(target = target_name, error = %e, "failed to record build result");
        }
        if let Some(ref context) = outcome.error_context {
            if let Err(e) = self.state.store.update_build_error(target_name, context.clone()) {
                warn!(target = target_name, error = %e, "failed to record error context");
            }
        }

        let Some(target) = self.targets.get(target_name).cloned() else {
            return;
        };
        let succeeded = status == BuildStatus::Success;
        let matching_hooks: Vec<_> = target
            .hooks()
            .iter()
            .filter(|h| h.run_on.matches(succeeded))
            .cloned()
            .collect();
        let hooks_pending = !matching_hooks.is_empty();

        let disposition = self.scheduler.on_build_finished(
            target_name,
            status,
            duration,
            hooks_pending,
            Instant::now(),
        );
        info!(
            target = target_name,
            status = %status,
            duration_ms = duration.as_millis() as u64,
            ?disposition,
            "build finished"
        );

        self.send_alerts(target_name, &outcome);
        self.last_outcome.insert(target_name.to_string(), status);

        if succeeded {
            if let (polter_core::TargetKind::AppBundle, Some(bundle_id)) =
                (target.kind, target.bundle_id.clone())
            {
                if self.relauncher.admit(&bundle_id, Instant::now()) {
                    tokio::spawn(async move {
                        relaunch::quit_and_launch(&bundle_id).await;
                    });
                }
            }
        }

        if hooks_pending {
            let runner = self.hook_runner.clone();
            let store = Arc::clone(&self.state.store);
            let tx = self.engine_tx.clone();
            let context = HookContext {
                target: target_name.to_string(),
                project_root: self.state.project_root.clone(),
                build_succeeded: succeeded,
                exit_code: outcome.record.exit_code,
                stderr_tail: outcome
                    .error_context
                    .as_ref()
                    .map(|c| c.stderr_tail.join("\n"))
                    .unwrap_or_default(),
                env: target
                    .environment
                    .clone()
                    .map(|env| env.into_iter().collect())
                    .unwrap_or_default(),
            };
            let name = target_name.to_string();
            tokio::spawn(async move {
                let results = runner.run_matching(&matching_hooks, &context).await;
                for result in results {
                    if let Err(e) = store.update_post_build_result(&context.target, result) {
                        warn!(target = %context.target, error = %e, "failed to record hook result");
                    }
                }
                let _ = tx.send(EngineEvent::HooksDone { target: name }).await;
            });
        }
    }

    fn send_alerts(&self, target: &str, outcome: &BuildOutcome) {
        if !self.alerts_enabled {
            return;
        }
        let previous = self.last_outcome.get(target).copied();
        let alerts = self.alerts.clone();
        let target = target.to_string();

        match outcome.record.status {
            BuildStatus::Failure => {
                let body = outcome
                    .record
                    .error_summary
                    .clone()
                    .unwrap_or_else(|| "build failed".to_string());
                tokio::spawn(async move {
                    let _ = alerts.alert(&format!("{target} failed"), &body).await;
                });
            }
            BuildStatus::Success if previous == Some(BuildStatus::Failure) => {
                tokio::spawn(async move {
                    let _ = alerts.alert(&format!("{target} recovered"), "build is green again").await;
                });
            }
            _ => {}
        }
    }

    fn heartbeat(&self) {
        for name in self.targets.keys() {
            if let Err(e) = self.state.store.heartbeat(name) {
                warn!(target = %name, error = %e, "heartbeat write failed");
            }
        }
    }

    /// Orderly teardown: cancel timers and pending work, stop running
    /// builds, drain their results, unsubscribe, disconnect.
    async fn shutdown(mut self) -> DaemonState {
        info!("engine loop shutting down");

        let running = self.scheduler.cancel_all();
        for target in &running {
            if let Some(cancel) = self.cancel_tokens.get(target) {
                cancel.notify_one();
            }
        }

        // Drain in-flight completions so final states land on disk
        let grace = env::shutdown_grace();
        let deadline = tokio::time::Instant::now() + grace;
        let mut remaining = running.len();
        while remaining > 0 {
            match tokio::time::timeout_at(deadline, self.engine_rx.recv()).await {
                Ok(Some(EngineEvent::BuildDone { target, outcome })) => {
                    if let Err(e) = self.state.store.update_build_status(&target, outcome.record) {
                        warn!(target = %target, error = %e, "failed to record final build state");
                    }
                    remaining -= 1;
                }
                Ok(Some(EngineEvent::HooksDone { .. })) => {}
                Ok(None) => break,
                Err(_) => {
                    warn!(remaining, "builds still terminating at shutdown deadline");
                    break;
                }
            }
        }

        for name in self.subscription_targets.keys() {
            let _ = self.notifier.unsubscribe(name).await;
        }
        if let Err(e) = self.notifier.disconnect().await {
            warn!(error = %e, "notifier disconnect failed");
        }

        self.state
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}

/// Receive from the watch channel, or park forever while disconnected.
async fn recv_watch(rx: &mut Option<mpsc::Receiver<WatchBatch>>) -> Option<WatchBatch> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Backoff for notifier reconnects: the build-retry base delay doubled
/// per attempt, capped at [`RECONNECT_MAX_DELAY`].
fn reconnect_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY
        .mul_f64(2.0_f64.powi(attempt.min(16) as i32))
        .min(RECONNECT_MAX_DELAY)
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
