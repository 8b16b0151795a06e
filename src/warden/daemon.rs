//! Warden daemon implementation
//!
//! Long-running reconciler for one guild. Runs as a tokio event loop fed by
//! the platform binding's triggers, the daily schedule and operator commands.

use super::schedule::DailySchedule;
use crate::config::{validate_config_result, WardenConfig};
use crate::dispatch::{Dispatcher, Trigger, TriggerKind};
use crate::metrics;
use crate::platform::{GuildId, Platform};
use crate::reconcile::ReconciliationEngine;
use crate::report::{ReportSink, RunSummary, TracingSink};
use crate::{Result, WardenError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

/// Default number of dispatches running at once
pub const DEFAULT_MAX_INFLIGHT_DISPATCHES: usize = 16;

/// Default event channel capacity (1000 events)
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Warden daemon settings
#[derive(Debug, Clone)]
pub struct WardenSettings {
    /// The managed guild; triggers for other guilds are ignored
    pub guild: GuildId,

    /// When full applies run
    pub schedule: DailySchedule,

    /// Run a full apply as soon as the loop starts
    pub reconcile_on_startup: bool,

    /// Dispatches running at once
    pub max_inflight_dispatches: usize,

    /// Capacity of the trigger bus and of the event broadcast channel
    pub event_channel_capacity: usize,
}

impl WardenSettings {
    pub fn new(guild: GuildId) -> Self {
        Self {
            guild,
            schedule: DailySchedule::default(),
            reconcile_on_startup: true,
            max_inflight_dispatches: DEFAULT_MAX_INFLIGHT_DISPATCHES,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    /// Derive settings from a loaded configuration
    pub fn from_config(config: &WardenConfig) -> Result<Self> {
        Ok(Self {
            guild: config.guild(),
            schedule: config.schedule()?,
            reconcile_on_startup: config.schedule.reconcile_on_startup,
            max_inflight_dispatches: config.runtime.max_inflight_dispatches,
            event_channel_capacity: config.runtime.event_channel_capacity,
        })
    }

    pub fn with_schedule(mut self, schedule: DailySchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_reconcile_on_startup(mut self, enabled: bool) -> Self {
        self.reconcile_on_startup = enabled;
        self
    }

    pub fn with_max_inflight_dispatches(mut self, max: usize) -> Self {
        self.max_inflight_dispatches = max;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }
}

/// Events emitted by the Warden daemon
#[derive(Debug, Clone)]
pub enum WardenEvent {
    /// Daemon started
    Started,

    /// Daemon stopped
    Stopped,

    /// A dispatch finished
    RunCompleted(RunSummary),

    /// A trigger concerned nothing managed here
    Ignored {
        trigger: TriggerKind,
    },

    /// Error occurred
    Error {
        message: String,
    },
}

/// Commands that can be sent to the Warden daemon
#[derive(Debug, Clone)]
pub enum WardenCommand {
    /// Run a full apply immediately
    ReconcileNow,

    /// Stop the daemon after in-flight dispatches finish
    Shutdown,
}

/// Result of handling a command
enum CommandResult {
    Continue,
    Stop,
}

/// Warden daemon
pub struct Warden<P: Platform + ?Sized + 'static> {
    settings: WardenSettings,

    dispatcher: Dispatcher<P>,

    /// Bounds concurrent dispatches
    permits: Arc<Semaphore>,

    event_tx: broadcast::Sender<WardenEvent>,

    trigger_tx: mpsc::Sender<Trigger>,
    trigger_rx: Option<mpsc::Receiver<Trigger>>,

    command_tx: mpsc::Sender<WardenCommand>,
    command_rx: Option<mpsc::Receiver<WardenCommand>>,

    running: bool,
}

impl<P: Platform + ?Sized + 'static> Warden<P> {
    /// Create a daemon around an existing dispatcher
    pub fn new(settings: WardenSettings, dispatcher: Dispatcher<P>) -> Self {
        let capacity = settings.event_channel_capacity.max(1);
        let (event_tx, _) = broadcast::channel(capacity);
        let (trigger_tx, trigger_rx) = mpsc::channel(capacity);
        let (command_tx, command_rx) = mpsc::channel(10);
        let permits = Arc::new(Semaphore::new(settings.max_inflight_dispatches.max(1)));

        Self {
            settings,
            dispatcher,
            permits,
            event_tx,
            trigger_tx,
            trigger_rx: Some(trigger_rx),
            command_tx,
            command_rx: Some(command_rx),
            running: false,
        }
    }

    /// Validate `config` and wire the whole reconciler onto `platform`
    ///
    /// # Errors
    /// Any validation failure, an unparseable schedule or overlapping channel
    /// lists. Nothing has touched the platform at that point.
    pub fn from_config(config: &WardenConfig, platform: Arc<P>) -> Result<Self> {
        validate_config_result(config)?;

        let policy = Arc::new(config.build_registry()?);
        let engine = ReconciliationEngine::new(platform)
            .with_max_concurrent_writes(config.runtime.max_concurrent_writes);
        let dispatcher = Dispatcher::new(engine, policy).with_sink(Arc::new(TracingSink));

        tracing::info!(
            guild = config.guild_id,
            managed = dispatcher.policy().len(),
            "Warden configured"
        );

        Ok(Self::new(WardenSettings::from_config(config)?, dispatcher))
    }

    /// Add a report sink
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.dispatcher = self.dispatcher.with_sink(sink);
        self
    }

    pub fn settings(&self) -> &WardenSettings {
        &self.settings
    }

    pub fn dispatcher(&self) -> &Dispatcher<P> {
        &self.dispatcher
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Get an event subscriber
    pub fn subscribe(&self) -> broadcast::Receiver<WardenEvent> {
        self.event_tx.subscribe()
    }

    /// Get a sender for platform triggers
    pub fn trigger_sender(&self) -> mpsc::Sender<Trigger> {
        self.trigger_tx.clone()
    }

    /// Get a command sender
    pub fn command_sender(&self) -> mpsc::Sender<WardenCommand> {
        self.command_tx.clone()
    }

    /// Run the event loop until a shutdown command or SIGTERM/SIGINT
    ///
    /// A trigger is only taken off the bus once a dispatch permit is free, so
    /// a full bus pushes back on the platform binding. Dispatches already
    /// started are allowed to finish before this returns; triggers still
    /// queued on the bus are dropped.
    pub async fn run(&mut self) -> Result<()> {
        let mut trigger_rx = self
            .trigger_rx
            .take()
            .ok_or_else(|| WardenError::Config("Daemon already running".to_string()))?;
        let mut command_rx = self
            .command_rx
            .take()
            .ok_or_else(|| WardenError::Config("Daemon already running".to_string()))?;

        self.running = true;
        metrics::set_health_status(true);
        emit(&self.event_tx, WardenEvent::Started);
        tracing::info!(guild = %self.settings.guild, "Warden started");

        let mut tasks = JoinSet::new();

        if self.settings.reconcile_on_startup {
            self.spawn_dispatch(
                &mut tasks,
                Trigger::Startup {
                    guild: self.settings.guild,
                },
                None,
            );
        }

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        let mut next_tick = self.settings.schedule.next_after(Utc::now());

        loop {
            let sleep = tokio::time::sleep(time_until(next_tick));

            tokio::select! {
                // Re-evaluated after every completed dispatch.
                Some(trigger) = trigger_rx.recv(), if self.permits.available_permits() > 0 => {
                    self.handle_trigger(&mut tasks, trigger);
                }
                Some(cmd) = command_rx.recv() => {
                    match self.handle_command(&mut tasks, cmd) {
                        CommandResult::Continue => {}
                        CommandResult::Stop => break,
                    }
                }
                _ = sleep, if next_tick.is_some() => {
                    if let Some(fired) = next_tick {
                        tracing::info!(at = %fired, "Scheduled reconciliation");
                        next_tick = self.settings.schedule.following(fired, Utc::now());
                    }
                    let tick = Trigger::ScheduledTick {
                        guild: self.settings.guild,
                    };
                    self.spawn_dispatch(&mut tasks, tick, None);
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    self.reap(joined);
                }
                _ = &mut shutdown => {
                    tracing::info!("Received shutdown signal, initiating graceful shutdown");
                    break;
                }
            }
        }

        self.running = false;

        if !tasks.is_empty() {
            tracing::info!(in_flight = tasks.len(), "Waiting for in-flight dispatches");
        }
        while let Some(joined) = tasks.join_next().await {
            self.reap(joined);
        }

        metrics::set_health_status(false);
        metrics::set_inflight_dispatches(0);
        emit(&self.event_tx, WardenEvent::Stopped);
        tracing::info!(guild = %self.settings.guild, "Warden shutdown complete");
        Ok(())
    }

    fn handle_trigger(&self, tasks: &mut JoinSet<()>, trigger: Trigger) {
        if trigger.guild() != self.settings.guild {
            tracing::debug!(
                trigger = %trigger.kind(),
                guild = %trigger.guild(),
                "Ignoring trigger for unmanaged guild"
            );
            emit(
                &self.event_tx,
                WardenEvent::Ignored {
                    trigger: trigger.kind(),
                },
            );
            return;
        }
        let permit = self.permits.clone().try_acquire_owned().ok();
        self.spawn_dispatch(tasks, trigger, permit);
    }

    fn handle_command(&self, tasks: &mut JoinSet<()>, cmd: WardenCommand) -> CommandResult {
        match cmd {
            WardenCommand::ReconcileNow => {
                self.spawn_dispatch(
                    tasks,
                    Trigger::Manual {
                        guild: self.settings.guild,
                    },
                    None,
                );
                CommandResult::Continue
            }
            WardenCommand::Shutdown => {
                tracing::info!("Received shutdown command");
                CommandResult::Stop
            }
        }
    }

    /// Spawn one dispatch; without a `permit` the task waits for one itself
    fn spawn_dispatch(
        &self,
        tasks: &mut JoinSet<()>,
        trigger: Trigger,
        permit: Option<OwnedSemaphorePermit>,
    ) {
        let dispatcher = self.dispatcher.clone();
        let permits = self.permits.clone();
        let events = self.event_tx.clone();
        let max_inflight = self.settings.max_inflight_dispatches.max(1);

        tasks.spawn(async move {
            let kind = trigger.kind();
            let _permit = match permit {
                Some(permit) => permit,
                None => match permits.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };
            metrics::set_inflight_dispatches(max_inflight - permits.available_permits());

            match dispatcher.dispatch(trigger).await {
                Some(summary) => emit(&events, WardenEvent::RunCompleted(summary)),
                None => emit(&events, WardenEvent::Ignored { trigger: kind }),
            }

            metrics::set_inflight_dispatches(
                (max_inflight - permits.available_permits()).saturating_sub(1),
            );
        });
    }

    fn reap(&self, joined: std::result::Result<(), tokio::task::JoinError>) {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Dispatch task failed");
            emit(
                &self.event_tx,
                WardenEvent::Error {
                    message: format!("Dispatch task failed: {}", e),
                },
            );
        }
    }
}

/// Send an event, logging when nobody listens
fn emit(tx: &broadcast::Sender<WardenEvent>, event: WardenEvent) {
    if tx.send(event).is_err() {
        tracing::trace!("Event sent but no receivers subscribed");
    }
}

fn time_until(next: Option<DateTime<Utc>>) -> Duration {
    next.and_then(|at| (at - Utc::now()).to_std().ok())
        .unwrap_or(Duration::ZERO)
}

/// Resolves on SIGTERM or SIGINT
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Failed to set up signal handlers");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
        _ = sigint.recv() => tracing::info!("Received SIGINT"),
    }
}

/// Resolves on Ctrl-C
#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
