//! Dashboard service loop
//!
//! Runs the core on one task, interleaving presentation commands with
//! the core's own events (timer fires, save completions, feed pushes).
//! This is the single cooperative event loop: no state is touched from
//! anywhere else.

use crate::core::{DashboardConfig, DashboardCore, StateSnapshot};
use crate::event::CoreEvent;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use weekdeck_core::{NoteKey, Owner, TaskId, TaskStatus, WeekNumber};
use weekdeck_gateway::DataGateway;

/// Commands the presentation layer sends the service
#[derive(Debug)]
pub enum DashboardCommand {
    /// Switch the selected week
    SelectWeek(WeekNumber),
    /// Record a draft edit
    EditNote {
        /// Key being edited
        key: NoteKey,
        /// New draft text
        text: String,
    },
    /// Save a draft now, bypassing the debounce
    SaveNote(NoteKey),
    /// Insert a new task into the selected week
    AddTask {
        /// Owning co-owner
        owner: Owner,
        /// Free-text description
        description: String,
    },
    /// Update one task's status
    SetTaskStatus {
        /// Task to update
        id: TaskId,
        /// New status
        status: TaskStatus,
    },
    /// Flip a task's completion checkbox
    ToggleCompletion(TaskId),
    /// Read a snapshot of every cache
    Snapshot(oneshot::Sender<StateSnapshot>),
}

/// The service stopped and can take no more commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("dashboard service is no longer running")]
pub struct ServiceClosed;

/// Handle for talking to a running [`DashboardService`]
#[derive(Debug, Clone)]
pub struct DashboardHandle {
    commands: mpsc::Sender<DashboardCommand>,
}

impl DashboardHandle {
    /// Switch the selected week
    pub async fn select_week(&self, week: WeekNumber) -> Result<(), ServiceClosed> {
        self.send(DashboardCommand::SelectWeek(week)).await
    }

    /// Record a draft edit
    pub async fn edit_note(
        &self,
        key: NoteKey,
        text: impl Into<String>,
    ) -> Result<(), ServiceClosed> {
        self.send(DashboardCommand::EditNote {
            key,
            text: text.into(),
        })
        .await
    }

    /// Save a draft now, bypassing the debounce
    pub async fn save_note(&self, key: NoteKey) -> Result<(), ServiceClosed> {
        self.send(DashboardCommand::SaveNote(key)).await
    }

    /// Insert a new task into the selected week
    pub async fn add_task(
        &self,
        owner: Owner,
        description: impl Into<String>,
    ) -> Result<(), ServiceClosed> {
        self.send(DashboardCommand::AddTask {
            owner,
            description: description.into(),
        })
        .await
    }

    /// Update one task's status
    pub async fn set_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<(), ServiceClosed> {
        self.send(DashboardCommand::SetTaskStatus { id, status }).await
    }

    /// Flip a task's completion checkbox
    pub async fn toggle_completion(&self, id: TaskId) -> Result<(), ServiceClosed> {
        self.send(DashboardCommand::ToggleCompletion(id)).await
    }

    /// Read a snapshot of every cache
    pub async fn snapshot(&self) -> Result<StateSnapshot, ServiceClosed> {
        let (reply, response) = oneshot::channel();
        self.send(DashboardCommand::Snapshot(reply)).await?;
        response.await.map_err(|_| ServiceClosed)
    }

    async fn send(&self, command: DashboardCommand) -> Result<(), ServiceClosed> {
        self.commands.send(command).await.map_err(|_| ServiceClosed)
    }
}

/// The dashboard event loop
pub struct DashboardService<G> {
    core: DashboardCore<G>,
    events: mpsc::UnboundedReceiver<CoreEvent>,
    commands: mpsc::Receiver<DashboardCommand>,
}

impl<G: DataGateway> DashboardService<G> {
    /// Build a service and the handle for driving it
    #[must_use]
    pub fn new(gateway: Arc<G>, config: DashboardConfig) -> (Self, DashboardHandle) {
        let (commands_tx, commands) = mpsc::channel(config.command_buffer);
        let (core, events) = DashboardCore::new(gateway, &config);
        (
            Self {
                core,
                events,
                commands,
            },
            DashboardHandle {
                commands: commands_tx,
            },
        )
    }

    /// Spawn the service onto the runtime
    ///
    /// The loop stops, tearing down feeds and timers, once every
    /// handle clone is dropped.
    pub fn spawn(gateway: Arc<G>, config: DashboardConfig) -> (DashboardHandle, JoinHandle<()>) {
        let (service, handle) = Self::new(gateway, config);
        (handle, tokio::spawn(service.run()))
    }

    /// Run the event loop to completion
    pub async fn run(mut self) {
        self.core.initialize().await;
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    // Every handle dropped: stop. Dropping the core
                    // drops subscriptions and aborts pending timers.
                    None => break,
                },
                event = self.events.recv() => match event {
                    Some(event) => self.core.handle_event(event).await,
                    // Unreachable while the core holds its sender.
                    None => break,
                },
            }
        }
        tracing::info!("dashboard service stopped");
    }

    async fn handle_command(&mut self, command: DashboardCommand) {
        match command {
            DashboardCommand::SelectWeek(week) => self.core.select_week(week).await,
            DashboardCommand::EditNote { key, text } => self.core.edit_note(key, text),
            DashboardCommand::SaveNote(key) => self.core.save_note(key),
            DashboardCommand::AddTask { owner, description } => {
                self.core.add_task(owner, &description).await;
            }
            DashboardCommand::SetTaskStatus { id, status } => {
                self.core.set_task_status(id, status).await;
            }
            DashboardCommand::ToggleCompletion(id) => self.core.toggle_completion(id).await,
            DashboardCommand::Snapshot(reply) => {
                let _ = reply.send(self.core.snapshot());
            }
        }
    }
}

impl<G> std::fmt::Debug for DashboardService<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardService").finish_non_exhaustive()
    }
}
