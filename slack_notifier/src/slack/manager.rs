//! Slack messaging coordination and management.
//!
//! This module provides a manager that coordinates Slack messaging operations
//! by routing action requests from `SlackClient`s to a single worker. The
//! manager also owns locally delayed actions: each is a timer task that hands
//! its action to the worker when it fires, unless it is cancelled first.

use std::collections::HashMap;

use crate::error::{Error, NotifierResult};
use error_stack::report;
use tokio::{
    sync::mpsc::{self, Receiver, Sender},
    task::JoinHandle,
    time::sleep,
};

use super::{
    actions::{DelayId, SlackAction},
    constants::MANAGER_QUEUE_CAPACITY,
    notifier::SlackNotifier,
    worker::SlackWorker,
};

/// Manager for coordinating Slack messaging operations.
///
/// `SlackManager` is responsible for:
/// 1. Receiving action requests from application code
/// 2. Holding delayed actions until they are due, or dropping them on cancel
/// 3. Forwarding due actions to a rate-limited worker
/// 4. Managing the lifecycle of the worker
#[derive(Debug)]
pub struct SlackManager {
    notifier: SlackNotifier,
    /// Channel receiver for incoming action requests from external code
    input_channel: Receiver<SlackAction>,
}

impl SlackManager {
    pub fn new(notifier: SlackNotifier, input_channel: Receiver<SlackAction>) -> Self {
        SlackManager {
            notifier,
            input_channel,
        }
    }

    /// Creates a manager together with the sender its clients share.
    pub fn channel(notifier: SlackNotifier) -> (Self, Sender<SlackAction>) {
        let (sender, receiver) = mpsc::channel(MANAGER_QUEUE_CAPACITY);
        (Self::new(notifier, receiver), sender)
    }

    fn arm_delay(
        worker_sender: &Sender<SlackAction>,
        id: DelayId,
        delay: std::time::Duration,
        action: SlackAction,
    ) -> JoinHandle<()> {
        let sender = worker_sender.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            tracing::debug!(%id, "Delayed Slack action is due");
            if let Err(e) = sender.send(action).await {
                tracing::error!(%id, "Failed to hand delayed action to worker: {e}");
            }
        })
    }

    /// Starts the manager's main processing loop.
    ///
    /// This method:
    /// 1. Creates an internal worker to handle Slack API calls
    /// 2. Forwards incoming actions to the worker, arming timers for delayed ones
    /// 3. Runs until every sender of the input channel is dropped
    /// 4. Lets pending delays fire and the worker drain before returning
    pub async fn run(mut self) -> NotifierResult<()> {
        // Create channel for internal communication with worker
        let (worker_sender, worker_receiver) = mpsc::channel(MANAGER_QUEUE_CAPACITY);
        let worker = SlackWorker::new(self.notifier.clone(), worker_receiver);

        // Spawn the worker in a separate task
        let worker_handle = tokio::spawn(worker.run());

        let mut delayed: HashMap<DelayId, JoinHandle<()>> = HashMap::new();

        while let Some(action) = self.input_channel.recv().await {
            delayed.retain(|_, handle| !handle.is_finished());

            match action {
                SlackAction::Delayed { id, delay, action } => {
                    if matches!(
                        *action,
                        SlackAction::Delayed { .. } | SlackAction::CancelDelayed { .. }
                    ) {
                        tracing::error!(%id, "Nested delay actions are not supported, dropping");
                        continue;
                    }
                    tracing::info!(%id, delay_ms = delay.as_millis() as u64, "Delaying Slack action");
                    let handle = Self::arm_delay(&worker_sender, id, delay, *action);
                    delayed.insert(id, handle);
                }
                SlackAction::CancelDelayed { id } => match delayed.remove(&id) {
                    Some(handle) if !handle.is_finished() => {
                        handle.abort();
                        tracing::info!(%id, "Delayed Slack action cancelled");
                    }
                    _ => {
                        tracing::warn!(%id, "Nothing to cancel, action unknown or already sent");
                    }
                },
                action => {
                    // Send message to internal channel
                    if let Err(e) = worker_sender.send(action).await {
                        tracing::error!("Failed to send action to internal channel: {e}");
                    }
                }
            }
        }

        // Input channel is closed: let pending delays fire, then drain the worker
        for (id, handle) in delayed {
            if let Err(e) = handle.await {
                tracing::error!(%id, "Delayed Slack action task failed: {e}");
            }
        }
        drop(worker_sender);
        let _ = worker_handle.await;

        Err(report!(Error::ModuleStopped("SlackManager".to_string())))
    }
}
