// * Priority message queue between the console reader and the command consumer
// * Commands are FIFO; a poison pill jumps the queue and is never consumed

use crate::command::{Command, Message};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct QueueState {
    commands: VecDeque<Command>,
    // * Some(save_jobs) once shutdown has been requested
    poison_pill: Option<bool>,
}

/// Multi-producer, multi-consumer queue with a sticky shutdown sentinel
#[derive(Debug, Default)]
pub struct MessageQueue {
    state: Mutex<QueueState>,
    available: Notify,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a message without blocking
    ///
    /// Returns `false` when a command arrives after a poison pill; such
    /// commands would never be delivered. A second poison pill is accepted
    /// but the first one's `save_jobs` flag is kept.
    pub fn emit(&self, message: Message) -> bool {
        let mut state = self.lock();
        match message {
            Message::PoisonPill { save_jobs } => {
                if state.poison_pill.is_none() {
                    state.poison_pill = Some(save_jobs);
                }
            }
            Message::Command(command) => {
                if state.poison_pill.is_some() {
                    tracing::warn!(command = %command, "Queue is closed, dropping command");
                    return false;
                }
                state.commands.push_back(command);
            }
        }
        drop(state);

        self.available.notify_one();
        true
    }

    /// Waits for the next message
    ///
    /// Once a poison pill has been emitted every call returns it, so each
    /// consumer sharing the queue observes the shutdown.
    pub async fn take(&self) -> Message {
        loop {
            if let Some(message) = self.try_take() {
                if message.is_poison_pill() {
                    // * Pass the wakeup on to the next waiting consumer
                    self.available.notify_one();
                }
                return message;
            }
            self.available.notified().await;
        }
    }

    /// Non-blocking variant of [`take`](Self::take)
    pub fn try_take(&self) -> Option<Message> {
        let mut state = self.lock();
        if let Some(save_jobs) = state.poison_pill {
            return Some(Message::PoisonPill { save_jobs });
        }
        state.commands.pop_front().map(Message::Command)
    }

    /// Number of commands still waiting
    pub fn len(&self) -> usize {
        self.lock().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once a poison pill has been emitted
    pub fn is_closed(&self) -> bool {
        self.lock().poison_pill.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        // * State stays consistent even if a holder panicked; keep serving
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
