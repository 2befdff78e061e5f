//! Periodic message polling for the active chat.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::ports::ChatStore;
use crate::state::SharedConversationState;

/// How often the active chat is polled for new messages.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Polls the active chat on a fixed cadence.
///
/// One poll task exists at a time; starting a new one replaces the old.
/// Ticks never overlap: a fetch that outlives the interval delays the next
/// tick, and missed ticks are skipped rather than queued.
pub struct PollScheduler {
    store: Arc<dyn ChatStore>,
    state: SharedConversationState,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollScheduler {
    pub fn new(
        store: Arc<dyn ChatStore>,
        state: SharedConversationState,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            state,
            interval,
            task: Mutex::new(None),
        }
    }

    /// Start polling `chat_id`, replacing any earlier poll task. Results
    /// apply only while `generation` is still the cache's current one.
    pub fn start(&self, chat_id: &str, generation: u64) {
        self.cancel();

        let store = Arc::clone(&self.store);
        let state = self.state.clone();
        let interval = self.interval;
        let chat_id = chat_id.to_string();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; the caller has already done
            // its initial fetch, so consume it.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if state.poll_generation().await != generation {
                    break;
                }
                match store.list_messages(&chat_id).await {
                    Ok(messages) => {
                        if !state.apply_poll(generation, &chat_id, messages).await {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(chat_id = %chat_id, error = %e, "poll failed; retrying next tick");
                    }
                }
            }
        });

        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Stop polling. The task is aborted synchronously; a fetch already in
    /// flight is discarded later by its stale generation tag.
    pub fn cancel(&self) {
        if let Some(handle) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
