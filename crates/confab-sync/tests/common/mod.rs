//! Shared fakes for the conversation engine tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use confab_core::models::chat::{Chat, Message, Sender};
use confab_reply::error::ReplyError;
use confab_store::client::TouchAck;
use confab_store::error::StoreError;
use confab_sync::ports::{BoxFuture, ChatStore, ReplyService};

pub fn ts(ms: i64) -> jiff::Timestamp {
    jiff::Timestamp::from_millisecond(ms).expect("timestamp in range")
}

pub fn chat(id: &str, updated_ms: i64) -> Chat {
    Chat {
        id: id.to_string(),
        title: format!("Chat {id}"),
        owner_id: "user-1".to_string(),
        created_at: ts(0),
        updated_at: ts(updated_ms),
    }
}

pub fn message(id: &str, chat_id: &str, sender_type: Sender, content: &str, created_ms: i64) -> Message {
    Message {
        id: id.to_string(),
        chat_id: chat_id.to_string(),
        content: content.to_string(),
        sender_type,
        owner_id: "user-1".to_string(),
        created_at: ts(created_ms),
    }
}

/// Counts concurrent entries and remembers the high-water mark. The guard
/// decrements on drop, so aborted futures are counted out too.
#[derive(Default)]
pub struct Gauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl Gauge {
    pub fn enter(&self) -> GaugeGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        GaugeGuard { gauge: self }
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

pub struct GaugeGuard<'a> {
    gauge: &'a Gauge,
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory [`ChatStore`] with switchable failures and delays.
#[derive(Default)]
pub struct FakeChatStore {
    chats: Mutex<Vec<Chat>>,
    messages: Mutex<HashMap<String, Vec<Message>>>,
    next_id: AtomicUsize,
    list_calls: AtomicUsize,
    list_fails: AtomicBool,
    list_delay: Mutex<Option<Duration>>,
    list_gauge: Gauge,
    create_plan: Mutex<VecDeque<Option<StoreError>>>,
    touch_calls: AtomicUsize,
    touch_fails: AtomicBool,
}

impl FakeChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_chats(&self, chats: Vec<Chat>) {
        *self.chats.lock().unwrap() = chats;
    }

    pub fn seed_messages(&self, chat_id: &str, messages: Vec<Message>) {
        self.messages
            .lock()
            .unwrap()
            .insert(chat_id.to_string(), messages);
    }

    pub fn messages_for(&self, chat_id: &str) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap()
            .get(chat_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_lists(&self) -> usize {
        self.list_gauge.max()
    }

    pub fn touch_calls(&self) -> usize {
        self.touch_calls.load(Ordering::SeqCst)
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_list_fails(&self, fails: bool) {
        self.list_fails.store(fails, Ordering::SeqCst);
    }

    pub fn set_touch_fails(&self, fails: bool) {
        self.touch_fails.store(fails, Ordering::SeqCst);
    }

    /// Outcomes for upcoming `create_message` calls, consumed in order.
    /// `Some(err)` fails the call; `None` and anything past the end succeed.
    pub fn plan_create_results(&self, plan: Vec<Option<StoreError>>) {
        *self.create_plan.lock().unwrap() = plan.into();
    }
}

impl ChatStore for FakeChatStore {
    fn list_chats(&self) -> BoxFuture<'_, Result<Vec<Chat>, StoreError>> {
        Box::pin(async move { Ok(self.chats.lock().unwrap().clone()) })
    }

    fn create_chat(&self, title: &str) -> BoxFuture<'_, Result<Chat, StoreError>> {
        let title = title.to_string();
        Box::pin(async move {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            let chat = Chat {
                id: format!("c{n}"),
                title,
                owner_id: "user-1".to_string(),
                created_at: ts(9_000_000 + n as i64 * 1_000),
                updated_at: ts(9_000_000 + n as i64 * 1_000),
            };
            self.chats.lock().unwrap().insert(0, chat.clone());
            Ok(chat)
        })
    }

    fn list_messages(&self, chat_id: &str) -> BoxFuture<'_, Result<Vec<Message>, StoreError>> {
        let chat_id = chat_id.to_string();
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let _entry = self.list_gauge.enter();
            let delay = *self.list_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.list_fails.load(Ordering::SeqCst) {
                return Err(StoreError::Service("listing unavailable".to_string()));
            }
            Ok(self.messages_for(&chat_id))
        })
    }

    fn create_message(
        &self,
        chat_id: &str,
        content: &str,
        sender_type: Sender,
    ) -> BoxFuture<'_, Result<Message, StoreError>> {
        let chat_id = chat_id.to_string();
        let content = content.to_string();
        Box::pin(async move {
            if let Some(Some(err)) = self.create_plan.lock().unwrap().pop_front() {
                return Err(err);
            }
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            let message = Message {
                id: format!("m{n}"),
                chat_id: chat_id.clone(),
                content,
                sender_type,
                owner_id: "user-1".to_string(),
                created_at: ts(1_000_000 + n as i64 * 1_000),
            };
            self.messages
                .lock()
                .unwrap()
                .entry(chat_id)
                .or_default()
                .push(message.clone());
            Ok(message)
        })
    }

    fn touch_chat(&self, chat_id: &str) -> BoxFuture<'_, Result<TouchAck, StoreError>> {
        let chat_id = chat_id.to_string();
        Box::pin(async move {
            self.touch_calls.fetch_add(1, Ordering::SeqCst);
            if self.touch_fails.load(Ordering::SeqCst) {
                return Err(StoreError::Service("touch unavailable".to_string()));
            }
            Ok(TouchAck { id: chat_id })
        })
    }
}

#[derive(Clone)]
pub enum ReplyBehavior {
    Reply(String),
    ServiceError,
    Timeout,
    Malformed,
}

/// Scripted [`ReplyService`] that records what it was asked.
pub struct FakeReplyService {
    behavior: Mutex<ReplyBehavior>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<(String, String, String)>>,
}

impl FakeReplyService {
    pub fn replying(reply: &str) -> Self {
        Self::with(ReplyBehavior::Reply(reply.to_string()))
    }

    pub fn with(behavior: ReplyBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The `(chat_id, message, user_id)` of the latest request.
    pub fn last_request(&self) -> Option<(String, String, String)> {
        self.last_request.lock().unwrap().clone()
    }
}

impl ReplyService for FakeReplyService {
    fn request_reply(
        &self,
        chat_id: &str,
        message: &str,
        user_id: &str,
    ) -> BoxFuture<'_, Result<String, ReplyError>> {
        let chat_id = chat_id.to_string();
        let message = message.to_string();
        let user_id = user_id.to_string();
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some((chat_id, message, user_id));
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match self.behavior.lock().unwrap().clone() {
                ReplyBehavior::Reply(reply) => Ok(reply),
                ReplyBehavior::ServiceError => {
                    Err(ReplyError::Service("webhook returned HTTP 503".to_string()))
                }
                ReplyBehavior::Timeout => Err(ReplyError::Timeout),
                ReplyBehavior::Malformed => Err(ReplyError::MalformedResponse(
                    "no usable `response` field".to_string(),
                )),
            }
        })
    }
}
