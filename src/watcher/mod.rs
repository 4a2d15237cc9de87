//! Live-chat watch loop.
//!
//! Owns one cancellable background task per session: resolve the
//! active chat id, fetch a page with the stored cursor, mirror each
//! new message into the display log, and auto-reply in the configured
//! persona voice when the gate allows it. A failed cycle reports a
//! System record and backs off; the loop itself never dies on a
//! single failure.

mod greeting;
mod reply_gate;


pub use greeting::GreetingStateMachine;
pub use reply_gate::ReplyGate;

use hibiki_core::{
    chatlog::ChatLog,
    config::WatchConfig,
    error::HibikiError,
    message::{ChatMessage, DisplayRecord},
    persona::{Character, Persona},
    prompt::{build_reply_prompt, truncate_chars},
    traits::{ChatTransport, Generator},
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The watcher: composes the transport, generator, reply gate,
/// greeting machine, and display log behind one start/stop lifecycle.
/// At most one background loop runs per watcher.
pub struct LiveChatWatcher {
    transport: Arc<dyn ChatTransport>,
    generator: Option<Arc<dyn Generator>>,
    persona: Persona,
    character: Character,
    /// The bot's own author identity, to suppress self-replies.
    /// Empty when unknown.
    self_id: String,
    options: WatchConfig,
    log: Arc<ChatLog>,
    running: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    /// Chat id of the current connected session, for manual sends and
    /// the stop-triggered farewell.
    current_chat_id: Arc<Mutex<Option<String>>>,
    greeter: Arc<Mutex<GreetingStateMachine>>,
    cancelled: Arc<AtomicBool>,
    cancel_notify: Arc<Notify>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl LiveChatWatcher {
    /// Create a watcher. Fails fast when the configuration cannot
    /// work: auto-reply enabled with no generator handle.
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        generator: Option<Arc<dyn Generator>>,
        persona: Persona,
        character: Character,
        self_id: String,
        options: WatchConfig,
    ) -> Result<Self, HibikiError> {
        if options.auto_reply && generator.is_none() {
            return Err(HibikiError::Config(
                "auto-reply is enabled but no generator is configured".into(),
            ));
        }

        let greeter = GreetingStateMachine::new(
            character.greetings.start.clone(),
            character.greetings.end.clone(),
        );

        Ok(Self {
            transport,
            generator,
            persona,
            character,
            self_id,
            log: Arc::new(ChatLog::new(options.log_retention)),
            options,
            running: Arc::new(AtomicBool::new(false)),
            connected: Arc::new(AtomicBool::new(false)),
            current_chat_id: Arc::new(Mutex::new(None)),
            greeter: Arc::new(Mutex::new(greeter)),
            cancelled: Arc::new(AtomicBool::new(false)),
            cancel_notify: Arc::new(Notify::new()),
            handle: Mutex::new(None),
        })
    }

    /// Spawn the watch loop. Returns immediately; refuses to run a
    /// second loop while one is active (including one abandoned by a
    /// timed-out `stop`).
    pub fn start(&self) -> Result<(), HibikiError> {
        let mut handle = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(h) = handle.as_ref() {
            if !h.is_finished() {
                return Err(HibikiError::Watcher("watcher is already running".into()));
            }
        }

        self.cancelled.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        *self.greeter.lock().unwrap_or_else(|e| e.into_inner()) = GreetingStateMachine::new(
            self.character.greetings.start.clone(),
            self.character.greetings.end.clone(),
        );

        let task = WatchTask {
            transport: self.transport.clone(),
            generator: self.generator.clone(),
            persona: self.persona.clone(),
            character: self.character.clone(),
            self_id: self.self_id.clone(),
            options: self.options.clone(),
            log: self.log.clone(),
            running: self.running.clone(),
            connected: self.connected.clone(),
            current_chat_id: self.current_chat_id.clone(),
            greeter: self.greeter.clone(),
            cancelled: self.cancelled.clone(),
            cancel_notify: self.cancel_notify.clone(),
            gate: ReplyGate::new(Duration::from_secs(self.options.cooldown_secs)),
            cursor: None,
            seen: HashSet::new(),
            arrival: 0,
            last_chat_id: None,
        };

        info!(
            "watcher starting | persona: {} / {} | auto_reply: {}",
            self.persona.name, self.character.name, self.options.auto_reply
        );
        *handle = Some(tokio::spawn(task.run()));
        Ok(())
    }

    /// Signal cancellation and wait (bounded) for the loop to exit.
    /// When `send_farewell` is set and a session is connected, sends
    /// the end greeting — unless the loop already sent it on a
    /// disconnect edge; the two paths share one latch.
    pub async fn stop(&self, send_farewell: bool) {
        self.cancelled.store(true, Ordering::SeqCst);
        // notify_one stores a permit, so a loop that has not reached
        // its select yet still wakes instead of sleeping out a full
        // backoff.
        self.cancel_notify.notify_one();

        let taken = self
            .handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(mut h) = taken {
            let deadline = Duration::from_secs(self.options.stop_timeout_secs);
            tokio::select! {
                _ = &mut h => {}
                _ = tokio::time::sleep(deadline) => {
                    warn!(
                        "watch loop did not exit within {}s, abandoning it",
                        self.options.stop_timeout_secs
                    );
                    // Keep the handle so a later start() can see the
                    // old loop is still alive and refuse to run.
                    *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(h);
                }
            }
        }

        if send_farewell {
            let farewell = self
                .greeter
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take_farewell();
            if let Some(text) = farewell {
                let chat_id = self
                    .current_chat_id
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone();
                if let Some(id) = chat_id {
                    let ok = match self.transport.send_message(&id, &text).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("farewell send failed: {e}");
                            false
                        }
                    };
                    self.log.append(DisplayRecord::bot(text, ok));
                }
            }
        }

        info!("watcher stopped");
    }

    /// Post a message into the current chat from outside the loop
    /// (the presentation layer's "send now"). Goes through the same
    /// transport path and the same log as the background task.
    pub async fn send_now(&self, text: &str) -> Result<(), HibikiError> {
        let chat_id = self
            .current_chat_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| HibikiError::Watcher("not connected to a live chat".into()))?;

        let result = self.transport.send_message(&chat_id, text).await;
        self.log
            .append(DisplayRecord::bot(text.to_string(), result.is_ok()));
        result
    }

    /// The display log, shared with the presentation layer.
    pub fn log(&self) -> Arc<ChatLog> {
        self.log.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Everything the background task owns. Cursor, dedup set, and
/// arrival counter are private to the loop and touched by nothing
/// else.
struct WatchTask {
    transport: Arc<dyn ChatTransport>,
    generator: Option<Arc<dyn Generator>>,
    persona: Persona,
    character: Character,
    self_id: String,
    options: WatchConfig,
    log: Arc<ChatLog>,
    running: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    current_chat_id: Arc<Mutex<Option<String>>>,
    greeter: Arc<Mutex<GreetingStateMachine>>,
    cancelled: Arc<AtomicBool>,
    cancel_notify: Arc<Notify>,
    gate: ReplyGate,
    cursor: Option<String>,
    seen: HashSet<String>,
    arrival: u64,
    last_chat_id: Option<String>,
}

impl WatchTask {
    async fn run(mut self) {
        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                break;
            }

            let delay = self.poll_cycle().await;

            if self.cancelled.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = self.cancel_notify.notified() => {}
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        debug!("watch loop exited");
    }

    /// One poll cycle. Returns how long to sleep before the next one.
    async fn poll_cycle(&mut self) -> Duration {
        // 1. Determine the chat id, noticing identity changes.
        let resolved = match self.transport.resolve_chat_id().await {
            Ok(r) => r,
            Err(e) => {
                self.report_failure(format!("chat id resolution failed: {e}"));
                return Duration::from_secs(self.options.error_backoff_secs);
            }
        };

        if let Some(id) = &resolved {
            if self.last_chat_id.as_deref() != Some(id.as_str()) {
                if self.last_chat_id.is_some() {
                    info!("live chat id changed, treating as a fresh connection");
                }
                self.cursor = None;
                self.seen.clear();
                self.last_chat_id = Some(id.clone());
            }
        }

        self.connected.store(resolved.is_some(), Ordering::SeqCst);
        *self
            .current_chat_id
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = resolved.clone();

        // 2. Greeting edges.
        let greeting = self
            .greeter
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .observe(resolved.is_some());
        if let Some(text) = greeting {
            // The end greeting targets the chat we just lost.
            let target = resolved.clone().or_else(|| self.last_chat_id.clone());
            let ok = match &target {
                Some(id) => match self.transport.send_message(id, &text).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("greeting send failed: {e}");
                        false
                    }
                },
                None => false,
            };
            self.log.append(DisplayRecord::bot(text, ok));
        }

        // 3. Not live right now: back off without fetching.
        let Some(chat_id) = resolved else {
            return Duration::from_secs(self.options.idle_backoff_secs);
        };

        // 4. Fetch one page and take the transport's pacing hint.
        let page = match self
            .transport
            .fetch_page(&chat_id, self.cursor.as_deref())
            .await
        {
            Ok(p) => p,
            Err(e) => {
                self.report_failure(format!("page fetch failed: {e}"));
                return Duration::from_secs(self.options.error_backoff_secs);
            }
        };

        self.cursor = page.next_cursor;
        let interval_ms = page
            .polling_interval_ms
            .unwrap_or(self.options.default_poll_interval_ms)
            .max(self.options.min_poll_interval_ms);

        // 5/6. Mirror messages and reply where the gate allows.
        for item in page.items {
            // Non-text events (memberships, deletions) carry no text.
            let Some(text) = item.text else { continue };
            if !self.seen.insert(item.external_id.clone()) {
                continue;
            }

            self.arrival += 1;
            let msg = ChatMessage {
                id: Uuid::new_v4(),
                external_id: item.external_id,
                author_name: item.author_name,
                author_id: item.author_id,
                is_owner: item.is_owner || item.is_moderator,
                text,
                published_at: item.published_at,
                arrival_order: self.arrival,
            };
            self.log.append(DisplayRecord::viewer(&msg));
            self.maybe_reply(&chat_id, &msg).await;
        }

        Duration::from_millis(interval_ms)
    }

    /// Consult the gate and, when authorized, generate and send one
    /// persona reply for `msg`. A failed or empty generation just
    /// skips the reply; a failed send is recorded on the bot record.
    async fn maybe_reply(&mut self, chat_id: &str, msg: &ChatMessage) {
        let Some(generator) = self.generator.clone() else {
            return;
        };
        let is_self = !self.self_id.is_empty() && msg.author_id == self.self_id;
        if !self
            .gate
            .should_reply(&msg.author_id, self.options.auto_reply, is_self)
        {
            return;
        }

        let prompt = build_reply_prompt(
            &self.persona,
            &self.character,
            &msg.text,
            self.options.reply_max_chars,
        );

        let timeout = Duration::from_secs(self.options.generation_timeout_secs);
        let reply = match tokio::time::timeout(timeout, generator.generate(&prompt)).await {
            Ok(Ok(text)) => truncate_chars(text.trim(), self.options.reply_max_chars),
            Ok(Err(e)) => {
                warn!("reply generation failed: {e}");
                return;
            }
            Err(_) => {
                warn!(
                    "reply generation timed out after {}s",
                    self.options.generation_timeout_secs
                );
                return;
            }
        };
        if reply.is_empty() {
            return;
        }

        let ok = match self.transport.send_message(chat_id, &reply).await {
            Ok(()) => true,
            Err(e) => {
                warn!("reply send failed: {e}");
                false
            }
        };
        self.log.append(DisplayRecord::bot(reply, ok));
    }

    /// Surface a cycle failure to the viewer as a System record.
    fn report_failure(&self, text: String) {
        warn!("{text}");
        self.log.append(DisplayRecord::system(text));
    }
}
