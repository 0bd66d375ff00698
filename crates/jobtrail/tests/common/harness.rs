//! In-memory mailbox, scripted classifier and a harness wiring them to a
//! fresh database.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tokio::sync::Notify;

use jobtrail::classifier::{
    ClassificationError, ClassificationResult, Classifier, HeuristicClassifier,
};
use jobtrail::config::SyncSettings;
use jobtrail::db::job_repo::{self, JobRecord};
use jobtrail::email::{EmailError, MailSource, MessageId, RawMessage};
use jobtrail::{Database, SyncContext};

use super::builders::{fast_retry, sync_settings, MessageBuilder};

#[derive(Default)]
struct MailboxState {
    messages: BTreeMap<MessageId, (DateTime<Utc>, Vec<u8>)>,
    flagged: BTreeSet<MessageId>,
    connect_failures: VecDeque<EmailError>,
    fetch_failures: HashMap<MessageId, EmailError>,
    next_uid: MessageId,
    connects: usize,
    logouts: usize,
    expunges: usize,
    searches: Vec<DateTime<Utc>>,
}

/// Shared mailbox contents. Sources created from it see the same state,
/// so a test can inspect what a pass did after handing a source away.
#[derive(Clone, Default)]
pub struct FakeMailbox {
    state: Arc<Mutex<MailboxState>>,
}

impl FakeMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message and returns its UID.
    pub fn deliver(&self, message: &MessageBuilder) -> MessageId {
        self.deliver_raw(message.date_value(), message.build())
    }

    pub fn deliver_raw(&self, date: DateTime<Utc>, bytes: Vec<u8>) -> MessageId {
        let mut state = self.state.lock().unwrap();
        state.next_uid += 1;
        let uid = state.next_uid;
        state.messages.insert(uid, (date, bytes));
        uid
    }

    pub fn fail_next_connect(&self, error: EmailError) {
        self.state.lock().unwrap().connect_failures.push_back(error);
    }

    pub fn fail_fetch(&self, uid: MessageId, error: EmailError) {
        self.state.lock().unwrap().fetch_failures.insert(uid, error);
    }

    pub fn source(&self) -> FakeMailSource {
        FakeMailSource {
            mailbox: self.clone(),
            connected: false,
            pause_on_list: None,
        }
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn logouts(&self) -> usize {
        self.state.lock().unwrap().logouts
    }

    pub fn expunges(&self) -> usize {
        self.state.lock().unwrap().expunges
    }

    pub fn searches(&self) -> Vec<DateTime<Utc>> {
        self.state.lock().unwrap().searches.clone()
    }

    pub fn uids(&self) -> Vec<MessageId> {
        self.state.lock().unwrap().messages.keys().copied().collect()
    }
}

/// [`MailSource`] over a [`FakeMailbox`].
pub struct FakeMailSource {
    mailbox: FakeMailbox,
    connected: bool,
    pause_on_list: Option<Arc<Notify>>,
}

impl FakeMailSource {
    /// Makes `list_since` wait until `gate` is notified.
    pub fn paused_on_list(mut self, gate: Arc<Notify>) -> Self {
        self.pause_on_list = Some(gate);
        self
    }

    fn require_connection(&self) -> Result<(), EmailError> {
        if self.connected {
            Ok(())
        } else {
            Err(EmailError::NotConnected)
        }
    }
}

#[async_trait]
impl MailSource for FakeMailSource {
    async fn connect(&mut self) -> Result<(), EmailError> {
        let mut state = self.mailbox.state.lock().unwrap();
        state.connects += 1;
        if let Some(error) = state.connect_failures.pop_front() {
            return Err(error);
        }
        self.connected = true;
        Ok(())
    }

    async fn list_since(&mut self, since: DateTime<Utc>) -> Result<Vec<MessageId>, EmailError> {
        self.require_connection()?;
        if let Some(gate) = &self.pause_on_list {
            gate.notified().await;
        }
        let mut state = self.mailbox.state.lock().unwrap();
        state.searches.push(since);
        Ok(state
            .messages
            .iter()
            .filter(|(_, (date, _))| *date >= since)
            .map(|(uid, _)| *uid)
            .collect())
    }

    async fn fetch(&mut self, id: MessageId) -> Result<Vec<u8>, EmailError> {
        self.require_connection()?;
        let mut state = self.mailbox.state.lock().unwrap();
        if let Some(error) = state.fetch_failures.remove(&id) {
            return Err(error);
        }
        state
            .messages
            .get(&id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or(EmailError::MessageNotFound(id))
    }

    async fn mark_for_deletion(&mut self, id: MessageId) -> Result<(), EmailError> {
        self.require_connection()?;
        self.mailbox.state.lock().unwrap().flagged.insert(id);
        Ok(())
    }

    async fn expunge(&mut self) -> Result<(), EmailError> {
        self.require_connection()?;
        let mut state = self.mailbox.state.lock().unwrap();
        let flagged = std::mem::take(&mut state.flagged);
        for uid in flagged {
            state.messages.remove(&uid);
        }
        state.expunges += 1;
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), EmailError> {
        self.connected = false;
        self.mailbox.state.lock().unwrap().logouts += 1;
        Ok(())
    }
}

/// Scripted reply for one subject.
pub enum Script {
    Result(ClassificationResult),
    Fail,
}

/// Answers from a script keyed by subject and falls back to the heuristic
/// classifier. Counts calls so tests can prove a message was skipped
/// before classification.
pub struct ScriptedClassifier {
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    fallback: HeuristicClassifier,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: HeuristicClassifier::default(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queues a reply for the next classification of `subject`.
    pub fn script(self, subject: &str, script: Script) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(subject.to_string())
            .or_default()
            .push_back(script);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn try_classify(
        &self,
        message: &RawMessage,
    ) -> Result<ClassificationResult, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&message.subject)
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(Script::Result(result)) => Ok(result),
            Some(Script::Fail) => Err(ClassificationError::Transport(
                "connection refused".to_string(),
            )),
            None => self.fallback.try_classify(message).await,
        }
    }
}

/// A database in a temp directory plus helpers to build contexts over it.
pub struct TestHarness {
    temp_dir: TempDir,
    pub db: Database,
    pub mailbox: FakeMailbox,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(&temp_dir.path().join("jobtrail.db")).expect("Failed to open db");
        Self {
            temp_dir,
            db,
            mailbox: FakeMailbox::new(),
        }
    }

    pub fn context(&self, classifier: Arc<dyn Classifier>) -> SyncContext {
        self.context_with(classifier, sync_settings())
    }

    pub fn context_with(
        &self,
        classifier: Arc<dyn Classifier>,
        settings: SyncSettings,
    ) -> SyncContext {
        SyncContext::new(self.db.clone(), settings, &fast_retry(), classifier)
            .expect("Failed to build sync context")
    }

    pub fn heuristic_context(&self) -> SyncContext {
        self.context(Arc::new(HeuristicClassifier::default()))
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("jobtrail.db")
    }

    /// Opens a second handle on the same file, as a separate process would.
    pub fn reopen(&self) -> Database {
        Database::open(&self.db_path()).expect("Failed to reopen db")
    }

    pub fn records(&self) -> Vec<JobRecord> {
        self.db.with_conn(job_repo::list_active).unwrap()
    }

    pub fn record_count(&self) -> u64 {
        self.db.with_conn(job_repo::count_all).unwrap()
    }
}

/// Starts an OpenAI-style chat completions stub that answers `times`
/// requests with `content` as the assistant message. Returns the base URL.
pub async fn serve_chat_completion(content: &str, times: usize) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let body = serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for _ in 0..times {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
    });

    format!("http://{}", addr)
}
