//! Test utilities and common setup.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use courier::completion::{CompletionApi, CompletionError, CompletionResult};
use courier::transport::{GatewayCommand, OutboundItem, write_item};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;

/// Scripted behavior for the mock completion backend.
pub enum MockBehavior {
    /// Always reply with this text.
    Reply(String),
    /// Always fail with an upstream status error.
    Fail,
    /// Never resolve; forces callers onto their outer timeout.
    Hang,
    /// Fail this many times, then reply.
    FailTimes(usize, String),
}

/// Mock completion backend recording every dispatch call.
pub struct MockCompletion {
    behavior: MockBehavior,
    failures_left: AtomicUsize,
    calls: Mutex<Vec<Instant>>,
}

impl MockCompletion {
    pub fn new(behavior: MockBehavior) -> Arc<Self> {
        let failures_left = match &behavior {
            MockBehavior::FailTimes(count, _) => *count,
            _ => 0,
        };
        Arc::new(Self {
            behavior,
            failures_left: AtomicUsize::new(failures_left),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionApi for MockCompletion {
    async fn dispatch(&self, _text: &str) -> CompletionResult<String> {
        self.calls.lock().unwrap().push(Instant::now());
        match &self.behavior {
            MockBehavior::Reply(text) => Ok(text.clone()),
            MockBehavior::Fail => Err(CompletionError::UpstreamStatus(500)),
            MockBehavior::Hang => std::future::pending().await,
            MockBehavior::FailTimes(_, text) => {
                let left = self.failures_left.load(Ordering::SeqCst);
                if left > 0 {
                    self.failures_left.store(left - 1, Ordering::SeqCst);
                    Err(CompletionError::UpstreamStatus(500))
                } else {
                    Ok(text.clone())
                }
            }
        }
    }
}

/// Drain the outbox the way the gateway writer does, recording every
/// resulting frame in order.
pub fn spawn_writer(
    mut rx: mpsc::Receiver<OutboundItem>,
    chunk_chars: usize,
) -> Arc<Mutex<Vec<GatewayCommand>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let frames_log = Arc::clone(&log);

    tokio::spawn(async move {
        let (mut sink, mut frames) = futures::channel::mpsc::unbounded::<Message>();
        while let Some(item) = rx.recv().await {
            write_item(&mut sink, item, chunk_chars).await.unwrap();
            while let Ok(Some(frame)) = frames.try_next() {
                let command: GatewayCommand =
                    serde_json::from_str(frame.to_text().unwrap()).unwrap();
                frames_log.lock().unwrap().push(command);
            }
        }
    });

    log
}
