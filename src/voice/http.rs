//! REST implementation of [`VoiceSessionClient`].
//!
//! ```text
//! start ─▶ POST {base}/call/web ─▶ call id
//!          poll GET {base}/call/{id} every poll_interval_ms ─▶ events
//! stop  ─▶ abort poller, DELETE {base}/call/{id}
//! ```
//!
//! Only the call lifecycle is tracked here.  The call's audio runs in the
//! provider's own web client; this process neither records nor plays it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::VoiceConfig;

use super::{VoiceSessionClient, VoiceSessionError, VoiceSessionEvent, VoiceSessionRequest};

/// Consecutive failed polls before the call is reported as faulted.
const MAX_POLL_FAILURES: u32 = 3;

#[derive(Debug, Deserialize)]
struct CallCreated {
    id: String,
}

/// Subset of the call resource we react to.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub assistant_speaking: bool,
    #[serde(default)]
    pub ended_reason: Option<String>,
}

/// What the poller has already reported.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Observed {
    pub started: bool,
    pub speaking: bool,
    pub ended: bool,
}

/// Events implied by moving from `prev` to `next`, plus the new observation.
pub fn diff_status(prev: Observed, next: &CallStatus) -> (Vec<VoiceSessionEvent>, Observed) {
    let mut events = Vec::new();
    let mut seen = prev;

    if next.status == "ended" {
        if seen.speaking {
            events.push(VoiceSessionEvent::SpeechEnded);
        }
        match next.ended_reason.as_deref() {
            Some(reason) if reason.contains("error") => {
                events.push(VoiceSessionEvent::Error(reason.to_string()));
            }
            _ => events.push(VoiceSessionEvent::CallEnded),
        }
        seen.ended = true;
        seen.speaking = false;
        return (events, seen);
    }

    if next.status == "in-progress" && !seen.started {
        events.push(VoiceSessionEvent::CallStarted);
        seen.started = true;
    }
    if seen.started && next.assistant_speaking != seen.speaking {
        events.push(if next.assistant_speaking {
            VoiceSessionEvent::SpeechStarted
        } else {
            VoiceSessionEvent::SpeechEnded
        });
        seen.speaking = next.assistant_speaking;
    }
    (events, seen)
}

#[derive(Default)]
struct Live {
    /// Bumped by every `stop`.  A connect that started under an older epoch
    /// must not adopt its call.
    epoch: u64,
    call_id: Option<String>,
    listeners: Vec<mpsc::Sender<VoiceSessionEvent>>,
    poller: Option<JoinHandle<()>>,
}

impl Live {
    /// Record a call created by a connect begun under `epoch`.  Returns
    /// `false`, leaving everything untouched, when a stop came in between.
    fn adopt(
        &mut self,
        epoch: u64,
        call_id: &str,
        listener: mpsc::Sender<VoiceSessionEvent>,
    ) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.call_id = Some(call_id.to_string());
        self.listeners.push(listener);
        true
    }

    /// Invalidate pending connects and hand back the call to delete.
    fn begin_stop(&mut self) -> Option<String> {
        self.epoch = self.epoch.wrapping_add(1);
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        self.call_id.take()
    }
}

struct Inner {
    client: reqwest::Client,
    config: VoiceConfig,
    live: Mutex<Live>,
}

/// REST client for the provider's web calls.
///
/// `start` is safe to abort: the POST runs in its own task and a call that
/// is created after a `stop` is deleted instead of being adopted.
pub struct HttpVoiceSession {
    inner: Arc<Inner>,
}

impl HttpVoiceSession {
    pub fn from_config(config: &VoiceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            inner: Arc::new(Inner {
                client,
                config: config.clone(),
                live: Mutex::new(Live::default()),
            }),
        }
    }
}

impl Inner {
    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.public_key.as_deref() {
            Some(key) if !key.trim().is_empty() => req.bearer_auth(key),
            _ => req,
        }
    }

    async fn connect(
        self: Arc<Self>,
        epoch: u64,
        request: VoiceSessionRequest,
        listener: mpsc::Sender<VoiceSessionEvent>,
    ) -> Result<(), VoiceSessionError> {
        let res = self
            .authed(self.client.post(self.url("call/web")).json(&request))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            return Err(classify_status(status, &detail));
        }
        let created: CallCreated = res
            .json()
            .await
            .map_err(|e| VoiceSessionError::Upstream(format!("malformed call: {e}")))?;

        let adopted = {
            let mut live = lock(&self.live);
            let adopted = live.adopt(epoch, &created.id, listener);
            if adopted {
                let poller = Arc::clone(&self).spawn_poller(created.id.clone());
                if let Some(old) = live.poller.replace(poller) {
                    old.abort();
                }
            }
            adopted
        };

        if !adopted {
            log::warn!("voice call {} created after stop, deleting it", created.id);
            if let Err(e) = self.delete_call(&created.id).await {
                log::warn!("could not delete late voice call {}: {e}", created.id);
            }
            return Err(VoiceSessionError::Provider(
                "call was stopped while connecting".into(),
            ));
        }

        log::info!("voice call {} created", created.id);
        Ok(())
    }

    async fn delete_call(&self, id: &str) -> Result<(), VoiceSessionError> {
        let res = self
            .authed(self.client.delete(self.url(&format!("call/{id}"))))
            .send()
            .await?;
        if !res.status().is_success() && res.status() != StatusCode::NOT_FOUND {
            let status = res.status();
            let detail = res.text().await.unwrap_or_default();
            return Err(classify_status(status, &detail));
        }
        Ok(())
    }

    fn spawn_poller(self: Arc<Self>, call_id: String) -> JoinHandle<()> {
        let url = self.url(&format!("call/{call_id}"));
        let key = self.config.public_key.clone().unwrap_or_default();
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(100));

        tokio::spawn(async move {
            let mut seen = Observed::default();
            let mut failures = 0u32;

            loop {
                tokio::time::sleep(interval).await;

                let status = match fetch_status(&self.client, &url, &key).await {
                    Ok(status) => {
                        failures = 0;
                        status
                    }
                    Err(e) => {
                        failures += 1;
                        log::warn!("call status poll failed ({failures}/{MAX_POLL_FAILURES}): {e}");
                        if failures >= MAX_POLL_FAILURES {
                            broadcast(&self.live, VoiceSessionEvent::Error(e.to_string())).await;
                            break;
                        }
                        continue;
                    }
                };

                let (events, next) = diff_status(seen, &status);
                seen = next;
                for event in events {
                    broadcast(&self.live, event).await;
                }
                if seen.ended {
                    lock(&self.live).call_id = None;
                    break;
                }
            }
        })
    }
}

fn lock(live: &Mutex<Live>) -> MutexGuard<'_, Live> {
    live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn broadcast(live: &Mutex<Live>, event: VoiceSessionEvent) {
    let listeners = lock(live).listeners.clone();
    log::debug!("voice session event: {event:?}");
    for tx in listeners {
        let _ = tx.send(event.clone()).await;
    }
}

async fn fetch_status(
    client: &reqwest::Client,
    url: &str,
    key: &str,
) -> Result<CallStatus, VoiceSessionError> {
    let res = client.get(url).bearer_auth(key).send().await?;
    let status = res.status();
    if !status.is_success() {
        let detail = res.text().await.unwrap_or_default();
        return Err(classify_status(status, &detail));
    }
    res.json::<CallStatus>()
        .await
        .map_err(|e| VoiceSessionError::Upstream(format!("malformed call status: {e}")))
}

fn classify_status(status: StatusCode, detail: &str) -> VoiceSessionError {
    let detail = format!("{status}: {}", detail.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => VoiceSessionError::Auth(detail),
        _ => VoiceSessionError::Upstream(detail),
    }
}

#[async_trait]
impl VoiceSessionClient for HttpVoiceSession {
    async fn start(
        &self,
        request: &VoiceSessionRequest,
        listener: mpsc::Sender<VoiceSessionEvent>,
    ) -> Result<(), VoiceSessionError> {
        let epoch = lock(&self.inner.live).epoch;
        // Detached, so aborting this future cannot strand a created call.
        let connect = tokio::spawn(Arc::clone(&self.inner).connect(
            epoch,
            request.clone(),
            listener,
        ));
        connect
            .await
            .map_err(|e| VoiceSessionError::Provider(format!("connect task failed: {e}")))?
    }

    async fn stop(&self) -> Result<(), VoiceSessionError> {
        let call_id = lock(&self.inner.live).begin_stop();
        let Some(id) = call_id else {
            return Ok(());
        };
        self.inner.delete_call(&id).await?;
        log::info!("voice call {id} stopped");
        Ok(())
    }

    fn remove_all_listeners(&self) {
        lock(&self.inner.live).listeners.clear();
    }
}
