//! Chromiumoxide-backed [`AgentPage`] implementation.
//!
//! Wraps a live `chromiumoxide::Page` in the capability trait the extraction
//! tool consumes. The readiness gate is implemented here: CDP network and
//! frame events are funnelled into the pure [`SettleTracker`], while this
//! module owns the timers and listener plumbing.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::{
    accessibility::{
        DisableParams as AccessibilityDisableParams, EnableParams as AccessibilityEnableParams,
        GetFullAxTreeParams,
    },
    dom::EnableParams as DomEnableParams,
    network::{
        self, EventLoadingFailed, EventLoadingFinished, EventRequestServedFromCache,
        EventRequestWillBeSent, EventResponseReceived, ResourceType,
    },
    page as page_domain,
    page::EventFrameStoppedLoading,
};
use chromiumoxide::cdp::IntoEventKind;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::page::Page as ChromiumPage;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Duration, MissedTickBehavior, Sleep},
};

use crate::logging::ScoutLogger;
use crate::page::{AgentPage, PageError};
use crate::settle::{NetworkActivity, SettleTracker, QUIET_WINDOW, STALL_THRESHOLD};

fn cdp_error(err: impl std::fmt::Display) -> PageError {
    PageError::Cdp(err.to_string())
}

/// [`AgentPage`] handle over a live chromiumoxide page.
pub struct ChromiumPageHandle {
    page: ChromiumPage,
    logger: Arc<ScoutLogger>,
}

impl ChromiumPageHandle {
    pub fn new(page: ChromiumPage, logger: Arc<ScoutLogger>) -> Self {
        Self { page, logger }
    }

    async fn spawn_activity_listeners(
        &self,
        tx: mpsc::UnboundedSender<NetworkActivity>,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        match self.page.event_listener::<EventRequestWillBeSent>().await {
            Ok(stream) => handles.push(spawn_activity_listener(stream, tx.clone(), |ev| {
                NetworkActivity::RequestWillBeSent {
                    request_id: ev.request_id.as_ref().to_string(),
                    url: ev.request.url.clone(),
                    is_document: matches!(ev.r#type.as_ref(), Some(ResourceType::Document)),
                    frame_id: ev.frame_id.as_ref().map(|id| id.as_ref().to_string()),
                    is_realtime: matches!(
                        ev.r#type.as_ref(),
                        Some(ResourceType::WebSocket | ResourceType::EventSource)
                    ),
                }
            })),
            Err(err) => self.listener_failed("Network.requestWillBeSent", err),
        }

        match self.page.event_listener::<EventLoadingFinished>().await {
            Ok(stream) => handles.push(spawn_activity_listener(stream, tx.clone(), |ev| {
                NetworkActivity::LoadingFinished {
                    request_id: ev.request_id.as_ref().to_string(),
                }
            })),
            Err(err) => self.listener_failed("Network.loadingFinished", err),
        }

        match self.page.event_listener::<EventLoadingFailed>().await {
            Ok(stream) => handles.push(spawn_activity_listener(stream, tx.clone(), |ev| {
                NetworkActivity::LoadingFailed {
                    request_id: ev.request_id.as_ref().to_string(),
                }
            })),
            Err(err) => self.listener_failed("Network.loadingFailed", err),
        }

        match self
            .page
            .event_listener::<EventRequestServedFromCache>()
            .await
        {
            Ok(stream) => handles.push(spawn_activity_listener(stream, tx.clone(), |ev| {
                NetworkActivity::ServedFromCache {
                    request_id: ev.request_id.as_ref().to_string(),
                }
            })),
            Err(err) => self.listener_failed("Network.requestServedFromCache", err),
        }

        match self.page.event_listener::<EventResponseReceived>().await {
            Ok(stream) => handles.push(spawn_activity_listener(stream, tx.clone(), |ev| {
                NetworkActivity::ResponseReceived {
                    request_id: ev.request_id.as_ref().to_string(),
                    url: ev.response.url.clone(),
                }
            })),
            Err(err) => self.listener_failed("Network.responseReceived", err),
        }

        match self.page.event_listener::<EventFrameStoppedLoading>().await {
            Ok(stream) => handles.push(spawn_activity_listener(stream, tx, |ev| {
                NetworkActivity::FrameStoppedLoading {
                    frame_id: ev.frame_id.as_ref().to_string(),
                }
            })),
            Err(err) => self.listener_failed("Page.frameStoppedLoading", err),
        }

        handles
    }

    fn listener_failed(&self, event: &str, err: impl std::fmt::Display) {
        self.logger.debug(
            format!("Failed to subscribe to {event}: {err}"),
            Some("dom-settle"),
            None,
        );
    }
}

#[async_trait]
impl AgentPage for ChromiumPageHandle {
    async fn evaluate(&self, expression: &str) -> Result<Value, PageError> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|err| PageError::Evaluation(err.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn send_cdp(&self, method: &str, params: Option<Value>) -> Result<Value, PageError> {
        match method {
            "Accessibility.enable" => {
                self.page
                    .execute(AccessibilityEnableParams::default())
                    .await
                    .map_err(cdp_error)?;
                Ok(Value::Null)
            }
            "Accessibility.disable" => {
                self.page
                    .execute(AccessibilityDisableParams::default())
                    .await
                    .map_err(cdp_error)?;
                Ok(Value::Null)
            }
            "Accessibility.getFullAXTree" => {
                let command: GetFullAxTreeParams = match params {
                    Some(value) => serde_json::from_value(value)
                        .map_err(|err| PageError::Cdp(err.to_string()))?,
                    None => GetFullAxTreeParams::default(),
                };
                let response = self.page.execute(command).await.map_err(cdp_error)?;
                serde_json::to_value(&response.result).map_err(cdp_error)
            }
            "Network.enable" => {
                self.page
                    .execute(network::EnableParams::default())
                    .await
                    .map_err(cdp_error)?;
                Ok(Value::Null)
            }
            "Page.enable" => {
                self.page
                    .execute(page_domain::EnableParams::default())
                    .await
                    .map_err(cdp_error)?;
                Ok(Value::Null)
            }
            "DOM.enable" => {
                self.page
                    .execute(DomEnableParams::default())
                    .await
                    .map_err(cdp_error)?;
                Ok(Value::Null)
            }
            other => Err(PageError::UnsupportedMethod(other.to_string())),
        }
    }

    /// Soft wait: always returns once the page settles or `timeout` elapses.
    /// Setup failures degrade to debug logs; the extraction proceeds either way.
    async fn wait_for_non_loading_dom(&self, timeout: Duration) {
        for method in ["Network.enable", "Page.enable", "DOM.enable"] {
            if let Err(err) = self.send_cdp(method, None).await {
                self.logger.debug(
                    format!("Failed to call {method} before DOM settle wait: {err}"),
                    Some("dom-settle"),
                    None,
                );
            }
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener_handles = self.spawn_activity_listeners(tx).await;

        let mut tracker = SettleTracker::new();
        let mut stall_tick = time::interval(Duration::from_millis(500));
        stall_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut quiet_timer: Option<Pin<Box<Sleep>>> = Some(Box::pin(time::sleep(QUIET_WINDOW)));
        let mut timeout_timer = Box::pin(time::sleep(timeout));

        loop {
            tokio::select! {
                maybe_activity = rx.recv() => {
                    match maybe_activity {
                        Some(activity) => {
                            tracker.observe(activity);
                            sync_quiet_timer(&tracker, &mut quiet_timer);
                        }
                        None => break,
                    }
                }
                _ = async {
                    if let Some(timer) = quiet_timer.as_mut() {
                        timer.as_mut().await;
                    }
                }, if quiet_timer.is_some() => {
                    break;
                }
                _ = stall_tick.tick() => {
                    for url in tracker.sweep_stalled(STALL_THRESHOLD) {
                        self.logger.debug(
                            format!("Forcing completion of stalled request: {url}"),
                            Some("dom-settle"),
                            None,
                        );
                    }
                    sync_quiet_timer(&tracker, &mut quiet_timer);
                }
                _ = &mut timeout_timer => {
                    if !tracker.is_quiet() {
                        self.logger.debug(
                            format!(
                                "DOM settle timeout reached with {} inflight requests",
                                tracker.inflight_count()
                            ),
                            Some("dom-settle"),
                            None,
                        );
                    }
                    break;
                }
            }
        }

        for handle in listener_handles {
            handle.abort();
        }
    }
}

/// Arm the quiet timer while nothing is in flight, clear it otherwise.
fn sync_quiet_timer(tracker: &SettleTracker, quiet_timer: &mut Option<Pin<Box<Sleep>>>) {
    if tracker.is_quiet() {
        if quiet_timer.is_none() {
            *quiet_timer = Some(Box::pin(time::sleep(QUIET_WINDOW)));
        }
    } else {
        *quiet_timer = None;
    }
}

fn spawn_activity_listener<T, F>(
    mut stream: EventStream<T>,
    tx: mpsc::UnboundedSender<NetworkActivity>,
    map: F,
) -> JoinHandle<()>
where
    T: IntoEventKind + Clone + Unpin + Send + 'static,
    F: Fn(&T) -> NetworkActivity + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = stream.next().await {
            if tx.send(map(event.as_ref())).is_err() {
                break;
            }
        }
    })
}
