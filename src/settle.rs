//! Bookkeeping core of the page readiness gate.
//!
//! The gate considers a page "non-loading" once no externally-fetched
//! resources have been in flight for a quiet window. [`SettleTracker`] holds
//! the request accounting as a pure state machine fed with
//! [`NetworkActivity`] values, leaving the CDP event wiring and timers to the
//! chromiumoxide adapter so the logic stays testable without a browser.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Quiet window with zero in-flight requests before the DOM counts as settled.
pub const QUIET_WINDOW: Duration = Duration::from_millis(500);

/// In-flight requests older than this are force-completed; long-polling and
/// abandoned requests must not pin the gate open for the whole timeout.
pub const STALL_THRESHOLD: Duration = Duration::from_secs(2);

/// Loading-relevant network/frame activity observed on the page.
#[derive(Debug, Clone)]
pub enum NetworkActivity {
    RequestWillBeSent {
        request_id: String,
        url: String,
        /// Document requests are also retired when their frame stops loading.
        is_document: bool,
        frame_id: Option<String>,
        /// WebSocket/EventSource traffic never settles and is ignored.
        is_realtime: bool,
    },
    LoadingFinished {
        request_id: String,
    },
    LoadingFailed {
        request_id: String,
    },
    ServedFromCache {
        request_id: String,
    },
    ResponseReceived {
        request_id: String,
        url: String,
    },
    FrameStoppedLoading {
        frame_id: String,
    },
}

#[derive(Debug, Clone)]
struct RequestMeta {
    url: String,
    started_at: Instant,
}

/// Tracks which requests are still loading-relevant.
#[derive(Debug, Default)]
pub struct SettleTracker {
    inflight: HashSet<String>,
    meta: HashMap<String, RequestMeta>,
    doc_by_frame: HashMap<String, String>,
}

impl SettleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one activity record into the accounting.
    pub fn observe(&mut self, activity: NetworkActivity) {
        match activity {
            NetworkActivity::RequestWillBeSent {
                request_id,
                url,
                is_document,
                frame_id,
                is_realtime,
            } => {
                if is_realtime {
                    return;
                }
                self.inflight.insert(request_id.clone());
                self.meta.insert(
                    request_id.clone(),
                    RequestMeta {
                        url,
                        started_at: Instant::now(),
                    },
                );
                if is_document {
                    if let Some(frame_id) = frame_id {
                        self.doc_by_frame.insert(frame_id, request_id);
                    }
                }
            }
            NetworkActivity::LoadingFinished { request_id }
            | NetworkActivity::LoadingFailed { request_id }
            | NetworkActivity::ServedFromCache { request_id } => {
                self.finish_request(&request_id);
            }
            NetworkActivity::ResponseReceived { request_id, url } => {
                // data: URLs never emit loadingFinished.
                if url.starts_with("data:") {
                    self.finish_request(&request_id);
                }
            }
            NetworkActivity::FrameStoppedLoading { frame_id } => {
                if let Some(request_id) = self.doc_by_frame.remove(&frame_id) {
                    self.finish_request(&request_id);
                }
            }
        }
    }

    /// True when no loading-relevant requests are in flight.
    pub fn is_quiet(&self) -> bool {
        self.inflight.is_empty()
    }

    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }

    /// Force-complete requests in flight longer than `threshold`, returning
    /// the URLs that were swept so the caller can log them.
    pub fn sweep_stalled(&mut self, threshold: Duration) -> Vec<String> {
        let now = Instant::now();
        let stalled: Vec<(String, String)> = self
            .meta
            .iter()
            .filter_map(|(request_id, entry)| {
                if now.duration_since(entry.started_at) > threshold {
                    Some((request_id.clone(), entry.url.clone()))
                } else {
                    None
                }
            })
            .collect();

        let mut urls = Vec::with_capacity(stalled.len());
        for (request_id, url) in stalled {
            self.finish_request(&request_id);
            urls.push(url);
        }
        urls
    }

    fn finish_request(&mut self, request_id: &str) {
        self.inflight.remove(request_id);
        self.meta.remove(request_id);
        self.doc_by_frame.retain(|_, rid| rid != request_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str, url: &str) -> NetworkActivity {
        NetworkActivity::RequestWillBeSent {
            request_id: id.to_string(),
            url: url.to_string(),
            is_document: false,
            frame_id: None,
            is_realtime: false,
        }
    }

    #[test]
    fn requests_open_and_close_the_gate() {
        let mut tracker = SettleTracker::new();
        assert!(tracker.is_quiet());

        tracker.observe(request("r1", "https://example.com/app.js"));
        tracker.observe(request("r2", "https://example.com/app.css"));
        assert!(!tracker.is_quiet());
        assert_eq!(tracker.inflight_count(), 2);

        tracker.observe(NetworkActivity::LoadingFinished {
            request_id: "r1".to_string(),
        });
        tracker.observe(NetworkActivity::LoadingFailed {
            request_id: "r2".to_string(),
        });
        assert!(tracker.is_quiet());
    }

    #[test]
    fn realtime_traffic_is_ignored() {
        let mut tracker = SettleTracker::new();
        tracker.observe(NetworkActivity::RequestWillBeSent {
            request_id: "ws".to_string(),
            url: "wss://example.com/socket".to_string(),
            is_document: false,
            frame_id: None,
            is_realtime: true,
        });
        assert!(tracker.is_quiet());
    }

    #[test]
    fn data_url_response_counts_as_finished() {
        let mut tracker = SettleTracker::new();
        tracker.observe(request("r1", "data:image/png;base64,AAAA"));
        tracker.observe(NetworkActivity::ResponseReceived {
            request_id: "r1".to_string(),
            url: "data:image/png;base64,AAAA".to_string(),
        });
        assert!(tracker.is_quiet());

        tracker.observe(request("r2", "https://example.com/slow"));
        tracker.observe(NetworkActivity::ResponseReceived {
            request_id: "r2".to_string(),
            url: "https://example.com/slow".to_string(),
        });
        assert!(!tracker.is_quiet());
    }

    #[test]
    fn frame_stop_retires_its_document_request() {
        let mut tracker = SettleTracker::new();
        tracker.observe(NetworkActivity::RequestWillBeSent {
            request_id: "doc".to_string(),
            url: "https://example.com/".to_string(),
            is_document: true,
            frame_id: Some("frame-1".to_string()),
            is_realtime: false,
        });
        assert!(!tracker.is_quiet());

        tracker.observe(NetworkActivity::FrameStoppedLoading {
            frame_id: "frame-1".to_string(),
        });
        assert!(tracker.is_quiet());

        // A second stop for the same frame is a no-op.
        tracker.observe(NetworkActivity::FrameStoppedLoading {
            frame_id: "frame-1".to_string(),
        });
        assert!(tracker.is_quiet());
    }

    #[test]
    fn sweep_forces_stalled_requests_out() {
        let mut tracker = SettleTracker::new();
        tracker.observe(request("r1", "https://example.com/hanging"));

        let swept = tracker.sweep_stalled(Duration::from_millis(0));
        assert_eq!(swept, vec!["https://example.com/hanging".to_string()]);
        assert!(tracker.is_quiet());

        tracker.observe(request("r2", "https://example.com/fresh"));
        let swept = tracker.sweep_stalled(Duration::from_secs(60));
        assert!(swept.is_empty());
        assert!(!tracker.is_quiet());
    }
}
