// Request bridge: runs engine server calls on the transport and routes results back by token.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::stats::{BridgeStats, BridgeStatsSnapshot};
use super::traits::{DataToken, ResponseSink, ServerCall, TargetToken};
use crate::config::TRANSPORT_FAILURE_STATUS;
use crate::transport::http_transport::redact_query;
use crate::transport::traits::{HttpResponse, Transport};

#[derive(Default)]
struct PendingRequests {
    shutting_down: bool,
    requests: HashMap<DataToken, TargetToken>,
}

pub struct RequestBridge {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn ResponseSink>,
    pending: Mutex<PendingRequests>,
    /// Open until `shutdown`. Deliveries run under a read guard, so taking the write guard
    /// waits out any delivery already inside the sink.
    delivery_gate: RwLock<bool>,
    shutdown_token: CancellationToken,
    runtime: Handle,
    stats: BridgeStats,
}

impl RequestBridge {
    /// `runtime` hosts the transport futures; `dispatch` itself may be called from any thread.
    pub fn new(transport: Arc<dyn Transport>, sink: Arc<dyn ResponseSink>, runtime: Handle) -> Self {
        Self {
            transport,
            sink,
            pending: Mutex::new(PendingRequests::default()),
            delivery_gate: RwLock::new(true),
            shutdown_token: CancellationToken::new(),
            runtime,
            stats: BridgeStats::new(),
        }
    }

    /// Register the call and start it on the transport. Returns immediately.
    pub fn dispatch(self: &Arc<Self>, call: ServerCall) {
        debug!("server call: {}", redact_query(&call.url));
        {
            let mut pending = self.pending.lock();
            if pending.shutting_down {
                warn!("ignoring server call during shutdown");
                self.stats.record_dropped();
                return;
            }
            pending.requests.insert(call.data, call.target);
        }
        self.stats.record_dispatched();

        let bridge = Arc::clone(self);
        self.runtime.spawn(async move {
            let result = tokio::select! {
                result = bridge.execute(&call) => result,
                _ = bridge.shutdown_token.cancelled() => {
                    debug!("server call {:?} abandoned: bridge shut down", call.data);
                    bridge.stats.record_finished();
                    return;
                }
            };

            match result {
                Ok(resp) => {
                    debug!("server response {:?} status={}", call.data, resp.status);
                    bridge.complete(call.data, i32::from(resp.status), &resp.body);
                }
                Err(e) => {
                    warn!("server call {:?} failed: {}", call.data, e);
                    bridge.complete(call.data, TRANSPORT_FAILURE_STATUS, &e.to_string());
                }
            }
            bridge.stats.record_finished();
        });
    }

    async fn execute(&self, call: &ServerCall) -> anyhow::Result<HttpResponse> {
        match call.body.as_deref() {
            Some(body) if !body.is_empty() => self.transport.post(&call.url, body).await,
            _ => self.transport.get(&call.url).await,
        }
    }

    /// Hand a result to the engine. Only the first result for a token is delivered; anything
    /// after shutdown or for an unknown token is dropped. Returns whether it was delivered.
    pub fn complete(&self, data: DataToken, status: i32, body: &str) -> bool {
        let gate = self.delivery_gate.read();
        if !*gate || self.shutdown_token.is_cancelled() {
            debug!("dropping response for {:?}: bridge shut down", data);
            self.stats.record_dropped();
            return false;
        }

        // The engine may issue a new server call from inside its response handler, so only the
        // gate is held across `deliver`, never the pending map.
        let target = {
            let mut pending = self.pending.lock();
            if pending.shutting_down {
                None
            } else {
                pending.requests.remove(&data)
            }
        };

        match target {
            Some(target) => {
                self.sink.deliver(target, data, status, body);
                self.stats
                    .record_delivered(status == TRANSPORT_FAILURE_STATUS);
                true
            }
            None => {
                debug!("no pending request for {:?}", data);
                self.stats.record_dropped();
                false
            }
        }
    }

    /// Forget every pending request and abandon in-flight transport calls. Blocks until a
    /// delivery already running in the sink has returned, so it must not be called from inside
    /// the sink.
    pub fn shutdown(&self) {
        let cleared = {
            let mut pending = self.pending.lock();
            pending.shutting_down = true;
            let n = pending.requests.len();
            pending.requests.clear();
            n
        };
        self.shutdown_token.cancel();
        *self.delivery_gate.write() = false;
        info!("request bridge shut down, {} pending requests dropped", cleared);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().requests.len()
    }

    pub fn stats(&self) -> BridgeStatsSnapshot {
        self.stats.snapshot()
    }
}
