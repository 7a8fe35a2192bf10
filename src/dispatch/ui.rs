// Serialized UI-affinity context: a single task draining a FIFO of posted closures.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the UI context. Cheap to clone; posting never blocks and works from any thread.
#[derive(Clone)]
pub struct UiContext {
    tx: mpsc::UnboundedSender<UiTask>,
    runtime: Handle,
}

impl UiContext {
    /// Start the UI loop on `runtime`. The loop ends once every handle is dropped.
    pub fn spawn(runtime: &Handle) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<UiTask>();
        let join = runtime.spawn(async move {
            while let Some(task) = rx.recv().await {
                if catch_unwind(AssertUnwindSafe(task)).is_err() {
                    error!("ui task panicked");
                }
            }
            debug!("ui context stopped");
        });
        (
            Self {
                tx,
                runtime: runtime.clone(),
            },
            join,
        )
    }

    /// Queue `task` behind everything already posted. Returns `false` if the loop is gone.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Box::new(task)).is_ok()
    }

    /// Queue `task` once `delay` has elapsed.
    pub fn post_delayed<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let ui = self.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            ui.post(task);
        });
    }

    /// Resolve once everything posted before this call has run.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.post(move || {
            let _ = tx.send(());
        }) {
            let _ = rx.await;
        }
    }

    /// Runtime used for timers and background I/O started from the UI context.
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }
}
