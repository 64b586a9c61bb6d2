// Tokio re-exports, dependents use the runtime through this module
pub use ::tokio::{join, main, runtime, select, signal, spawn, sync, task, test, time};

use log::trace;
use std::future::Future;
use task::JoinHandle;

// Spawn a named task on the current runtime
#[track_caller]
pub fn spawn_task<S, F>(name: S, future: F) -> JoinHandle<F::Output>
where
    S: Into<String>,
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let name = name.into();
    if log::log_enabled!(log::Level::Trace) {
        trace!("Spawning task: {}", name);
    }
    spawn(future)
}
