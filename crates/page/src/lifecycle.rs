use crate::session::{LifecycleEvent, PageSession};
use log::info;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Attach the two stateless lifecycle loggers: one announcing the full page
/// load, one announcing initial document-structure readiness.
///
/// Each listener performs a single observational log line per event and
/// nothing else; neither is consumed for control flow. Returns the listener
/// task handles; the tasks end when the session (and its event channel) is
/// dropped.
pub fn attach_lifecycle_loggers(session: &PageSession) -> (JoinHandle<()>, JoinHandle<()>) {
    let load_logger = spawn_logger(session, LifecycleEvent::PageLoaded, "Page has loaded");
    let ready_logger = spawn_logger(
        session,
        LifecycleEvent::DocumentReady,
        "Document has loaded",
    );
    (load_logger, ready_logger)
}

fn spawn_logger(
    session: &PageSession,
    wanted: LifecycleEvent,
    message: &'static str,
) -> JoinHandle<()> {
    let mut events = session.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) if event == wanted => info!("{message}!"),
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    })
}
