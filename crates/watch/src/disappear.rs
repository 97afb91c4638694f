use anyhow::{Error, anyhow};
use core::time::Duration;
use dom::{ClassSelector, DocUpdate, SharedQueryIndex};
use log::{debug, trace};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time;

/// Why a disappearance watch resolved.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Resolution {
    /// No element matched the selector after a mutation batch.
    Disappeared,
    /// The timeout elapsed with the element still present.
    TimedOut,
}

/// A registered watch for an element ceasing to match a selector.
///
/// Registration (construction) subscribes to the document's update stream;
/// [`DisappearanceWatch::wait`] races that stream against the timeout.
/// `wait` consumes the watch, so a watch resolves exactly once, and
/// returning from the race drops both the subscription (unsubscribe) and
/// the timer (cancel); neither path can fire again after resolution.
pub struct DisappearanceWatch {
    updates: broadcast::Receiver<Vec<DocUpdate>>,
    index: SharedQueryIndex,
    selector: ClassSelector,
    timeout: Duration,
}

impl DisappearanceWatch {
    /// Register a watch over an update subscription and the shared index it
    /// is synchronized with.
    pub fn new(
        updates: broadcast::Receiver<Vec<DocUpdate>>,
        index: SharedQueryIndex,
        selector: ClassSelector,
        timeout: Duration,
    ) -> Self {
        Self {
            updates,
            index,
            selector,
            timeout,
        }
    }

    /// Wait until the selector stops matching or the timeout elapses,
    /// whichever comes first.
    ///
    /// There is no initial query: a document already missing the element
    /// resolves on the first mutation batch after registration, or on the
    /// timeout. Batches are only notifications; every re-query runs against
    /// the live shared index, so a lagged subscription loses nothing.
    pub async fn wait(mut self) -> Result<Resolution, Error> {
        debug!(
            "watch: waiting up to {:?} for {} to disappear",
            self.timeout, self.selector
        );
        let deadline = time::sleep(self.timeout);
        tokio::pin!(deadline);
        let mut observing = true;
        loop {
            tokio::select! {
                () = &mut deadline => {
                    debug!("watch: {} still present at deadline", self.selector);
                    return Ok(Resolution::TimedOut);
                }
                batch = self.updates.recv(), if observing => match batch {
                    Ok(batch) => {
                        trace!("watch: re-querying {} after {} updates", self.selector, batch.len());
                        if self.target_is_gone()? {
                            debug!("watch: {} disappeared", self.selector);
                            return Ok(Resolution::Disappeared);
                        }
                    }
                    // Lagging skipped notifications, not data; query live state.
                    Err(RecvError::Lagged(skipped)) => {
                        trace!("watch: subscription lagged by {skipped} batches");
                        if self.target_is_gone()? {
                            return Ok(Resolution::Disappeared);
                        }
                    }
                    Err(RecvError::Closed) => {
                        // The document is gone; nothing will change again.
                        // The wait is abandoned at the deadline.
                        trace!("watch: update stream closed, waiting out the timer");
                        observing = false;
                    }
                },
            }
        }
    }

    fn target_is_gone(&self) -> Result<bool, Error> {
        let guard = self
            .index
            .lock()
            .map_err(|_| anyhow!("query index state poisoned"))?;
        Ok(guard.first_match(&self.selector).is_none())
    }
}

/// Compatibility form of the disappearance watch: a class string (embedded
/// whitespace builds a compound selector, see
/// [`ClassSelector::from_class_string`]) and a no-argument completion
/// callback that cannot tell disappearance from timeout.
///
/// The returned [`Resolution`] carries the cause for callers that need it;
/// the callback contract itself stays deliberately ambiguous. `FnOnce`
/// makes more-than-once invocation unrepresentable.
pub async fn watch_for_disappearance<F: FnOnce()>(
    updates: broadcast::Receiver<Vec<DocUpdate>>,
    index: SharedQueryIndex,
    class_string: &str,
    timeout: Duration,
    on_complete: F,
) -> Result<Resolution, Error> {
    let selector = ClassSelector::from_class_string(class_string)?;
    let watch = DisappearanceWatch::new(updates, index, selector, timeout);
    let resolution = watch.wait().await?;
    on_complete();
    Ok(resolution)
}
