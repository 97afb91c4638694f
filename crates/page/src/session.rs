use crate::config::PageConfig;
use crate::fetch::fetch_url;
use anyhow::{Error, anyhow};
use dom::{DocUpdate, Document, SharedQueryIndex, parse_html};
use log::{info, trace};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use url::Url;

/// Fire-once-per-load lifecycle notifications.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LifecycleEvent {
    /// The document structure is fully applied (`EndOfDocument` seen).
    DocumentReady,
    /// Loading is finished and the intake fully drained.
    PageLoaded,
}

/// A loaded page: a [`Document`] fed from a fetched, parsed byte stream,
/// plus lifecycle event tracking.
pub struct PageSession {
    // If none, loading is finished. If some, still streaming.
    loader: Option<JoinHandle<Result<(), Error>>>,
    document: Document,
    in_sender: mpsc::Sender<Vec<DocUpdate>>,
    events: broadcast::Sender<LifecycleEvent>,
    // Whether we've announced initial document-structure readiness.
    document_ready_fired: bool,
    // Whether we've announced the full page load.
    load_fired: bool,
    url: Url,
}

impl PageSession {
    /// Fetch and parse the document behind `url`, then stream it into a new
    /// session in `config.batch_size`-sized update batches.
    pub async fn load(url: Url, config: &PageConfig) -> Result<Self, Error> {
        let (out_sender, _) = broadcast::channel(128);
        let (in_sender, in_receiver) = mpsc::channel(128);
        let document = Document::new(out_sender, in_receiver);

        let body = fetch_url(&url).await?;
        let html = String::from_utf8_lossy(&body).into_owned();
        let updates = parse_html(&html)?;
        info!("page: streaming {} updates from {url}", updates.len());

        let batch_size = config.batch_size.max(1);
        let feeder = in_sender.clone();
        let loader = tokio::spawn(async move {
            for chunk in updates.chunks(batch_size) {
                feeder
                    .send(chunk.to_vec())
                    .await
                    .map_err(|_| anyhow!("document intake closed while streaming"))?;
            }
            Ok(())
        });

        let (events, _) = broadcast::channel(8);
        Ok(Self {
            loader: Some(loader),
            document,
            in_sender,
            events,
            document_ready_fired: false,
            load_fired: false,
            url,
        })
    }

    /// Drive the session one tick: drain the document intake, finalize the
    /// loader if it is done, and announce lifecycle events.
    pub async fn update(&mut self) -> Result<(), Error> {
        self.document.update()?;
        self.finalize_loading_if_needed().await?;

        if self.document.end_seen() && !self.document_ready_fired {
            trace!("page: document structure ready for {}", self.url);
            let _ = self.events.send(LifecycleEvent::DocumentReady);
            self.document_ready_fired = true;
        }
        // PageLoaded requires readiness first; EndOfDocument is the last
        // update, so a finished loader plus a fired readiness event means
        // the intake is fully applied.
        if self.document_ready_fired && self.loader.is_none() && !self.load_fired {
            trace!("page: load complete for {}", self.url);
            let _ = self.events.send(LifecycleEvent::PageLoaded);
            self.load_fired = true;
        }
        Ok(())
    }

    /// Tick until the page load has been announced.
    pub async fn run_until_loaded(&mut self) -> Result<(), Error> {
        while !self.load_fired {
            self.update().await?;
            // Yield so the loader task can stream the next batches.
            tokio::time::sleep(core::time::Duration::from_millis(1)).await;
        }
        Ok(())
    }

    /// Finalize loading if the loader task has finished.
    async fn finalize_loading_if_needed(&mut self) -> Result<(), Error> {
        if self.loader.as_ref().is_some_and(JoinHandle::is_finished) {
            let loader = self
                .loader
                .take()
                .ok_or_else(|| anyhow!("Loader is finished and None!"))?;
            trace!("page: loader finished, finalizing");
            loader.await??;
        }
        Ok(())
    }

    /// Subscribe to lifecycle events. Subscribe before driving the session;
    /// events are not replayed.
    pub fn subscribe_events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Subscribe to the document's applied update batches.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<Vec<DocUpdate>> {
        self.document.subscribe()
    }

    /// Handle to the document's shared query index.
    pub fn shared_index(&self) -> SharedQueryIndex {
        self.document.shared_index()
    }

    /// Sender for external structural mutations (same intake the loader
    /// streams into).
    pub fn updater(&self) -> mpsc::Sender<Vec<DocUpdate>> {
        self.in_sender.clone()
    }

    /// Whether initial document-structure readiness has been announced.
    pub fn is_ready(&self) -> bool {
        self.document_ready_fired
    }

    /// Whether the full page load has been announced.
    pub fn is_loaded(&self) -> bool {
        self.load_fired
    }

    /// Number of element nodes currently in the document tree.
    pub fn element_count(&self) -> usize {
        self.document.element_count()
    }

    /// The URL this session was loaded from.
    pub fn url(&self) -> &Url {
        &self.url
    }
}
