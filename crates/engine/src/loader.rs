use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context as _;
use newsstand_core::LoadTicket;

use crate::{DocumentRenderer, resolve_locator};

/// Result of one document load, reported exactly once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEvent {
    pub ticket: LoadTicket,
    pub outcome: Result<u32, String>,
}

struct LoadJob {
    ticket: LoadTicket,
    source: PathBuf,
}

/// Background page-count loader. The renderer lives on the worker thread.
pub struct Loader {
    jobs: Option<Sender<LoadJob>>,
    events_tx: Sender<LoadEvent>,
    events: Receiver<LoadEvent>,
    handle: Option<JoinHandle<()>>,
}

impl Loader {
    pub fn spawn<R, F>(make_renderer: F) -> anyhow::Result<Self>
    where
        R: DocumentRenderer,
        F: FnOnce() -> R + Send + 'static,
    {
        let (jobs_tx, jobs_rx) = mpsc::channel::<LoadJob>();
        let (events_tx, events) = mpsc::channel::<LoadEvent>();
        let worker_events = events_tx.clone();

        let handle = std::thread::Builder::new()
            .name("newsstand-loader".to_string())
            .spawn(move || {
                let renderer = make_renderer();
                for job in jobs_rx {
                    let counted = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        renderer.page_count(&job.source)
                    }));
                    let outcome = match counted {
                        Ok(Ok(0)) => Err("document has no pages".to_string()),
                        Ok(Ok(count)) => Ok(count),
                        Ok(Err(err)) => Err(format!("{err:#}")),
                        Err(panic) => {
                            let reason = panic_reason(panic.as_ref());
                            tracing::error!(source = %job.source.display(), "renderer crashed: {reason}");
                            Err(format!("renderer crashed: {reason}"))
                        }
                    };
                    let event = LoadEvent {
                        ticket: job.ticket,
                        outcome,
                    };
                    if worker_events.send(event).is_err() {
                        break;
                    }
                }
            })
            .context("spawn loader thread")?;

        Ok(Self {
            jobs: Some(jobs_tx),
            events_tx,
            events,
            handle: Some(handle),
        })
    }

    /// Queues a load. Locators that cannot be resolved fail immediately.
    pub fn request(&self, ticket: LoadTicket, library_root: &Path, locator: &str) {
        tracing::debug!(document = %ticket.document_id, generation = ticket.generation, %locator, "load requested");
        let source = match resolve_locator(library_root, locator) {
            Ok(source) => source,
            Err(err) => {
                self.report(LoadEvent {
                    ticket,
                    outcome: Err(format!("{err:#}")),
                });
                return;
            }
        };

        let job = LoadJob { ticket, source };
        let Some(jobs) = self.jobs.as_ref() else {
            return;
        };
        if let Err(mpsc::SendError(job)) = jobs.send(job) {
            self.report(LoadEvent {
                ticket: job.ticket,
                outcome: Err("loader stopped".to_string()),
            });
        }
    }

    fn report(&self, event: LoadEvent) {
        // the receiver lives in `self`, so this cannot fail
        let _ = self.events_tx.send(event);
    }

    /// Drains finished loads without blocking.
    pub fn poll(&self) -> Vec<LoadEvent> {
        self.events.try_iter().collect()
    }

    pub fn wait(&self, timeout: Duration) -> Option<LoadEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

fn panic_reason(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
