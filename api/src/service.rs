//! Versioned coverage service.
//!
//! Configurations are submitted from any thread and processed in order by a
//! single worker. Each submission gets a new version. The worker only ever
//! computes the newest version it knows about: queued updates are coalesced,
//! and a running pass is cancelled once a newer version is submitted. Finished
//! passes are published atomically as an `Arc<Snapshot>`; readers see either
//! the previous snapshot or the new one.
//!
//! Version assignment and publication share one lock. Versions enter the
//! queue in increasing order, and a snapshot is stored only while its version
//! is still the newest, so published versions never go backwards.

use crate::pipeline::*;
use arc_swap::ArcSwapOption;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use wavemap_core::config::*;
use wavemap_core::error::Error;

/// Outcome of a configuration version.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A snapshot for the version is now published.
    Published { version: u64 },

    /// The version was superseded before its snapshot was published.
    Discarded { version: u64 },

    /// The configuration was rejected; the previous snapshot stays published.
    Rejected { version: u64, error: Error },
}

impl Event {
    /// Returns the version the event refers to.
    pub fn version(&self) -> u64 {
        match self {
            Event::Published { version } => *version,
            Event::Discarded { version } => *version,
            Event::Rejected { version, .. } => *version,
        }
    }
}

/// Messages to the worker.
enum Command {
    Update(u64, Arc<Configuration>),
    Shutdown,
}

/// State shared between the service handle and its worker.
struct Shared {
    /// Newest submitted version.
    latest: AtomicU64,

    /// Held while assigning and enqueueing a version, and while publishing.
    ordering: Mutex<()>,

    /// Newest published snapshot.
    snapshot: ArcSwapOption<Snapshot>,

    /// Event subscribers.
    subscribers: Mutex<Vec<Sender<Event>>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
            ordering: Mutex::new(()),
            snapshot: ArcSwapOption::const_empty(),
            subscribers: Mutex::new(vec![]),
        }
    }

    /// Returns true if `version` is no longer the newest submission.
    fn superseded(&self, version: u64) -> bool {
        self.latest.load(Ordering::Acquire) != version
    }

    /// Stores `snapshot` unless a newer version was submitted. Returns true
    /// when it was published.
    fn publish(&self, snapshot: Snapshot) -> bool {
        let _guard = self.ordering.lock().unwrap_or_else(|e| e.into_inner());
        if self.superseded(snapshot.version) {
            return false;
        }
        self.snapshot.store(Some(Arc::new(snapshot)));
        true
    }

    /// Sends an event to every live subscriber, dropping closed ones.
    fn broadcast(&self, event: Event) {
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.retain(|tx| tx.send(event.clone()).is_ok()),
            Err(_) => error!("Subscriber list poisoned; dropping {:?}", event),
        }
    }
}

/// Computes and publishes coverage snapshots on a background worker.
pub struct CoverageService {
    /// Command queue to the worker.
    tx: Sender<Command>,

    /// State shared with the worker.
    shared: Arc<Shared>,

    /// Worker thread.
    worker: Option<JoinHandle<()>>,
}

impl CoverageService {
    /// Starts a service with its worker thread.
    ///
    /// * `options` - Evaluation options.
    pub fn new(options: Options) -> Self {
        Self::with_pipeline(Pipeline::new(options))
    }

    /// Starts a service around an existing pipeline.
    ///
    /// * `pipeline` - Pass pipeline run by the worker.
    pub fn with_pipeline(pipeline: Pipeline) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(Shared::new());

        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || run_worker(pipeline, rx, worker_shared));

        Self {
            tx,
            shared,
            worker: Some(worker),
        }
    }

    /// Submits a configuration and returns its version. Versions start at 1
    /// and increase with every submission.
    ///
    /// * `configuration` - The configuration.
    pub fn submit(&self, configuration: Configuration) -> u64 {
        let configuration = Arc::new(configuration);
        let _guard = self
            .shared
            .ordering
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let version = self.shared.latest.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Submitting version {}", version);
        if self.tx.send(Command::Update(version, configuration)).is_err() {
            error!("Coverage worker is gone; version {} dropped", version);
        }
        version
    }

    /// Returns the newest submitted version, 0 before any submission.
    pub fn latest_version(&self) -> u64 {
        self.shared.latest.load(Ordering::Acquire)
    }

    /// Returns the newest published snapshot.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.shared.snapshot.load_full()
    }

    /// Returns a receiver for all events emitted from now on.
    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = crossbeam_channel::unbounded();
        match self.shared.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(tx),
            Err(_) => error!("Subscriber list poisoned; subscription is inert"),
        }
        rx
    }
}

impl Drop for CoverageService {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Coverage worker panicked");
            }
        }
    }
}

/// Worker loop: block for a command, coalesce everything already queued, and
/// run a pass for the highest queued version.
fn run_worker(pipeline: Pipeline, rx: Receiver<Command>, shared: Arc<Shared>) {
    while let Ok(command) = rx.recv() {
        let mut update = match command {
            Command::Update(version, configuration) => (version, configuration),
            Command::Shutdown => break,
        };

        let mut shutdown = false;
        for command in rx.try_iter() {
            match command {
                Command::Update(version, configuration) => {
                    let dropped = if version > update.0 {
                        std::mem::replace(&mut update, (version, configuration)).0
                    } else {
                        version
                    };
                    debug!("Version {} coalesced into {}", dropped, update.0);
                    shared.broadcast(Event::Discarded { version: dropped });
                }
                Command::Shutdown => {
                    shutdown = true;
                    break;
                }
            }
        }
        if shutdown {
            break;
        }

        let (version, configuration) = update;
        run_pass(&pipeline, version, &configuration, &shared);
    }
    debug!("Coverage worker stopped");
}

/// Runs one pass and publishes or discards its result.
fn run_pass(pipeline: &Pipeline, version: u64, configuration: &Configuration, shared: &Shared) {
    if shared.superseded(version) {
        shared.broadcast(Event::Discarded { version });
        return;
    }

    let cancel = || shared.superseded(version);
    match pipeline.run_cancellable(version, configuration, &cancel) {
        Ok(Some(snapshot)) => {
            if shared.publish(snapshot) {
                info!("Published version {}", version);
                shared.broadcast(Event::Published { version });
            } else {
                debug!("Version {} superseded before publishing", version);
                shared.broadcast(Event::Discarded { version });
            }
        }
        Ok(None) => {
            debug!("Version {} superseded; discarded", version);
            shared.broadcast(Event::Discarded { version });
        }
        Err(error) => {
            warn!("Version {} rejected: {}", version, error);
            shared.broadcast(Event::Rejected { version, error });
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wavemap_core::geometry::*;
    use wavemap_core::scene::*;

    const TIMEOUT: Duration = Duration::from_secs(60);

    fn configuration(intensity: f32) -> Configuration {
        Configuration::new()
            .with_source(Source::new(Point3f::new(0.0, 1.5, 0.0), intensity))
            .with_resolution(8, 4)
    }

    #[test]
    fn versions_increase_from_one() {
        let service = CoverageService::new(Options::with_threads(1));
        assert_eq!(service.latest_version(), 0);
        assert!(service.snapshot().is_none());
        assert_eq!(service.submit(configuration(5.0)), 1);
        assert_eq!(service.submit(configuration(6.0)), 2);
        assert_eq!(service.latest_version(), 2);
    }

    #[test]
    fn single_submission_is_published() {
        let service = CoverageService::new(Options::with_threads(1));
        let events = service.subscribe();
        let version = service.submit(configuration(5.0));
        assert_eq!(
            events.recv_timeout(TIMEOUT),
            Ok(Event::Published { version })
        );
        let snapshot = service.snapshot().unwrap();
        assert_eq!(snapshot.version, version);
        assert_eq!(snapshot.volume.dims(), (8, 4, 8));
    }

    #[test]
    fn event_reports_its_version() {
        let e = Event::Rejected {
            version: 7,
            error: Error::ResourceExhausted { nodes: 2, limit: 1 },
        };
        assert_eq!(e.version(), 7);
        assert_eq!(Event::Discarded { version: 3 }.version(), 3);
    }

    /// Runs the worker over a fixed command queue with `latest` already
    /// submitted, returning the broadcast events and the final snapshot.
    fn run_queue(latest: u64, commands: Vec<Command>) -> (Vec<Event>, Option<Arc<Snapshot>>) {
        let shared = Arc::new(Shared::new());
        shared.latest.store(latest, Ordering::Release);
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        shared.subscribers.lock().unwrap().push(events_tx);

        let (tx, rx) = crossbeam_channel::unbounded();
        for command in commands {
            tx.send(command).unwrap();
        }
        drop(tx);

        run_worker(Pipeline::new(Options::with_threads(1)), rx, Arc::clone(&shared));
        (events_rx.try_iter().collect(), shared.snapshot.load_full())
    }

    fn update(version: u64) -> Command {
        Command::Update(version, Arc::new(configuration(5.0 + version as f32)))
    }

    #[test]
    fn coalescing_keeps_highest_version_regardless_of_queue_order() {
        let (events, snapshot) = run_queue(3, vec![update(2), update(3), update(1)]);
        assert_eq!(
            events,
            vec![
                Event::Discarded { version: 2 },
                Event::Discarded { version: 1 },
                Event::Published { version: 3 },
            ]
        );
        let snapshot = snapshot.unwrap();
        assert_eq!(snapshot.version, 3);
        assert_eq!(snapshot.configuration.scene.sources[0].intensity, 8.0);
    }

    #[test]
    fn newer_version_queued_first_still_publishes() {
        let (events, snapshot) = run_queue(2, vec![update(2), update(1)]);
        assert_eq!(
            events,
            vec![
                Event::Discarded { version: 1 },
                Event::Published { version: 2 },
            ]
        );
        assert_eq!(snapshot.map(|s| s.version), Some(2));
    }

    #[test]
    fn stale_version_is_never_published() {
        let (events, snapshot) = run_queue(3, vec![update(1)]);
        assert_eq!(events, vec![Event::Discarded { version: 1 }]);
        assert!(snapshot.is_none());
    }

    #[test]
    fn publish_rejects_superseded_snapshot() {
        let shared = Shared::new();
        shared.latest.store(2, Ordering::Release);
        let pipeline = Pipeline::new(Options::with_threads(1));

        let old = pipeline.run(1, &configuration(5.0)).unwrap();
        assert!(!shared.publish(old));
        assert!(shared.snapshot.load_full().is_none());

        let new = pipeline.run(2, &configuration(6.0)).unwrap();
        assert!(shared.publish(new));
        assert_eq!(shared.snapshot.load_full().map(|s| s.version), Some(2));
    }

    #[test]
    fn drop_stops_worker() {
        let service = CoverageService::new(Options::with_threads(1));
        service.submit(configuration(5.0));
        drop(service);
    }
}
