use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::sync::collection::{DragOutcome, ReorderableCollection, Settlement};
use crate::application::sync::lock::state_lock;
use crate::application::sync::source::{
    CollectionSource, FetchQuery, FetchSnapshot, SourceError, Submission,
};
use crate::domain::ordering::{CollectionVersion, FilterableItem, OrderedItem, ViewFilter};

/// Progress reported by [`CollectionSync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Refreshed {
        version: CollectionVersion,
        unfiltered: bool,
    },
    FetchFailed {
        message: String,
    },
    Submitted {
        ticket: u64,
        base_version: CollectionVersion,
    },
    Confirmed {
        version: CollectionVersion,
    },
    RolledBack {
        message: String,
    },
    /// The mirror can no longer be trusted; a refetch has been started.
    Stale,
}

struct Shared<T, S>
where
    T: OrderedItem + FilterableItem,
{
    source: S,
    state: Mutex<ReorderableCollection<T>>,
    events: mpsc::UnboundedSender<SyncEvent>,
}

/// Async driver around [`ReorderableCollection`].
///
/// Drag handling is synchronous; submissions and refetches run on spawned tasks that
/// hold only weak references, so dropping the driver abandons their results.
pub struct CollectionSync<T, S>
where
    T: OrderedItem + FilterableItem,
    S: CollectionSource<T>,
{
    shared: Arc<Shared<T, S>>,
}

impl<T, S> CollectionSync<T, S>
where
    T: OrderedItem + FilterableItem,
    S: CollectionSource<T>,
{
    pub fn new(source: S) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            source,
            state: Mutex::new(ReorderableCollection::new()),
            events,
        });
        (Self { shared }, receiver)
    }

    /// Fetch with the current server-side filters and apply the result.
    pub async fn refresh(&self) -> Result<CollectionVersion, SourceError> {
        let query = self.shared.query();
        let result = self.shared.source.fetch(&query).await;
        self.shared.apply_fetch(result)
    }

    pub fn view(&self) -> Vec<T> {
        state_lock(&self.shared.state, "view").view()
    }

    pub fn is_draggable(&self) -> bool {
        state_lock(&self.shared.state, "is_draggable").is_draggable()
    }

    pub fn mirror_version(&self) -> Option<CollectionVersion> {
        state_lock(&self.shared.state, "mirror_version").mirror_version()
    }

    pub fn has_pending_submission(&self) -> bool {
        state_lock(&self.shared.state, "has_pending_submission").has_pending_submission()
    }

    pub fn set_filter(&self, filter: ViewFilter<T::Status>) {
        let refetch = state_lock(&self.shared.state, "set_filter").set_filter(filter);
        if refetch {
            spawn_refresh(&self.shared);
        }
    }

    /// Apply a drop locally and send the new ordering in the background.
    pub fn drag_end(&self, active: Uuid, over: Option<Uuid>) -> DragOutcome {
        let outcome = state_lock(&self.shared.state, "drag_end").drag_end(active, over);
        if let DragOutcome::Submit(submission) = &outcome {
            spawn_submit(&self.shared, submission.clone());
        }
        outcome
    }
}

impl<T, S> Shared<T, S>
where
    T: OrderedItem + FilterableItem,
    S: CollectionSource<T>,
{
    fn query(&self) -> FetchQuery {
        let state = state_lock(&self.state, "query");
        FetchQuery {
            search: state.filter().search_term().map(str::to_string),
        }
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }

    fn apply_fetch(
        &self,
        result: Result<FetchSnapshot<T>, SourceError>,
    ) -> Result<CollectionVersion, SourceError> {
        match result {
            Ok(snapshot) => {
                let version = snapshot.version;
                let unfiltered = snapshot.unfiltered;
                state_lock(&self.state, "apply_snapshot").apply_snapshot(snapshot);
                self.emit(SyncEvent::Refreshed {
                    version,
                    unfiltered,
                });
                Ok(version)
            }
            Err(err) => {
                warn!(
                    target = "lightfield::application::sync",
                    error = %err,
                    "Collection fetch failed"
                );
                self.emit(SyncEvent::FetchFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

fn spawn_submit<T, S>(shared: &Arc<Shared<T, S>>, submission: Submission)
where
    T: OrderedItem + FilterableItem,
    S: CollectionSource<T>,
{
    let weak: Weak<Shared<T, S>> = Arc::downgrade(shared);
    let source = shared.source.clone();
    shared.emit(SyncEvent::Submitted {
        ticket: submission.ticket,
        base_version: submission.base_version,
    });

    tokio::spawn(async move {
        let result = source.submit(&submission).await;
        let Some(shared) = weak.upgrade() else {
            debug!(
                target = "lightfield::application::sync",
                ticket = submission.ticket,
                "Collection dropped before submission settled"
            );
            return;
        };

        let failure = result.as_ref().err().map(ToString::to_string);
        let settlement = state_lock(&shared.state, "settle").settle(submission.ticket, result);
        match settlement {
            Settlement::Discarded => {}
            Settlement::Confirmed { version } => shared.emit(SyncEvent::Confirmed { version }),
            Settlement::Submit(next) => spawn_submit(&shared, next),
            Settlement::RolledBack => {
                warn!(
                    target = "lightfield::application::sync",
                    ticket = submission.ticket,
                    error = failure.as_deref().unwrap_or_default(),
                    "Reorder submission failed; restored confirmed order"
                );
                shared.emit(SyncEvent::RolledBack {
                    message: failure.unwrap_or_default(),
                });
            }
            Settlement::Refetch => {
                shared.emit(SyncEvent::Stale);
                spawn_refresh(&shared);
            }
        }
    });
}

fn spawn_refresh<T, S>(shared: &Arc<Shared<T, S>>)
where
    T: OrderedItem + FilterableItem,
    S: CollectionSource<T>,
{
    let weak: Weak<Shared<T, S>> = Arc::downgrade(shared);
    let source = shared.source.clone();
    let query = shared.query();

    tokio::spawn(async move {
        let result = source.fetch(&query).await;
        if let Some(shared) = weak.upgrade() {
            let _ = shared.apply_fetch(result);
        }
    });
}
