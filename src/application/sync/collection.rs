//! Client-side state of one reorderable collection.
//!
//! The state machine is synchronous: it decides what to show, whether dragging is
//! allowed and which submission to send next. Network effects are left to the caller
//! (see [`super::CollectionSync`]).

use uuid::Uuid;

use crate::application::sync::source::{FetchSnapshot, SourceError, Submission};
use crate::domain::ordering::{
    CollectionVersion, FilterableItem, OrderedItem, ViewFilter, array_move, position_of,
    reorder_payload, sort_by_priority,
};

/// Result of a drag-end event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Nothing changed.
    Ignored,
    /// Mirror updated; submit this now.
    Submit(Submission),
    /// Mirror updated; a submission is in flight and this ordering will follow it.
    Queued,
}

/// What the caller must do after an in-flight submission settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The response belonged to an abandoned submission.
    Discarded,
    /// Confirmed; nothing else pending.
    Confirmed { version: CollectionVersion },
    /// Confirmed; the queued ordering must be sent next.
    Submit(Submission),
    /// Failed; the mirror went back to the last confirmed ordering.
    RolledBack,
    /// The mirror is stale and a fresh fetch is required.
    Refetch,
}

#[derive(Debug, Clone)]
struct Mirror<T> {
    items: Vec<T>,
    confirmed: Vec<T>,
    version: CollectionVersion,
    stale: bool,
}

#[derive(Debug, Clone)]
struct InFlight<T> {
    ticket: u64,
    ordering: Vec<T>,
}

#[derive(Debug)]
pub struct ReorderableCollection<T>
where
    T: OrderedItem + FilterableItem,
{
    filter: ViewFilter<T::Status>,
    snapshot: Option<FetchSnapshot<T>>,
    mirror: Option<Mirror<T>>,
    in_flight: Option<InFlight<T>>,
    queued: bool,
    next_ticket: u64,
}

impl<T> Default for ReorderableCollection<T>
where
    T: OrderedItem + FilterableItem,
{
    fn default() -> Self {
        Self {
            filter: ViewFilter::default(),
            snapshot: None,
            mirror: None,
            in_flight: None,
            queued: false,
            next_ticket: 1,
        }
    }
}

impl<T> ReorderableCollection<T>
where
    T: OrderedItem + FilterableItem,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> &ViewFilter<T::Status> {
        &self.filter
    }

    pub fn mirror_version(&self) -> Option<CollectionVersion> {
        self.mirror.as_ref().map(|mirror| mirror.version)
    }

    pub fn is_stale(&self) -> bool {
        self.mirror.as_ref().is_none_or(|mirror| mirror.stale)
    }

    pub fn has_pending_submission(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Record a fetch result. Unfiltered results re-seed the mirror unless a submission
    /// is in flight or the result is older than what the mirror already confirmed.
    pub fn apply_snapshot(&mut self, snapshot: FetchSnapshot<T>) {
        let seeds = snapshot.unfiltered
            && self.in_flight.is_none()
            && self.mirror.as_ref().is_none_or(|mirror| {
                mirror.stale || snapshot.version >= mirror.version
            });
        self.snapshot = Some(snapshot);
        if seeds {
            self.reseed();
        }
    }

    /// Replace the active filters. Returns `true` when a refetch is needed.
    pub fn set_filter(&mut self, filter: ViewFilter<T::Status>) -> bool {
        let was_active = self.filter.is_active();
        let search_changed = self.filter.search_term() != filter.search_term();
        self.filter = filter;

        if search_changed {
            if !self.filter.is_active() {
                self.mark_stale();
            }
            return true;
        }
        if was_active && !self.filter.is_active() {
            return self.reseed_or_stale();
        }
        false
    }

    /// Whether a drag handler should be attached.
    pub fn is_draggable(&self) -> bool {
        !self.filter.is_active() && self.mirror.as_ref().is_some_and(|mirror| !mirror.stale)
    }

    /// Items to render, in display order.
    pub fn view(&self) -> Vec<T> {
        if !self.filter.is_active()
            && let Some(mirror) = self.mirror.as_ref().filter(|mirror| !mirror.stale)
        {
            return mirror.items.clone();
        }

        self.snapshot
            .as_ref()
            .map(|snapshot| {
                snapshot
                    .items
                    .iter()
                    .filter(|item| self.filter.admits(*item))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Handle the end of a drag of `active` over `over`.
    pub fn drag_end(&mut self, active: Uuid, over: Option<Uuid>) -> DragOutcome {
        if !self.is_draggable() {
            return DragOutcome::Ignored;
        }
        let Some(over) = over else {
            return DragOutcome::Ignored;
        };
        if over == active {
            return DragOutcome::Ignored;
        }
        let Some(mirror) = self.mirror.as_mut() else {
            return DragOutcome::Ignored;
        };
        let (Some(from), Some(to)) = (
            position_of(&mirror.items, active),
            position_of(&mirror.items, over),
        ) else {
            return DragOutcome::Ignored;
        };
        if !array_move(&mut mirror.items, from, to) {
            return DragOutcome::Ignored;
        }

        if self.in_flight.is_some() {
            self.queued = true;
            return DragOutcome::Queued;
        }
        DragOutcome::Submit(self.start_submission())
    }

    /// Settle the in-flight submission identified by `ticket`.
    pub fn settle(
        &mut self,
        ticket: u64,
        result: Result<CollectionVersion, SourceError>,
    ) -> Settlement {
        let Some(in_flight) = self.in_flight.take_if(|in_flight| in_flight.ticket == ticket)
        else {
            return Settlement::Discarded;
        };
        let queued = std::mem::take(&mut self.queued);

        match result {
            Ok(version) => {
                let Some(mirror) = self.mirror.as_mut() else {
                    return Settlement::Refetch;
                };
                mirror.confirmed = in_flight.ordering;
                mirror.version = version;
                if mirror.stale {
                    Settlement::Refetch
                } else if queued {
                    Settlement::Submit(self.start_submission())
                } else {
                    Settlement::Confirmed { version }
                }
            }
            Err(SourceError::Conflict { .. }) => {
                self.mark_stale();
                Settlement::Refetch
            }
            Err(SourceError::Failed(_)) => {
                if queued {
                    self.mark_stale();
                    return Settlement::Refetch;
                }
                match self.mirror.as_mut() {
                    Some(mirror) => {
                        mirror.items = mirror.confirmed.clone();
                        Settlement::RolledBack
                    }
                    None => Settlement::Refetch,
                }
            }
        }
    }

    fn start_submission(&mut self) -> Submission {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let (ordering, base_version) = self
            .mirror
            .as_ref()
            .map(|mirror| (mirror.items.clone(), mirror.version))
            .unwrap_or_default();
        let items = reorder_payload(&ordering);
        self.in_flight = Some(InFlight { ticket, ordering });
        Submission {
            ticket,
            base_version,
            items,
        }
    }

    fn mark_stale(&mut self) {
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.stale = true;
        }
    }

    fn reseed(&mut self) {
        let Some(snapshot) = self.snapshot.as_ref().filter(|snapshot| snapshot.unfiltered) else {
            return;
        };
        let mut items = snapshot.items.to_vec();
        sort_by_priority(&mut items);
        self.mirror = Some(Mirror {
            confirmed: items.clone(),
            items,
            version: snapshot.version,
            stale: false,
        });
    }

    /// Returns `true` when the mirror could not be rebuilt from the latest snapshot.
    fn reseed_or_stale(&mut self) -> bool {
        let usable = self.in_flight.is_none()
            && self.snapshot.as_ref().is_some_and(|snapshot| {
                snapshot.unfiltered
                    && self
                        .mirror
                        .as_ref()
                        .is_none_or(|mirror| snapshot.version >= mirror.version)
            });
        if usable {
            self.reseed();
            false
        } else {
            self.mark_stale();
            self.in_flight.is_none()
        }
    }
}
