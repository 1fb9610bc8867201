//! Optimistic drag-reorder synchronization for ordered collections.
//!
//! [`ReorderableCollection`] keeps a local mirror of the server ordering, seeded from
//! unfiltered fetches, and decides what each drag produces. [`CollectionSync`] drives it
//! against a [`CollectionSource`], serializing submissions so that at most one is in
//! flight per collection.

mod collection;
mod driver;
mod lock;
mod source;

pub use collection::{DragOutcome, ReorderableCollection, Settlement};
pub use driver::{CollectionSync, SyncEvent};
pub use source::{CollectionSource, FetchQuery, FetchSnapshot, SourceError, Submission};
