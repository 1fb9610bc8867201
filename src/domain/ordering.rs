//! Ordering algebra shared by every reorderable collection.
//!
//! A collection is a sequence of items carrying `(id, order_priority)`. Priorities only
//! need to be relatively ordered; a reorder submission always rewrites them as the
//! contiguous range `0..N` in sequence order.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;

pub const REORDER_ITEM_FIELDS_MESSAGE: &str = "Each item must have 'id' and 'order_priority' fields";

/// An element of an ordered collection.
pub trait OrderedItem: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
    fn order_priority(&self) -> i32;
}

/// Client-side predicates a collection view can be narrowed by.
pub trait FilterableItem {
    type Status: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    fn matches_status(&self, status: &Self::Status) -> bool;

    fn matches_category(&self, _category: &str) -> bool {
        false
    }
}

/// Active filters of a collection view. The default value is the unfiltered view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewFilter<S> {
    pub search: Option<String>,
    pub status: Option<S>,
    pub category: Option<String>,
}

impl<S> Default for ViewFilter<S> {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            category: None,
        }
    }
}

impl<S> ViewFilter<S> {
    pub fn is_active(&self) -> bool {
        self.search
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty())
            || self.status.is_some()
            || self
                .category
                .as_deref()
                .is_some_and(|value| !value.trim().is_empty())
    }

    /// The search term, trimmed, when one is set.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn category_term(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn admits<T>(&self, item: &T) -> bool
    where
        T: FilterableItem<Status = S>,
    {
        let status_ok = self
            .status
            .as_ref()
            .is_none_or(|status| item.matches_status(status));
        let category_ok = self
            .category_term()
            .is_none_or(|category| item.matches_category(category));
        status_ok && category_ok
    }
}

/// One `(id, order_priority)` pair of a reorder submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderItem {
    pub id: Uuid,
    pub order_priority: i32,
}

/// Wire shape of a reorder item before presence checks.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawReorderItem {
    pub id: Option<Uuid>,
    pub order_priority: Option<i32>,
}

impl From<ReorderItem> for RawReorderItem {
    fn from(item: ReorderItem) -> Self {
        Self {
            id: Some(item.id),
            order_priority: Some(item.order_priority),
        }
    }
}

/// Monotonic version of a server-side collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionVersion(pub u64);

impl CollectionVersion {
    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Strong entity tag for the collection listing.
    pub fn etag(self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Parse an entity tag produced by [`CollectionVersion::etag`]; weak tags are accepted.
    pub fn from_etag(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let trimmed = trimmed.strip_prefix("W/").unwrap_or(trimmed);
        let inner = trimmed
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(trimmed);
        inner.parse::<u64>().ok().map(Self)
    }
}

impl fmt::Display for CollectionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CollectionVersion {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

/// Relocate the element at `from` to index `to`, shifting everything in between.
///
/// Out-of-range indices leave the sequence untouched and return `false`.
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    if from == to {
        return true;
    }
    let moved = items.remove(from);
    items.insert(to, moved);
    true
}

pub fn position_of<T: OrderedItem>(items: &[T], id: Uuid) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

/// Full reorder payload: every item, priorities `0..N` in sequence order.
pub fn reorder_payload<T: OrderedItem>(items: &[T]) -> Vec<ReorderItem> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| ReorderItem {
            id: item.id(),
            order_priority: i32::try_from(index).unwrap_or(i32::MAX),
        })
        .collect()
}

/// Stable sort by priority; ties keep their incoming order.
pub fn sort_by_priority<T: OrderedItem>(items: &mut [T]) {
    items.sort_by_key(OrderedItem::order_priority);
}

/// Check presence of both fields on every item.
pub fn parse_reorder_items(raw: Vec<RawReorderItem>) -> Result<Vec<ReorderItem>, DomainError> {
    raw.into_iter()
        .map(|item| match (item.id, item.order_priority) {
            (Some(id), Some(order_priority)) => Ok(ReorderItem { id, order_priority }),
            _ => Err(DomainError::validation(REORDER_ITEM_FIELDS_MESSAGE)),
        })
        .collect()
}

pub fn ensure_unique_ids(items: &[ReorderItem]) -> Result<(), DomainError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id) {
            return Err(DomainError::validation(format!(
                "item `{}` appears more than once",
                item.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: Uuid,
        label: &'static str,
        priority: i32,
    }

    impl OrderedItem for Row {
        fn id(&self) -> Uuid {
            self.id
        }

        fn order_priority(&self) -> i32 {
            self.priority
        }
    }

    fn rows(labels: &[&'static str]) -> Vec<Row> {
        labels
            .iter()
            .enumerate()
            .map(|(index, label)| Row {
                id: Uuid::new_v4(),
                label,
                priority: index as i32 * 10,
            })
            .collect()
    }

    fn labels(items: &[Row]) -> Vec<&'static str> {
        items.iter().map(|row| row.label).collect()
    }

    #[test]
    fn dragging_b_onto_d_moves_it_to_the_end() {
        let mut items = rows(&["A", "B", "C", "D"]);
        let from = position_of(&items, items[1].id).expect("B");
        let to = position_of(&items, items[3].id).expect("D");

        assert!(array_move(&mut items, from, to));
        assert_eq!(labels(&items), ["A", "C", "D", "B"]);

        let payload = reorder_payload(&items);
        let expected: Vec<(Uuid, i32)> = items
            .iter()
            .enumerate()
            .map(|(index, row)| (row.id, index as i32))
            .collect();
        let actual: Vec<(Uuid, i32)> = payload
            .iter()
            .map(|item| (item.id, item.order_priority))
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn every_single_move_keeps_members_and_relative_order() {
        let base = rows(&["A", "B", "C", "D", "E", "F"]);
        for from in 0..base.len() {
            for to in 0..base.len() {
                let mut items = base.clone();
                assert!(array_move(&mut items, from, to));
                assert_eq!(items.len(), base.len());
                assert_eq!(items[to], base[from]);

                let others_before: Vec<_> = base
                    .iter()
                    .filter(|row| row.id != base[from].id)
                    .map(|row| row.label)
                    .collect();
                let others_after: Vec<_> = items
                    .iter()
                    .filter(|row| row.id != base[from].id)
                    .map(|row| row.label)
                    .collect();
                assert_eq!(others_before, others_after);

                let payload = reorder_payload(&items);
                assert_eq!(payload.len(), items.len());
                assert!(
                    payload
                        .iter()
                        .enumerate()
                        .all(|(index, item)| item.order_priority == index as i32)
                );
            }
        }
    }

    #[test]
    fn out_of_range_move_is_rejected() {
        let mut items = rows(&["A", "B"]);
        assert!(!array_move(&mut items, 0, 2));
        assert_eq!(labels(&items), ["A", "B"]);
    }

    #[test]
    fn sort_is_stable_for_equal_priorities() {
        let mut items = rows(&["A", "B", "C"]);
        for row in &mut items {
            row.priority = 0;
        }
        items[2].priority = -1;
        sort_by_priority(&mut items);
        assert_eq!(labels(&items), ["C", "A", "B"]);
    }

    #[test]
    fn parse_requires_both_fields() {
        let err = parse_reorder_items(vec![RawReorderItem {
            id: Some(Uuid::new_v4()),
            order_priority: None,
        }])
        .expect_err("missing priority");
        assert_eq!(err, DomainError::validation(REORDER_ITEM_FIELDS_MESSAGE));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let id = Uuid::new_v4();
        let items = [
            ReorderItem {
                id,
                order_priority: 0,
            },
            ReorderItem {
                id,
                order_priority: 1,
            },
        ];
        assert!(ensure_unique_ids(&items).is_err());
    }

    #[test]
    fn etag_round_trips_and_accepts_weak_tags() {
        let version = CollectionVersion(42);
        assert_eq!(version.etag(), "\"42\"");
        assert_eq!(CollectionVersion::from_etag("\"42\""), Some(version));
        assert_eq!(CollectionVersion::from_etag("W/\"42\""), Some(version));
        assert_eq!(CollectionVersion::from_etag("nope"), None);
    }
}
