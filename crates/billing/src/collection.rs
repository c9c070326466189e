//! Ordered item collections
//!
//! Insertion order is preserved because it drives display order. Merging walks
//! the receiver first and appends items unique to the other collection after.

use std::collections::HashSet;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::comparator::MergeComparator;
use crate::item::{Item, ItemKey};

/// Rounded totals of a collection, consumed by presenters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Ordered sequence of items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemCollection {
    items: Vec<Item>,
}

impl ItemCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Remove and return the first item with `key`
    pub fn remove(&mut self, key: &ItemKey) -> Option<Item> {
        let index = self
            .items
            .iter()
            .position(|item| item.key() == Some(key))?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, key: &ItemKey) -> Option<&Item> {
        self.items.iter().find(|item| item.key() == Some(key))
    }

    pub fn contains_key(&self, key: &ItemKey) -> bool {
        self.get(key).is_some()
    }

    /// Keys of keyed items, in order
    pub fn keys(&self) -> impl Iterator<Item = &ItemKey> + '_ {
        self.items.iter().filter_map(Item::key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Merge `other` into a new collection
    ///
    /// Every keyed item of `self` with a counterpart in `other` is folded with
    /// `comparator`. Unmatched and unkeyed items from both sides pass through
    /// unchanged: first those of `self`, then those of `other`.
    pub fn merge<C>(&self, other: &ItemCollection, comparator: &C) -> ItemCollection
    where
        C: MergeComparator + ?Sized,
    {
        let mut matched: HashSet<ItemKey> = HashSet::new();
        let mut merged = ItemCollection::new();

        for item in &self.items {
            let counterpart = item
                .key()
                .filter(|key| !matched.contains(*key))
                .and_then(|key| other.get(key));
            match counterpart {
                Some(new) => {
                    if let Some(key) = item.key() {
                        matched.insert(*key);
                    }
                    merged.push(comparator.merge(item, new));
                }
                None => merged.push(item.clone()),
            }
        }

        for item in &other.items {
            let consumed = item.key().is_some_and(|key| matched.contains(key));
            if !consumed {
                merged.push(item.clone());
            }
        }

        merged
    }

    /// Sum of item totals rounded half away from zero to `precision` places
    pub fn totals(&self, precision: u32) -> Totals {
        let round = |value: Decimal| {
            value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
        };
        let sum = |f: fn(&Item) -> Decimal| -> Decimal { self.items.iter().map(f).sum() };

        Totals {
            subtotal: round(sum(Item::subtotal)),
            discount: round(sum(Item::discount_amount)),
            tax: round(sum(Item::tax_amount)),
            total: round(sum(Item::total)),
        }
    }
}

impl<'a> IntoIterator for &'a ItemCollection {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for ItemCollection {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl FromIterator<Item> for ItemCollection {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
