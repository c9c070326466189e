//! Pairing stage
//!
//! Equalizes the key sets of the old and new collections by synthesizing a
//! zero-price counterpart for every key present on only one side, and tags
//! each new-side item with its lifecycle state. Unkeyed items are left out of
//! pairing entirely.

use rust_decimal::Decimal;

use crate::collection::ItemCollection;
use crate::item::{Item, ItemKey, ItemState};

/// Old and new collections sharing the same key set
#[derive(Debug, Clone, Default)]
pub struct Paired {
    pub old: ItemCollection,
    pub new: ItemCollection,
}

/// Zero-price stand-in for an old item dropped by the change
///
/// Keeps the old discounts and taxes so the merged delta credits them too.
fn removed_placeholder(key: ItemKey, old: &Item) -> Item {
    Item::keyed(key, Decimal::ZERO)
        .with_discounts(old.discounts().to_vec())
        .with_taxes(old.taxes().to_vec())
        .with_meta(old.meta().cloned())
        .with_state(ItemState::Removed)
}

/// Pair `old` with an already re-keyed `new`
pub fn pair(old: &ItemCollection, new: &ItemCollection) -> Paired {
    let mut paired_old = old.clone();
    let mut paired_new = ItemCollection::new();

    for item in new {
        let tagged = match item.key() {
            Some(key) if old.contains_key(key) => item.clone().with_state(ItemState::Updated),
            Some(key) => {
                paired_old.push(Item::keyed(*key, Decimal::ZERO));
                item.clone().with_state(ItemState::Added)
            }
            None => item.clone(),
        };
        paired_new.push(tagged);
    }

    for item in old {
        if let Some(key) = item.key() {
            if !new.contains_key(key) {
                paired_new.push(removed_placeholder(*key, item));
            }
        }
    }

    Paired {
        old: paired_old,
        new: paired_new,
    }
}
