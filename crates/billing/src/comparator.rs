//! Item comparators used to merge two collections
//!
//! A comparator folds a matched old/new pair into a single item. The
//! [`ItemComparator`] is driven by two callbacks: a price combiner receiving
//! `(old_price, new_price)` and a description combiner receiving
//! `(old_meta, new_meta)`.

use rust_decimal::Decimal;

use crate::item::{Item, ItemMeta};

/// Folds a matched pair of items into one
pub trait MergeComparator {
    fn merge(&self, old: &Item, new: &Item) -> Item;
}

/// Callback-driven comparator
pub struct ItemComparator<P, D>
where
    P: Fn(Decimal, Decimal) -> Decimal,
    D: Fn(Option<&ItemMeta>, Option<&ItemMeta>) -> String,
{
    price: P,
    description: D,
}

impl<P, D> ItemComparator<P, D>
where
    P: Fn(Decimal, Decimal) -> Decimal,
    D: Fn(Option<&ItemMeta>, Option<&ItemMeta>) -> String,
{
    pub fn new(price: P, description: D) -> Self {
        Self { price, description }
    }
}

impl<P, D> MergeComparator for ItemComparator<P, D>
where
    P: Fn(Decimal, Decimal) -> Decimal,
    D: Fn(Option<&ItemMeta>, Option<&ItemMeta>) -> String,
{
    /// The merged item keeps the shared key and takes discounts, taxes and
    /// meta from the new side. Meta falls back to the old side when the new
    /// item is plain.
    fn merge(&self, old: &Item, new: &Item) -> Item {
        let price = (self.price)(old.price(), new.price());
        let description = (self.description)(old.meta(), new.meta());
        let meta = new.meta().or_else(|| old.meta()).cloned();

        Item::new(new.key().or_else(|| old.key()).copied(), price)
            .with_description(description)
            .with_discounts(new.discounts().to_vec())
            .with_taxes(new.taxes().to_vec())
            .with_meta(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{FeeType, ItemKey, ItemState, ItemType, MetaRefs};
    use crate::pricing::Discount;
    use rust_decimal_macros::dec;
    use tallyhost_shared::{PackageId, ServiceId, Term};

    fn meta(name: &str, state: ItemState) -> ItemMeta {
        ItemMeta::new(
            FeeType::Recurring,
            ItemType::Package,
            MetaRefs {
                service_id: Some(ServiceId(1)),
                package_id: PackageId(1),
                package_name: name.to_string(),
                term: Term::monthly(),
                qty: 1,
                option: None,
            },
        )
        .with_state(state)
    }

    #[test]
    fn test_merge_uses_callbacks_and_new_side() {
        let key = ItemKey::service(ServiceId(1));
        let old = Item::keyed(key, dec!(10))
            .with_discounts(vec![Discount::percent(dec!(5))])
            .with_meta(Some(meta("Basic", ItemState::Unchanged)));
        let new = Item::keyed(key, dec!(15))
            .with_discounts(vec![Discount::percent(dec!(10))])
            .with_meta(Some(meta("Pro", ItemState::Updated)));

        let comparator = ItemComparator::new(
            |old, new| new - old,
            |old: Option<&ItemMeta>, new: Option<&ItemMeta>| {
                format!(
                    "{} -> {}",
                    old.map_or("?", |m| m.refs.package_name.as_str()),
                    new.map_or("?", |m| m.refs.package_name.as_str())
                )
            },
        );

        let merged = comparator.merge(&old, &new);
        assert_eq!(merged.key(), Some(&key));
        assert_eq!(merged.price(), dec!(5));
        assert_eq!(merged.description(), "Basic -> Pro");
        assert_eq!(merged.discounts(), &[Discount::percent(dec!(10))]);
        assert_eq!(merged.state(), Some(ItemState::Updated));
    }

    #[test]
    fn test_merge_falls_back_to_old_meta() {
        let key = ItemKey::service(ServiceId(1));
        let old = Item::keyed(key, dec!(4)).with_meta(Some(meta("Basic", ItemState::Removed)));
        let new = Item::keyed(key, dec!(0));

        let comparator = ItemComparator::new(|old, new| new - old, |_, _| String::new());
        let merged = comparator.merge(&old, &new);
        assert_eq!(merged.price(), dec!(-4));
        assert_eq!(merged.state(), Some(ItemState::Removed));
    }
}
