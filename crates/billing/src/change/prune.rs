//! Fee and noise pruning
//!
//! Drops merged lines that are present but must not be billed. Each meta item
//! is checked against the rule table below; any single match drops it. Plain
//! items are never pruned.
//!
//! | fee           | state             | rule                                         |
//! |---------------|-------------------|----------------------------------------------|
//! | setup, cancel | updated, removed  | fees never apply to a continuing item        |
//! | cancel        | added             | new items never owe a cancellation fee       |
//! | setup         | any               | dropped when the price is zero or negative   |
//! | option setup  | any               | dropped when its option line was not added   |
//! | option        | updated           | dropped when the price delta is zero         |

use std::collections::HashMap;

use crate::collection::ItemCollection;
use crate::item::{FeeType, Item, ItemKey, ItemState, ItemType};

/// Why a line was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PruneRule {
    /// Setup or cancel fee on an updated or removed item
    ContinuingFee,
    /// Cancellation fee on a newly added item
    NewItemCancelFee,
    /// Setup fee that charges nothing
    NonPositiveSetupFee,
    /// Setup fee of an option that already existed
    ExistingOptionSetupFee,
    /// Option updated without a price change
    UnchangedOption,
}

impl std::fmt::Display for PruneRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContinuingFee => write!(f, "continuing_fee"),
            Self::NewItemCancelFee => write!(f, "new_item_cancel_fee"),
            Self::NonPositiveSetupFee => write!(f, "non_positive_setup_fee"),
            Self::ExistingOptionSetupFee => write!(f, "existing_option_setup_fee"),
            Self::UnchangedOption => write!(f, "unchanged_option"),
        }
    }
}

/// Lifecycle state of every keyed meta item
fn states(items: &ItemCollection) -> HashMap<ItemKey, ItemState> {
    items
        .iter()
        .filter_map(|item| Some((*item.key()?, item.state()?)))
        .collect()
}

/// Rule that drops `item`, if any
///
/// `states` holds the lifecycle state of every keyed line in the collection
/// being pruned; it is used to find an option setup fee's sibling line.
pub fn prune_rule(item: &Item, states: &HashMap<ItemKey, ItemState>) -> Option<PruneRule> {
    use FeeType::{Cancel, Recurring, Setup};
    use ItemState::{Added, Removed, Unchanged, Updated};

    let meta = item.meta()?;
    let price = item.price();
    let sibling_exists = || {
        item.key()
            .and_then(|key| states.get(&key.without_fee()))
            .is_some_and(|state| *state != Added)
    };

    match (meta.fee, meta.state, meta.item_type) {
        (Setup | Cancel, Updated | Removed, _) => Some(PruneRule::ContinuingFee),
        (Cancel, Added, _) => Some(PruneRule::NewItemCancelFee),
        (Setup, _, _) if price <= rust_decimal::Decimal::ZERO => {
            Some(PruneRule::NonPositiveSetupFee)
        }
        (Setup, _, ItemType::Option) if sibling_exists() => {
            Some(PruneRule::ExistingOptionSetupFee)
        }
        (_, Updated, ItemType::Option) if price.is_zero() => Some(PruneRule::UnchangedOption),
        (Recurring, _, _) | (Setup, _, _) | (Cancel, Unchanged, _) => None,
    }
}

/// Remove every line matched by a prune rule
pub fn prune(items: &ItemCollection) -> ItemCollection {
    let states = states(items);

    items
        .iter()
        .filter(|item| match prune_rule(item, &states) {
            Some(rule) => {
                tracing::debug!(
                    key = ?item.key().map(ToString::to_string),
                    price = %item.price(),
                    rule = %rule,
                    "Pruned change line"
                );
                false
            }
            None => true,
        })
        .cloned()
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::item::{ItemMeta, KeyFee, MetaRefs};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tallyhost_shared::{OptionId, PackageId, ServiceId, Term};

    fn line(key: ItemKey, price: Decimal, state: ItemState) -> Item {
        let item_type = if key.option.is_some() {
            ItemType::Option
        } else {
            ItemType::Package
        };
        let meta = ItemMeta::new(
            key.fee.into(),
            item_type,
            MetaRefs {
                service_id: Some(ServiceId(1)),
                package_id: PackageId(1),
                package_name: "Basic".to_string(),
                term: Term::monthly(),
                qty: 1,
                option: None,
            },
        )
        .with_state(state);
        Item::keyed(key, price).with_meta(Some(meta))
    }

    fn package(fee: KeyFee) -> ItemKey {
        ItemKey::service(ServiceId(1)).with_fee(fee)
    }

    fn option(fee: KeyFee) -> ItemKey {
        ItemKey::service(ServiceId(1))
            .with_option(OptionId(4))
            .with_fee(fee)
    }

    fn rule_for(item: &Item, others: &[Item]) -> Option<PruneRule> {
        let collection: ItemCollection = others
            .iter()
            .cloned()
            .chain(std::iter::once(item.clone()))
            .collect();
        prune_rule(item, &states(&collection))
    }

    #[test]
    fn test_fees_on_continuing_items() {
        for state in [ItemState::Updated, ItemState::Removed] {
            for fee in [KeyFee::Setup, KeyFee::Cancel] {
                assert_eq!(
                    rule_for(&line(package(fee), dec!(10), state), &[]),
                    Some(PruneRule::ContinuingFee)
                );
            }
        }
    }

    #[test]
    fn test_cancel_fee_on_added_item() {
        assert_eq!(
            rule_for(&line(package(KeyFee::Cancel), dec!(10), ItemState::Added), &[]),
            Some(PruneRule::NewItemCancelFee)
        );
    }

    #[test]
    fn test_non_positive_setup_fee() {
        assert_eq!(
            rule_for(&line(package(KeyFee::Setup), dec!(0), ItemState::Added), &[]),
            Some(PruneRule::NonPositiveSetupFee)
        );
        assert_eq!(
            rule_for(&line(package(KeyFee::Setup), dec!(25), ItemState::Added), &[]),
            None
        );
    }

    #[test]
    fn test_option_setup_fee_needs_added_sibling() {
        let setup = line(option(KeyFee::Setup), dec!(2), ItemState::Added);

        let added = line(option(KeyFee::Recurring), dec!(3), ItemState::Added);
        assert_eq!(rule_for(&setup, &[added]), None);

        let updated = line(option(KeyFee::Recurring), dec!(3), ItemState::Updated);
        assert_eq!(
            rule_for(&setup, &[updated]),
            Some(PruneRule::ExistingOptionSetupFee)
        );

        // No sibling at all: nothing to compare against
        assert_eq!(rule_for(&setup, &[]), None);
    }

    #[test]
    fn test_unchanged_option() {
        let unchanged = line(option(KeyFee::Recurring), dec!(0), ItemState::Updated);
        assert_eq!(rule_for(&unchanged, &[]), Some(PruneRule::UnchangedOption));

        let changed = line(option(KeyFee::Recurring), dec!(1), ItemState::Updated);
        assert_eq!(rule_for(&changed, &[]), None);

        // Unchanged package lines stay visible
        let package_line = line(package(KeyFee::Recurring), dec!(0), ItemState::Updated);
        assert_eq!(rule_for(&package_line, &[]), None);
    }

    #[test]
    fn test_plain_items_never_pruned() {
        let plain = Item::keyed(package(KeyFee::Cancel), dec!(5));
        assert_eq!(rule_for(&plain, &[]), None);
    }

    #[test]
    fn test_prune_keeps_order_and_survivors() {
        let items: ItemCollection = vec![
            line(package(KeyFee::Recurring), dec!(5), ItemState::Updated),
            line(package(KeyFee::Setup), dec!(0), ItemState::Updated),
            line(package(KeyFee::Cancel), dec!(0), ItemState::Updated),
            line(option(KeyFee::Recurring), dec!(3), ItemState::Added),
            line(option(KeyFee::Setup), dec!(2), ItemState::Added),
            line(option(KeyFee::Cancel), dec!(0), ItemState::Added),
            Item::new(None, dec!(1)),
        ]
        .into_iter()
        .collect();

        let kept: Vec<Option<ItemKey>> = prune(&items)
            .iter()
            .map(|item| item.key().copied())
            .collect();
        assert_eq!(
            kept,
            vec![
                Some(package(KeyFee::Recurring)),
                Some(option(KeyFee::Recurring)),
                Some(option(KeyFee::Setup)),
                None,
            ]
        );
    }
}
