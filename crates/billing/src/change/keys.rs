//! Key reconciliation
//!
//! New-state items are keyed by package (`package-3-option-4`) while old-state
//! items are keyed by service (`service-9-option-4`). This stage rewrites a new
//! item's key onto the matching service only when the two items may be folded
//! into a single price:
//!
//! - setup fees always combine, so a stale setup charge can be pruned later,
//!   except a package setup fee after the package itself changed
//! - every other line combines only when both sides carry the same discounts
//!   and neither carries a fixed-amount discount
//!
//! Lines left alone surface later as a removed old item plus an added new one.

use std::collections::BTreeMap;

use tallyhost_shared::{OptionId, PackageId, ServiceId};

use crate::collection::ItemCollection;
use crate::item::{FeeType, Item, ItemKey, ItemType, KeyScope};
use crate::pricing::{discounts_equivalent, has_amount_discount, Discount};

/// Package and recurring-fee discounts of a service in the old state
#[derive(Debug, Default)]
struct ServicePackage {
    package_id: Option<PackageId>,
    discounts: Vec<Discount>,
}

/// Lookup tables built from old-state meta
#[derive(Debug, Default)]
struct ServiceIndex {
    packages: BTreeMap<ServiceId, ServicePackage>,
    options: BTreeMap<(ServiceId, OptionId), Vec<Discount>>,
}

impl ServiceIndex {
    fn from_items(old: &ItemCollection) -> Self {
        let mut index = Self::default();

        for item in old {
            let Some(meta) = item.meta() else {
                continue;
            };
            let Some(service_id) = meta.refs.service_id else {
                continue;
            };
            let recurring = meta.fee == FeeType::Recurring;

            match (meta.item_type, &meta.refs.option) {
                (ItemType::Option, Some(option)) => {
                    let discounts = index
                        .options
                        .entry((service_id, option.option_id))
                        .or_default();
                    if recurring {
                        *discounts = item.discounts().to_vec();
                    }
                }
                _ => {
                    let service = index.packages.entry(service_id).or_default();
                    service.package_id = Some(meta.refs.package_id);
                    if recurring {
                        service.discounts = item.discounts().to_vec();
                    }
                }
            }
        }

        index
    }

    /// Service an option line of the new state folds into
    fn option_target(&self, option_id: OptionId, item: &Item, key: &ItemKey) -> Option<ServiceId> {
        self.options
            .iter()
            .filter(|((_, id), _)| *id == option_id)
            .find(|(_, discounts)| key.is_setup() || combinable(discounts, item.discounts()))
            .map(|((service_id, _), _)| *service_id)
    }

    /// Service a package line of the new state folds into
    fn package_target(&self, package_id: PackageId, item: &Item, key: &ItemKey) -> Option<ServiceId> {
        self.packages
            .iter()
            .find(|(_, service)| {
                if key.is_setup() {
                    service.package_id == Some(package_id)
                } else {
                    combinable(&service.discounts, item.discounts())
                }
            })
            .map(|(service_id, _)| *service_id)
    }
}

/// Two discount lists may share one price delta
pub fn combinable(old: &[Discount], new: &[Discount]) -> bool {
    !has_amount_discount(old) && !has_amount_discount(new) && discounts_equivalent(old, new)
}

/// Rewrite new-state keys onto the old-state services they continue
///
/// Returns a new collection in the same order as `new`. Unkeyed items, items
/// already keyed by service, and items with no combinable service are kept
/// as they are.
pub fn reconcile_keys(old: &ItemCollection, new: &ItemCollection) -> ItemCollection {
    let index = ServiceIndex::from_items(old);

    new.iter()
        .map(|item| {
            let Some(key) = item.key().copied() else {
                return item.clone();
            };
            let KeyScope::Package(package_id) = key.scope else {
                return item.clone();
            };

            let target = match key.option {
                Some(option_id) => index.option_target(option_id, item, &key),
                None => index.package_target(package_id, item, &key),
            };

            match target {
                Some(service_id) => {
                    let rewritten = key.rescoped(KeyScope::Service(service_id));
                    tracing::debug!(from = %key, to = %rewritten, "Rewrote change item key");
                    item.clone().with_key(Some(rewritten))
                }
                None => item.clone(),
            }
        })
        .collect()
}
