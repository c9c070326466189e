//! Service change price reconciliation
//!
//! Computes what must be billed or credited when a customer's service moves
//! from one package, pricing or option set to another mid-cycle.
//!
//! ## Pipeline
//!
//! 1. The old-state and new-state builders each produce an item collection
//! 2. [`keys::reconcile_keys`] aligns new keys with the old ones they continue
//! 3. [`pairing::pair`] gives every key a counterpart and tags its state
//! 4. The collections are merged into one delta per key (`new - old`)
//! 5. [`prune::prune`] drops fee and noise lines that must not be billed
//!
//! Every stage returns a new collection; nothing is mutated in place, and the
//! engine holds no state between requests.

pub mod keys;
pub mod pairing;
pub mod prune;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tallyhost_shared::{ChangeRequest, Package, PackageOption, PackagePricing, ServiceState};

use crate::builder::{ItemBuilderFactory, PricingContext};
use crate::collection::ItemCollection;
use crate::comparator::ItemComparator;
use crate::describe::Describer;
use crate::error::BillingResult;
use crate::item::{ItemMeta, ItemState};

/// Package, pricing and option catalog a service is changing to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeTarget {
    pub package: Package,
    pub pricing: PackagePricing,
    #[serde(default)]
    pub options: Vec<PackageOption>,
}

/// Signed price delta: positive is an additional charge, negative a credit
pub fn combined_price(old: Decimal, new: Decimal) -> Decimal {
    new - old
}

/// Description of a merged line
///
/// Delegates to `describer` (new meta first, old meta second) once the new
/// side has been assigned a lifecycle state; otherwise the line is blank.
pub fn combined_description<D>(
    describer: &D,
    old: Option<&ItemMeta>,
    new: Option<&ItemMeta>,
) -> String
where
    D: Describer + ?Sized,
{
    match new {
        Some(meta) if meta.state != ItemState::Unchanged => describer.describe(Some(meta), old),
        _ => String::new(),
    }
}

/// Reconciles service changes into delta item collections
pub struct ChangeReconciler<B, D> {
    builders: B,
    describer: D,
}

impl<B, D> ChangeReconciler<B, D>
where
    B: ItemBuilderFactory,
    D: Describer,
{
    pub fn new(builders: B, describer: D) -> Self {
        Self {
            builders,
            describer,
        }
    }

    /// Compute the delta collection for changing `service` to `target`
    ///
    /// `old_ctx` prices the service as it is today and `new_ctx` prices the
    /// requested change; each carries its own coupons and taxes. Builder
    /// failures are returned as-is.
    pub fn reconcile(
        &self,
        service: &ServiceState,
        change: &ChangeRequest,
        target: &ChangeTarget,
        old_ctx: &PricingContext,
        new_ctx: &PricingContext,
    ) -> BillingResult<ItemCollection> {
        let old = self
            .builders
            .service_items(service, old_ctx)
            .map_err(|e| {
                tracing::warn!(service_id = %service.id, error = %e, "Failed to build service items");
                e
            })?;
        let new = self
            .builders
            .change_items(
                change,
                &target.package,
                &target.pricing,
                &target.options,
                new_ctx,
            )
            .map_err(|e| {
                tracing::warn!(
                    service_id = %service.id,
                    package_id = %target.package.id,
                    error = %e,
                    "Failed to build change items"
                );
                e
            })?;

        let new = keys::reconcile_keys(&old, &new);
        let paired = pairing::pair(&old, &new);

        let comparator = ItemComparator::new(
            combined_price,
            |old: Option<&ItemMeta>, new: Option<&ItemMeta>| {
                combined_description(&self.describer, old, new)
            },
        );
        let merged = paired.old.merge(&paired.new, &comparator);
        let delta = prune::prune(&merged);

        tracing::info!(
            service_id = %service.id,
            from_package = %service.package.id,
            to_package = %target.package.id,
            items = delta.len(),
            pruned = merged.len() - delta.len(),
            net_total = %delta.totals(new_ctx.settings.precision).total,
            "Reconciled service change"
        );

        Ok(delta)
    }
}
