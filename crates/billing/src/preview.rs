//! Change preview documents
//!
//! JSON request and response shapes used by the `preview-change` binary. A
//! request carries the current service, the requested change, the target
//! catalog entries and the coupons and taxes of both sides.

use serde::{Deserialize, Serialize};
use tallyhost_shared::{ChangeRequest, Coupon, ServiceState, TaxRule};

use crate::builder::{PricingContext, StandardItemBuilder};
use crate::change::{ChangeReconciler, ChangeTarget};
use crate::collection::{ItemCollection, Totals};
use crate::describe::ChangeDescriber;
use crate::error::BillingResult;
use crate::settings::PricingSettings;

/// A service change to price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub service: ServiceState,
    pub change: ChangeRequest,
    #[serde(flatten)]
    pub target: ChangeTarget,
    /// Coupons applied to the service today
    #[serde(default)]
    pub old_coupons: Vec<Coupon>,
    /// Coupons applied after the change
    #[serde(default)]
    pub new_coupons: Vec<Coupon>,
    #[serde(default)]
    pub taxes: Vec<TaxRule>,
    #[serde(default)]
    pub tax_exempt: bool,
}

impl PreviewRequest {
    /// Pricing contexts for the old and new sides
    pub fn contexts(&self, settings: PricingSettings) -> (PricingContext, PricingContext) {
        let side = |coupons: &[Coupon]| {
            PricingContext::new(settings)
                .with_coupons(coupons.to_vec())
                .with_taxes(self.taxes.clone())
                .tax_exempt(self.tax_exempt)
        };
        (side(&self.old_coupons), side(&self.new_coupons))
    }
}

/// Delta lines and their totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub items: ItemCollection,
    pub totals: Totals,
}

/// Price `request` with the standard builder and describer
pub fn preview(request: &PreviewRequest, settings: PricingSettings) -> BillingResult<Preview> {
    let (old_ctx, new_ctx) = request.contexts(settings);
    let reconciler = ChangeReconciler::new(StandardItemBuilder, ChangeDescriber);
    let items = reconciler.reconcile(
        &request.service,
        &request.change,
        &request.target,
        &old_ctx,
        &new_ctx,
    )?;
    let totals = items.totals(settings.precision);

    Ok(Preview { items, totals })
}
