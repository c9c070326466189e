//! Item builders
//!
//! Builders turn a service (the "old" state) or a requested change (the "new"
//! state) into an [`ItemCollection`]. The two sides know nothing about each
//! other's keys: old items are keyed by service, new items by package, and
//! the change engine aligns them afterwards.
//!
//! Every line is emitted even when its fee is zero, in a fixed order: package
//! recurring, setup, cancel, then recurring, setup and cancel per option.
//! An option may appear at most once per service or change, since its lines
//! share one key.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tallyhost_shared::{
    ChangeRequest, Coupon, OptionId, Package, PackageOption, PackagePricing, ServiceState,
    TaxRule, Term,
};

use crate::collection::ItemCollection;
use crate::error::{BillingError, BillingResult};
use crate::item::{FeeType, Item, ItemKey, ItemMeta, ItemType, KeyFee, MetaRefs, OptionRef};
use crate::pricing::{Discount, TaxGroup};
use crate::settings::PricingSettings;

/// Settings, discounts and taxes for one side of a change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingContext {
    #[serde(default)]
    pub settings: PricingSettings,
    #[serde(default)]
    pub coupons: Vec<Coupon>,
    #[serde(default)]
    pub taxes: Vec<TaxRule>,
    #[serde(default)]
    pub tax_exempt: bool,
}

impl PricingContext {
    pub fn new(settings: PricingSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn with_coupons(mut self, coupons: Vec<Coupon>) -> Self {
        self.coupons = coupons;
        self
    }

    pub fn with_taxes(mut self, taxes: Vec<TaxRule>) -> Self {
        self.taxes = taxes;
        self
    }

    pub fn tax_exempt(mut self, exempt: bool) -> Self {
        self.tax_exempt = exempt;
        self
    }

    /// Discounts applicable to one line of `package`
    fn discounts(&self, package: &Package, item_type: ItemType, fee: FeeType) -> Vec<Discount> {
        if fee == FeeType::Cancel {
            return Vec::new();
        }
        self.coupons
            .iter()
            .filter(|coupon| coupon.applies_to_package(package.id))
            .filter(|coupon| item_type == ItemType::Package || coupon.apply_package_options)
            .filter(|coupon| fee != FeeType::Setup || coupon.apply_setup_fees)
            .map(Discount::from)
            .collect()
    }

    /// Tax groups applicable to one line of `package`
    fn taxes(&self, package: &Package, fee: FeeType) -> Vec<TaxGroup> {
        let taxed_fee = match fee {
            FeeType::Recurring => true,
            FeeType::Setup => self.settings.tax_setup_fees,
            FeeType::Cancel => self.settings.tax_cancel_fees,
        };
        if !package.taxable || self.tax_exempt || !taxed_fee || self.taxes.is_empty() {
            return Vec::new();
        }
        vec![TaxGroup::from_rules(&self.taxes, self.settings.cascade_tax)]
    }
}

/// Produces old-state and new-state item collections
pub trait ItemBuilderFactory {
    /// Items billed for the service as it is today
    fn service_items(
        &self,
        service: &ServiceState,
        ctx: &PricingContext,
    ) -> BillingResult<ItemCollection>;

    /// Items billed for the service after the requested change
    fn change_items(
        &self,
        change: &ChangeRequest,
        package: &Package,
        pricing: &PackagePricing,
        options: &[PackageOption],
        ctx: &PricingContext,
    ) -> BillingResult<ItemCollection>;
}

/// Default builder pricing straight from the catalog records
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardItemBuilder;

/// Fees of one billable line before discounts and taxes
struct LineFees {
    recurring: Decimal,
    setup: Decimal,
    cancel: Decimal,
}

impl StandardItemBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Reject option lists naming the same option twice
    fn ensure_unique_options<I>(option_ids: I) -> BillingResult<()>
    where
        I: IntoIterator<Item = OptionId>,
    {
        let mut seen = HashSet::new();
        for option_id in option_ids {
            if !seen.insert(option_id) {
                return Err(BillingError::InvalidInput(format!(
                    "Option {} is listed more than once",
                    option_id
                )));
            }
        }
        Ok(())
    }

    /// Push the recurring, setup and cancel items for one line
    fn push_line(
        items: &mut ItemCollection,
        key: ItemKey,
        fees: LineFees,
        item_type: ItemType,
        refs: MetaRefs,
        package: &Package,
        ctx: &PricingContext,
    ) {
        for (fee, price) in [
            (KeyFee::Recurring, fees.recurring),
            (KeyFee::Setup, fees.setup),
            (KeyFee::Cancel, fees.cancel),
        ] {
            let fee_type = FeeType::from(fee);
            let item = Item::keyed(key.with_fee(fee), price)
                .with_discounts(ctx.discounts(package, item_type, fee_type))
                .with_taxes(ctx.taxes(package, fee_type))
                .with_meta(Some(ItemMeta::new(fee_type, item_type, refs.clone())));
            items.push(item);
        }
    }
}

impl ItemBuilderFactory for StandardItemBuilder {
    fn service_items(
        &self,
        service: &ServiceState,
        ctx: &PricingContext,
    ) -> BillingResult<ItemCollection> {
        Self::ensure_unique_options(service.options.iter().map(|option| option.option_id))?;

        let mut items = ItemCollection::new();
        let package = &service.package;
        let term = service.pricing.term;
        let base = ItemKey::service(service.id);

        let refs = MetaRefs {
            service_id: Some(service.id),
            package_id: package.id,
            package_name: package.name.clone(),
            term,
            qty: service.qty,
            option: None,
        };
        let fees = LineFees {
            recurring: service
                .override_price
                .unwrap_or(service.pricing.price * Decimal::from(service.qty)),
            setup: service.pricing.setup_fee,
            cancel: service.pricing.cancel_fee,
        };
        Self::push_line(&mut items, base, fees, ItemType::Package, refs.clone(), package, ctx);

        for option in &service.options {
            let option_refs = MetaRefs {
                qty: option.qty,
                option: Some(OptionRef {
                    option_id: option.option_id,
                    label: option.label.clone(),
                    value_id: option.value_id,
                    value_name: option.value_name.clone(),
                }),
                ..refs.clone()
            };
            let fees = LineFees {
                recurring: option.price * Decimal::from(option.qty),
                setup: option.setup_fee,
                cancel: option.cancel_fee,
            };
            Self::push_line(
                &mut items,
                base.with_option(option.option_id),
                fees,
                ItemType::Option,
                option_refs,
                package,
                ctx,
            );
        }

        tracing::debug!(
            service_id = %service.id,
            items = items.len(),
            "Built service items"
        );

        Ok(items)
    }

    fn change_items(
        &self,
        change: &ChangeRequest,
        package: &Package,
        pricing: &PackagePricing,
        options: &[PackageOption],
        ctx: &PricingContext,
    ) -> BillingResult<ItemCollection> {
        if pricing.package_id != package.id {
            return Err(BillingError::InvalidInput(format!(
                "Pricing {} does not belong to package {}",
                pricing.id, package.id
            )));
        }
        Self::ensure_unique_options(change.options.iter().map(|selection| selection.option_id))?;

        let mut items = ItemCollection::new();
        let term: Term = pricing.term;
        let base = ItemKey::package(package.id);

        let refs = MetaRefs {
            service_id: None,
            package_id: package.id,
            package_name: package.name.clone(),
            term,
            qty: change.qty,
            option: None,
        };
        let fees = LineFees {
            recurring: change
                .override_price
                .unwrap_or(pricing.price * Decimal::from(change.qty)),
            setup: pricing.setup_fee,
            cancel: pricing.cancel_fee,
        };
        Self::push_line(&mut items, base, fees, ItemType::Package, refs.clone(), package, ctx);

        for selection in &change.options {
            let option = options
                .iter()
                .find(|option| option.id == selection.option_id)
                .ok_or(BillingError::OptionNotFound(selection.option_id, package.id))?;
            let value =
                option
                    .value(selection.value_id)
                    .ok_or(BillingError::OptionValueNotFound {
                        option_id: option.id,
                        value_id: selection.value_id,
                    })?;
            let value_pricing = value
                .pricing_for(term)
                .ok_or(BillingError::PricingNotFound {
                    option_id: option.id,
                    value_id: value.id,
                    term,
                })?;

            let option_refs = MetaRefs {
                qty: selection.qty,
                option: Some(OptionRef {
                    option_id: option.id,
                    label: option.label.clone(),
                    value_id: value.id,
                    value_name: value.name.clone(),
                }),
                ..refs.clone()
            };
            let fees = LineFees {
                recurring: value_pricing.price * Decimal::from(selection.qty),
                setup: value_pricing.setup_fee,
                cancel: value_pricing.cancel_fee,
            };
            Self::push_line(
                &mut items,
                base.with_option(option.id),
                fees,
                ItemType::Option,
                option_refs,
                package,
                ctx,
            );
        }

        tracing::debug!(
            package_id = %package.id,
            pricing_id = %pricing.id,
            items = items.len(),
            "Built change items"
        );

        Ok(items)
    }
}
