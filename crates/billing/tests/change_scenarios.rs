//! Integration tests for service change reconciliation
//!
//! Runs the full pipeline (build, re-key, pair, merge, prune) through the
//! public API and checks the delta lines a customer would be billed.
//!
//! ## Test Coverage
//! - Package upgrades, added and removed options, option value changes
//! - Package changes that owe a new setup fee
//! - Discount gates that keep discounted lines apart
//! - Builder failures and the JSON preview document

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tallyhost_billing::{
    preview, BillingError, BillingResult, ChangeDescriber, ChangeReconciler, ChangeTarget,
    FeeType, Item, ItemBuilderFactory, ItemCollection, ItemKey, ItemState, ItemType, KeyFee,
    PreviewRequest, PricingContext, PricingSettings, StandardItemBuilder,
};
use tallyhost_shared::{
    ChangeRequest, Coupon, CouponId, DiscountKind, OptionId, OptionPricing, OptionSelection,
    OptionValue, OptionValueId, Package, PackageId, PackageOption, PackagePricing, PricingId,
    ServiceId, ServiceOption, ServiceState, Term,
};

// ============================================================================
// Test Utilities
// ============================================================================

const SERVICE: ServiceId = ServiceId(9);
const DISK: OptionId = OptionId(4);
const BACKUP: OptionId = OptionId(5);

fn package(id: u64, name: &str) -> Package {
    Package {
        id: PackageId(id),
        name: name.to_string(),
        taxable: false,
    }
}

fn pricing(package_id: u64, price: Decimal, setup_fee: Decimal) -> PackagePricing {
    PackagePricing {
        id: PricingId(package_id * 10),
        package_id: PackageId(package_id),
        term: Term::monthly(),
        price,
        setup_fee,
        cancel_fee: dec!(1.00),
    }
}

fn service(package_id: u64, name: &str, price: Decimal) -> ServiceState {
    ServiceState {
        id: SERVICE,
        package: package(package_id, name),
        pricing: pricing(package_id, price, Decimal::ZERO),
        qty: 1,
        override_price: None,
        options: vec![],
    }
}

fn disk_on_service(value_id: u64, value: &str, price: Decimal) -> ServiceOption {
    ServiceOption {
        option_id: DISK,
        label: "Disk".to_string(),
        value_id: OptionValueId(value_id),
        value_name: value.to_string(),
        qty: 1,
        price,
        setup_fee: Decimal::ZERO,
        cancel_fee: dec!(2.00),
    }
}

fn option(id: OptionId, label: &str, values: &[(u64, &str, Decimal, Decimal)]) -> PackageOption {
    PackageOption {
        id,
        label: label.to_string(),
        values: values
            .iter()
            .map(|(value_id, name, price, setup_fee)| OptionValue {
                id: OptionValueId(*value_id),
                name: name.to_string(),
                pricing: vec![OptionPricing {
                    term: Term::monthly(),
                    price: *price,
                    setup_fee: *setup_fee,
                    cancel_fee: dec!(0.50),
                }],
            })
            .collect(),
    }
}

fn catalog_options() -> Vec<PackageOption> {
    vec![
        option(
            DISK,
            "Disk",
            &[
                (40, "10 GB", dec!(1.50), dec!(3.00)),
                (41, "20 GB", dec!(2.00), dec!(3.00)),
            ],
        ),
        option(BACKUP, "Backups", &[(50, "Daily", dec!(3.00), dec!(2.00))]),
    ]
}

fn select(option_id: OptionId, value_id: u64) -> OptionSelection {
    OptionSelection {
        option_id,
        value_id: OptionValueId(value_id),
        qty: 1,
    }
}

fn change(options: Vec<OptionSelection>) -> ChangeRequest {
    ChangeRequest {
        qty: 1,
        override_price: None,
        options,
    }
}

fn target(package_id: u64, name: &str, price: Decimal, setup_fee: Decimal) -> ChangeTarget {
    ChangeTarget {
        package: package(package_id, name),
        pricing: pricing(package_id, price, setup_fee),
        options: catalog_options(),
    }
}

fn coupon(id: u64, kind: DiscountKind, value: Decimal) -> Coupon {
    Coupon {
        id: CouponId(id),
        code: format!("CODE{}", id),
        kind,
        value,
        packages: vec![],
        apply_package_options: true,
        apply_setup_fees: false,
    }
}

fn reconcile_with(
    service: &ServiceState,
    change: &ChangeRequest,
    target: &ChangeTarget,
    old_ctx: &PricingContext,
    new_ctx: &PricingContext,
) -> ItemCollection {
    ChangeReconciler::new(StandardItemBuilder, ChangeDescriber)
        .reconcile(service, change, target, old_ctx, new_ctx)
        .unwrap()
}

fn reconcile(service: &ServiceState, change: &ChangeRequest, target: &ChangeTarget) -> ItemCollection {
    let ctx = PricingContext::default();
    reconcile_with(service, change, target, &ctx, &ctx)
}

/// Lines that carry a non-zero amount
fn charged(items: &ItemCollection) -> Vec<&Item> {
    items.iter().filter(|item| !item.price().is_zero()).collect()
}

fn fee_of(item: &Item) -> FeeType {
    item.meta().unwrap().fee
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_upgrade_only() {
    let delta = reconcile(
        &service(1, "Basic", dec!(10.00)),
        &change(vec![]),
        &target(2, "Pro", dec!(15.00), Decimal::ZERO),
    );

    assert_eq!(delta.len(), 1);
    let line = delta.get(&ItemKey::service(SERVICE)).unwrap();
    assert_eq!(line.price(), dec!(5.00));
    assert_eq!(line.state(), Some(ItemState::Updated));
    assert_eq!(line.description(), "Basic → Pro");
}

#[test]
fn test_added_option() {
    let delta = reconcile(
        &service(1, "Basic", dec!(10.00)),
        &change(vec![select(BACKUP, 50)]),
        &target(1, "Basic", dec!(10.00), Decimal::ZERO),
    );

    let lines = charged(&delta);
    assert_eq!(lines.len(), 2);

    let recurring = ItemKey::package(PackageId(1)).with_option(BACKUP);
    let line = delta.get(&recurring).unwrap();
    assert_eq!(line.price(), dec!(3.00));
    assert_eq!(line.state(), Some(ItemState::Added));
    assert_eq!(line.description(), "Backups: Daily");

    let setup = delta.get(&recurring.with_fee(KeyFee::Setup)).unwrap();
    assert_eq!(setup.price(), dec!(2.00));
    assert_eq!(setup.state(), Some(ItemState::Added));
    assert_eq!(setup.description(), "Backups: Daily setup fee");
}

#[test]
fn test_removed_option() {
    let mut old = service(1, "Basic", dec!(10.00));
    old.options.push(disk_on_service(40, "10 GB", dec!(4.00)));

    let delta = reconcile(
        &old,
        &change(vec![]),
        &target(1, "Basic", dec!(10.00), Decimal::ZERO),
    );

    let lines = charged(&delta);
    assert_eq!(lines.len(), 1);
    let line = delta
        .get(&ItemKey::service(SERVICE).with_option(DISK))
        .unwrap();
    assert_eq!(line.price(), dec!(-4.00));
    assert_eq!(line.state(), Some(ItemState::Removed));
    assert_eq!(line.description(), "Remove Disk: 10 GB");

    // The option's 2.00 cancellation fee is never billed
    assert!(delta.iter().all(|item| fee_of(item) != FeeType::Cancel));
}

#[test]
fn test_package_change_with_setup_fee() {
    let delta = reconcile(
        &service(1, "Basic", dec!(10.00)),
        &change(vec![]),
        &target(2, "Pro", dec!(10.00), dec!(25.00)),
    );

    let setup = delta
        .get(&ItemKey::package(PackageId(2)).with_fee(KeyFee::Setup))
        .unwrap();
    assert_eq!(setup.price(), dec!(25.00));
    assert_eq!(setup.state(), Some(ItemState::Added));
    assert_eq!(setup.description(), "Pro setup fee");

    assert_eq!(charged(&delta).len(), 1);
}

#[test]
fn test_setup_fee_not_charged_again_for_same_package() {
    let mut old = service(1, "Basic", dec!(10.00));
    old.pricing.setup_fee = dec!(25.00);

    let delta = reconcile(
        &old,
        &change(vec![]),
        &target(1, "Basic", dec!(12.00), dec!(25.00)),
    );

    assert!(delta.iter().all(|item| fee_of(item) == FeeType::Recurring));
    assert_eq!(delta.totals(2).total, dec!(2.00));
}

#[test]
fn test_option_value_change() {
    let mut old = service(1, "Basic", dec!(10.00));
    old.options.push(disk_on_service(40, "10 GB", dec!(1.50)));

    let delta = reconcile(
        &old,
        &change(vec![select(DISK, 41)]),
        &target(1, "Basic", dec!(10.00), Decimal::ZERO),
    );

    let line = delta
        .get(&ItemKey::service(SERVICE).with_option(DISK))
        .unwrap();
    assert_eq!(line.price(), dec!(0.50));
    assert_eq!(line.state(), Some(ItemState::Updated));
    assert_eq!(line.description(), "Disk: 10 GB → 20 GB");

    // The option already existed, so its setup fee is not charged again
    assert!(delta.iter().all(|item| fee_of(item) == FeeType::Recurring));
    assert_eq!(charged(&delta).len(), 1);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_no_change_bills_nothing() {
    let mut old = service(1, "Basic", dec!(10.00));
    old.options.push(disk_on_service(40, "10 GB", dec!(1.50)));

    let delta = reconcile(
        &old,
        &change(vec![select(DISK, 40)]),
        &target(1, "Basic", dec!(10.00), Decimal::ZERO),
    );

    assert!(charged(&delta).is_empty());
    assert!(delta
        .iter()
        .all(|item| item.meta().unwrap().item_type == ItemType::Package));
    assert_eq!(delta.totals(2).total, Decimal::ZERO);
}

#[test]
fn test_keys_unique_in_delta() {
    let mut old = service(1, "Basic", dec!(10.00));
    old.options.push(disk_on_service(40, "10 GB", dec!(1.50)));

    let delta = reconcile(
        &old,
        &change(vec![select(BACKUP, 50)]),
        &target(2, "Pro", dec!(20.00), dec!(5.00)),
    );

    let mut keys: Vec<ItemKey> = delta.keys().copied().collect();
    let count = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), count);
    assert_eq!(count, delta.len());
}

#[test]
fn test_net_total_is_new_minus_old() {
    let mut old = service(1, "Basic", dec!(10.00));
    old.options.push(disk_on_service(40, "10 GB", dec!(1.50)));

    let delta = reconcile(
        &old,
        &change(vec![select(DISK, 41), select(BACKUP, 50)]),
        &target(2, "Pro", dec!(20.00), Decimal::ZERO),
    );

    let recurring: Decimal = delta
        .iter()
        .filter(|item| fee_of(item) == FeeType::Recurring)
        .map(Item::price)
        .sum();
    // (20.00 + 2.00 + 3.00) - (10.00 + 1.50)
    assert_eq!(recurring, dec!(13.50));
}

#[test]
fn test_different_discounts_kept_apart() {
    let old = service(1, "Basic", dec!(10.00));
    let old_ctx =
        PricingContext::default().with_coupons(vec![coupon(1, DiscountKind::Percent, dec!(10))]);
    let new_ctx = PricingContext::default();

    let delta = reconcile_with(
        &old,
        &change(vec![]),
        &target(2, "Pro", dec!(15.00), Decimal::ZERO),
        &old_ctx,
        &new_ctx,
    );

    let removed = delta.get(&ItemKey::service(SERVICE)).unwrap();
    assert_eq!(removed.price(), dec!(-10.00));
    assert_eq!(removed.state(), Some(ItemState::Removed));
    assert_eq!(removed.discount_amount(), dec!(-1.00));

    let added = delta.get(&ItemKey::package(PackageId(2))).unwrap();
    assert_eq!(added.price(), dec!(15.00));
    assert_eq!(added.state(), Some(ItemState::Added));

    assert_eq!(delta.totals(2).total, dec!(6.00));
}

#[test]
fn test_same_percent_discounts_combine() {
    let coupons = vec![coupon(1, DiscountKind::Percent, dec!(10))];
    let ctx = PricingContext::default().with_coupons(coupons);

    let delta = reconcile_with(
        &service(1, "Basic", dec!(10.00)),
        &change(vec![]),
        &target(2, "Pro", dec!(15.00), Decimal::ZERO),
        &ctx,
        &ctx,
    );

    assert_eq!(delta.len(), 1);
    let line = delta.get(&ItemKey::service(SERVICE)).unwrap();
    assert_eq!(line.price(), dec!(5.00));
    assert_eq!(line.total(), dec!(4.50));
}

#[test]
fn test_different_coupon_with_same_rate_kept_apart() {
    let old_ctx =
        PricingContext::default().with_coupons(vec![coupon(1, DiscountKind::Percent, dec!(10))]);
    let new_ctx =
        PricingContext::default().with_coupons(vec![coupon(2, DiscountKind::Percent, dec!(10))]);

    let delta = reconcile_with(
        &service(1, "Basic", dec!(10.00)),
        &change(vec![]),
        &target(2, "Pro", dec!(15.00), Decimal::ZERO),
        &old_ctx,
        &new_ctx,
    );

    assert_eq!(
        delta.get(&ItemKey::service(SERVICE)).unwrap().state(),
        Some(ItemState::Removed)
    );
    assert_eq!(
        delta.get(&ItemKey::package(PackageId(2))).unwrap().state(),
        Some(ItemState::Added)
    );
    // -(10.00 - 1.00) + (15.00 - 1.50)
    assert_eq!(delta.totals(2).total, dec!(4.50));
}

#[test]
fn test_amount_discounts_never_combine() {
    let coupons = vec![coupon(1, DiscountKind::Amount, dec!(2.00))];
    let ctx = PricingContext::default().with_coupons(coupons);

    let delta = reconcile_with(
        &service(1, "Basic", dec!(10.00)),
        &change(vec![]),
        &target(2, "Pro", dec!(15.00), Decimal::ZERO),
        &ctx,
        &ctx,
    );

    assert_eq!(
        delta.get(&ItemKey::service(SERVICE)).unwrap().state(),
        Some(ItemState::Removed)
    );
    assert_eq!(
        delta.get(&ItemKey::package(PackageId(2))).unwrap().state(),
        Some(ItemState::Added)
    );
    // -(10.00 - 2.00) + (15.00 - 2.00)
    assert_eq!(delta.totals(2).total, dec!(5.00));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_unknown_option_fails() {
    let result = ChangeReconciler::new(StandardItemBuilder, ChangeDescriber).reconcile(
        &service(1, "Basic", dec!(10.00)),
        &change(vec![select(OptionId(99), 1)]),
        &target(1, "Basic", dec!(10.00), Decimal::ZERO),
        &PricingContext::default(),
        &PricingContext::default(),
    );

    assert!(matches!(
        result,
        Err(BillingError::OptionNotFound(OptionId(99), PackageId(1)))
    ));
}

#[test]
fn test_option_selected_twice_fails() {
    let result = ChangeReconciler::new(StandardItemBuilder, ChangeDescriber).reconcile(
        &service(1, "Basic", dec!(10.00)),
        &change(vec![select(BACKUP, 50), select(BACKUP, 50)]),
        &target(1, "Basic", dec!(10.00), Decimal::ZERO),
        &PricingContext::default(),
        &PricingContext::default(),
    );

    assert!(matches!(result, Err(BillingError::InvalidInput(_))));
}

struct UnavailableBuilder;

impl ItemBuilderFactory for UnavailableBuilder {
    fn service_items(
        &self,
        service: &ServiceState,
        _ctx: &PricingContext,
    ) -> BillingResult<ItemCollection> {
        Err(BillingError::Builder(format!("service {} is locked", service.id)))
    }

    fn change_items(
        &self,
        _change: &ChangeRequest,
        _package: &Package,
        _pricing: &PackagePricing,
        _options: &[PackageOption],
        _ctx: &PricingContext,
    ) -> BillingResult<ItemCollection> {
        Ok(ItemCollection::new())
    }
}

#[test]
fn test_builder_error_returned_as_is() {
    let result = ChangeReconciler::new(UnavailableBuilder, ChangeDescriber).reconcile(
        &service(1, "Basic", dec!(10.00)),
        &change(vec![]),
        &target(1, "Basic", dec!(10.00), Decimal::ZERO),
        &PricingContext::default(),
        &PricingContext::default(),
    );

    match result {
        Err(BillingError::Builder(message)) => assert_eq!(message, "service 9 is locked"),
        other => panic!("unexpected result: {:?}", other),
    }
}

// ============================================================================
// Preview Document
// ============================================================================

#[test]
fn test_preview_document() {
    let request = PreviewRequest {
        service: service(1, "Basic", dec!(10.00)),
        change: change(vec![select(BACKUP, 50)]),
        target: target(2, "Pro", dec!(15.00), Decimal::ZERO),
        old_coupons: vec![],
        new_coupons: vec![],
        taxes: vec![],
        tax_exempt: false,
    };
    let raw = serde_json::to_string(&request).unwrap();
    let parsed: PreviewRequest = serde_json::from_str(&raw).unwrap();

    let preview = preview(&parsed, PricingSettings::default()).unwrap();
    // 5.00 upgrade + 3.00 backups + 2.00 backups setup
    assert_eq!(preview.totals.total, dec!(10.00));

    let json = serde_json::to_value(&preview).unwrap();
    let first = &json["items"][0];
    assert_eq!(first["key"], "service-9");
    assert_eq!(first["description"], "Basic → Pro");
    assert_eq!(first["meta"]["type"], "recurring");
    assert_eq!(first["meta"]["state"], "updated");
}
