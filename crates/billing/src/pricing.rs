//! Discount and tax modifiers applied to item prices
//!
//! Discounts are applied in list order to a running amount. Taxes are grouped:
//! each group taxes the discounted amount independently, and within a group a
//! compound rate also taxes the tax accumulated before it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tallyhost_shared::{Coupon, CouponId, DiscountKind, TaxRule, TaxRuleId};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// A single discount applied to an item price
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Discount {
    pub coupon_id: Option<CouponId>,
    pub kind: DiscountKind,
    pub value: Decimal,
}

impl Discount {
    pub fn percent(value: Decimal) -> Self {
        Self {
            coupon_id: None,
            kind: DiscountKind::Percent,
            value,
        }
    }

    pub fn amount(value: Decimal) -> Self {
        Self {
            coupon_id: None,
            kind: DiscountKind::Amount,
            value,
        }
    }

    /// Amount this discount removes from `running`
    ///
    /// Amount discounts never remove more than what is left and carry the sign
    /// of `running`, so a credit shrinks toward zero instead of flipping.
    pub fn reduction(&self, running: Decimal) -> Decimal {
        match self.kind {
            DiscountKind::Percent => running * self.value / HUNDRED,
            DiscountKind::Amount => {
                let off = self.value.abs().min(running.abs());
                if running.is_sign_negative() {
                    -off
                } else {
                    off
                }
            }
        }
    }
}

impl From<&Coupon> for Discount {
    fn from(coupon: &Coupon) -> Self {
        Self {
            coupon_id: Some(coupon.id),
            kind: coupon.kind,
            value: coupon.value,
        }
    }
}

/// Total discount removed from `price` by `discounts`, applied in order
pub fn discount_amount(price: Decimal, discounts: &[Discount]) -> Decimal {
    let mut running = price;
    let mut total = Decimal::ZERO;
    for discount in discounts {
        let off = discount.reduction(running);
        running -= off;
        total += off;
    }
    total
}

/// Whether any discount in the list is a fixed amount
pub fn has_amount_discount(discounts: &[Discount]) -> bool {
    discounts.iter().any(|d| d.kind == DiscountKind::Amount)
}

/// Order-independent multiset equality of two discount lists
///
/// Discounts match on coupon, kind and value, so two coupons with the same
/// rate are still different discounts.
pub fn discounts_equivalent(a: &[Discount], b: &[Discount]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut unmatched: Vec<&Discount> = b.iter().collect();
    for discount in a {
        match unmatched.iter().position(|other| *other == discount) {
            Some(index) => {
                unmatched.swap_remove(index);
            }
            None => return false,
        }
    }
    true
}

/// One tax rate within a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate {
    pub rule_id: Option<TaxRuleId>,
    pub name: String,
    /// Percentage rate
    pub rate: Decimal,
    /// Also taxes the tax accumulated earlier in the group
    pub compound: bool,
}

impl TaxRate {
    pub fn new(name: impl Into<String>, rate: Decimal) -> Self {
        Self {
            rule_id: None,
            name: name.into(),
            rate,
            compound: false,
        }
    }

    pub fn compound(mut self) -> Self {
        self.compound = true;
        self
    }
}

/// Ordered tax rates applied together to one item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxGroup {
    pub rates: Vec<TaxRate>,
}

impl TaxGroup {
    pub fn new(rates: Vec<TaxRate>) -> Self {
        Self { rates }
    }

    /// Build a group from tax rules, ordered by level
    pub fn from_rules(rules: &[TaxRule], cascade: bool) -> Self {
        let mut rules: Vec<&TaxRule> = rules.iter().collect();
        rules.sort_by_key(|rule| rule.level);
        let rates = rules
            .into_iter()
            .map(|rule| TaxRate {
                rule_id: Some(rule.id),
                name: rule.name.clone(),
                rate: rule.rate,
                compound: cascade && rule.level > 1,
            })
            .collect();
        Self { rates }
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Tax charged by this group on `base`
    pub fn tax_on(&self, base: Decimal) -> Decimal {
        self.rates.iter().fold(Decimal::ZERO, |accumulated, rate| {
            let taxable = if rate.compound {
                base + accumulated
            } else {
                base
            };
            accumulated + taxable * rate.rate / HUNDRED
        })
    }
}

/// Total tax charged on `base` by every group
pub fn tax_amount(base: Decimal, taxes: &[TaxGroup]) -> Decimal {
    taxes.iter().map(|group| group.tax_on(base)).sum()
}
