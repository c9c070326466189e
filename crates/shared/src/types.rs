//! Catalog and service records used across TallyHost billing

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Wrappers
// =============================================================================

macro_rules! id_wrapper {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_wrapper!(
    /// Service ID wrapper
    ServiceId
);
id_wrapper!(
    /// Package ID wrapper
    PackageId
);
id_wrapper!(
    /// Package pricing ID wrapper
    PricingId
);
id_wrapper!(
    /// Configurable option ID wrapper
    OptionId
);
id_wrapper!(
    /// Configurable option value ID wrapper
    OptionValueId
);
id_wrapper!(
    /// Coupon ID wrapper
    CouponId
);
id_wrapper!(
    /// Tax rule ID wrapper
    TaxRuleId
);

// =============================================================================
// Enums
// =============================================================================

/// Billing period unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    #[default]
    Month,
    Year,
    Onetime,
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
            Self::Year => write!(f, "year"),
            Self::Onetime => write!(f, "onetime"),
        }
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            "onetime" => Ok(Self::Onetime),
            _ => Err(format!("Invalid billing period: {}", s)),
        }
    }
}

/// How a coupon reduces a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// Percentage of the price (0-100)
    Percent,
    /// Fixed amount off the price
    Amount,
}

impl std::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Percent => write!(f, "percent"),
            Self::Amount => write!(f, "amount"),
        }
    }
}

// =============================================================================
// Terms
// =============================================================================

/// A billing term, e.g. 1 month or 2 years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub period: Period,
    pub length: u32,
}

impl Term {
    pub fn new(period: Period, length: u32) -> Self {
        Self { period, length }
    }

    pub fn monthly() -> Self {
        Self::new(Period::Month, 1)
    }

    pub fn yearly() -> Self {
        Self::new(Period::Year, 1)
    }

    /// One-time terms are billed once and never renew
    pub fn is_recurring(&self) -> bool {
        self.period != Period::Onetime
    }
}

impl Default for Term {
    fn default() -> Self {
        Self::monthly()
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_recurring() {
            return write!(f, "One time");
        }
        if self.length == 1 {
            write!(f, "1 {}", self.period)
        } else {
            write!(f, "{} {}s", self.length, self.period)
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A sellable package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    #[serde(default)]
    pub taxable: bool,
}

/// Price of a package for one term
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagePricing {
    pub id: PricingId,
    pub package_id: PackageId,
    pub term: Term,
    pub price: Decimal,
    #[serde(default)]
    pub setup_fee: Decimal,
    #[serde(default)]
    pub cancel_fee: Decimal,
}

/// A configurable option offered with a package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageOption {
    pub id: OptionId,
    pub label: String,
    #[serde(default)]
    pub values: Vec<OptionValue>,
}

impl PackageOption {
    pub fn value(&self, id: OptionValueId) -> Option<&OptionValue> {
        self.values.iter().find(|value| value.id == id)
    }
}

/// One selectable value of a configurable option
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionValue {
    pub id: OptionValueId,
    pub name: String,
    #[serde(default)]
    pub pricing: Vec<OptionPricing>,
}

impl OptionValue {
    /// Pricing for the given term, if the value is offered on it
    pub fn pricing_for(&self, term: Term) -> Option<&OptionPricing> {
        self.pricing.iter().find(|pricing| pricing.term == term)
    }
}

/// Price of an option value for one term
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionPricing {
    pub term: Term,
    pub price: Decimal,
    #[serde(default)]
    pub setup_fee: Decimal,
    #[serde(default)]
    pub cancel_fee: Decimal,
}

/// Coupon-like discount record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    /// Packages the coupon is valid for (empty = all packages)
    #[serde(default)]
    pub packages: Vec<PackageId>,
    #[serde(default)]
    pub apply_package_options: bool,
    #[serde(default)]
    pub apply_setup_fees: bool,
}

impl Coupon {
    pub fn applies_to_package(&self, package_id: PackageId) -> bool {
        self.packages.is_empty() || self.packages.contains(&package_id)
    }
}

/// Tax rule supplied by the tax provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxRule {
    pub id: TaxRuleId,
    pub name: String,
    /// Level 1 taxes apply to the price; higher levels may cascade
    pub level: u8,
    /// Percentage rate
    pub rate: Decimal,
}

// =============================================================================
// Service State
// =============================================================================

/// Current state of a customer's service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceState {
    pub id: ServiceId,
    pub package: Package,
    pub pricing: PackagePricing,
    pub qty: u32,
    /// Replaces the package price times quantity when set
    #[serde(default)]
    pub override_price: Option<Decimal>,
    #[serde(default)]
    pub options: Vec<ServiceOption>,
}

/// An option value currently assigned to a service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOption {
    pub option_id: OptionId,
    pub label: String,
    pub value_id: OptionValueId,
    pub value_name: String,
    pub qty: u32,
    pub price: Decimal,
    #[serde(default)]
    pub setup_fee: Decimal,
    #[serde(default)]
    pub cancel_fee: Decimal,
}

/// Requested change to a service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub qty: u32,
    #[serde(default)]
    pub override_price: Option<Decimal>,
    #[serde(default)]
    pub options: Vec<OptionSelection>,
}

/// An option value selected in a change request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSelection {
    pub option_id: OptionId,
    pub value_id: OptionValueId,
    pub qty: u32,
}

// =============================================================================
// Tests
// =============================================================================
