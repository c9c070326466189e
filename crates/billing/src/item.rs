//! Priced line items
//!
//! An [`Item`] is a single priced line: a recurring fee, setup fee, cancellation
//! fee, or option charge. Items carrying [`ItemMeta`] are the "meta items" the
//! change engine tags with a lifecycle state and describes for display.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tallyhost_shared::{OptionId, OptionValueId, PackageId, ServiceId, Term};

use crate::error::BillingError;
use crate::pricing::{self, Discount, TaxGroup};

// =============================================================================
// Keys
// =============================================================================

/// What a key is anchored to: an existing service or a catalog package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyScope {
    Service(ServiceId),
    Package(PackageId),
}

/// Fee suffix of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyFee {
    Recurring,
    Setup,
    Cancel,
}

/// Structured item key, e.g. `service-12-option-4-setup`
///
/// Two items describe the same billable concept exactly when their keys are
/// equal. The string form is `<scope>-<id>[-option-<id>][-setup|-cancel]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemKey {
    pub scope: KeyScope,
    pub option: Option<OptionId>,
    pub fee: KeyFee,
}

impl ItemKey {
    pub fn service(service_id: ServiceId) -> Self {
        Self {
            scope: KeyScope::Service(service_id),
            option: None,
            fee: KeyFee::Recurring,
        }
    }

    pub fn package(package_id: PackageId) -> Self {
        Self {
            scope: KeyScope::Package(package_id),
            option: None,
            fee: KeyFee::Recurring,
        }
    }

    pub fn with_option(mut self, option_id: OptionId) -> Self {
        self.option = Some(option_id);
        self
    }

    pub fn with_fee(mut self, fee: KeyFee) -> Self {
        self.fee = fee;
        self
    }

    /// Same key anchored to a different scope
    pub fn rescoped(mut self, scope: KeyScope) -> Self {
        self.scope = scope;
        self
    }

    /// Same key with the fee suffix stripped
    pub fn without_fee(self) -> Self {
        self.with_fee(KeyFee::Recurring)
    }

    pub fn is_setup(&self) -> bool {
        self.fee == KeyFee::Setup
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scope {
            KeyScope::Service(id) => write!(f, "service-{}", id)?,
            KeyScope::Package(id) => write!(f, "package-{}", id)?,
        }
        if let Some(option_id) = self.option {
            write!(f, "-option-{}", option_id)?;
        }
        match self.fee {
            KeyFee::Recurring => Ok(()),
            KeyFee::Setup => write!(f, "-setup"),
            KeyFee::Cancel => write!(f, "-cancel"),
        }
    }
}

impl std::str::FromStr for ItemKey {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn parse_id(raw: &str) -> Option<u64> {
            raw.parse().ok()
        }

        let invalid = || BillingError::InvalidKey(s.to_string());
        let parts: Vec<&str> = s.split('-').collect();

        let (scope, rest) = match parts.as_slice() {
            ["service", raw, rest @ ..] => {
                let id = parse_id(raw).ok_or_else(invalid)?;
                (KeyScope::Service(ServiceId(id)), rest)
            }
            ["package", raw, rest @ ..] => {
                let id = parse_id(raw).ok_or_else(invalid)?;
                (KeyScope::Package(PackageId(id)), rest)
            }
            _ => return Err(invalid()),
        };

        let (option, rest) = match rest {
            ["option", raw, rest @ ..] => {
                let id = parse_id(raw).ok_or_else(invalid)?;
                (Some(OptionId(id)), rest)
            }
            rest => (None, rest),
        };

        let fee = match rest {
            [] => KeyFee::Recurring,
            ["setup"] => KeyFee::Setup,
            ["cancel"] => KeyFee::Cancel,
            _ => return Err(invalid()),
        };

        Ok(Self { scope, option, fee })
    }
}

impl TryFrom<String> for ItemKey {
    type Error = BillingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ItemKey> for String {
    fn from(key: ItemKey) -> Self {
        key.to_string()
    }
}

// =============================================================================
// Meta
// =============================================================================

/// Which fee a meta item represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeType {
    Recurring,
    Setup,
    Cancel,
}

impl From<KeyFee> for FeeType {
    fn from(fee: KeyFee) -> Self {
        match fee {
            KeyFee::Recurring => Self::Recurring,
            KeyFee::Setup => Self::Setup,
            KeyFee::Cancel => Self::Cancel,
        }
    }
}

/// Whether a meta item prices the package itself or one of its options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Package,
    Option,
}

/// Lifecycle state assigned while pairing old and new items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Added,
    Removed,
    Updated,
    #[default]
    Unchanged,
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Removed => write!(f, "removed"),
            Self::Updated => write!(f, "updated"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Option value referenced by an option item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRef {
    pub option_id: OptionId,
    pub label: String,
    pub value_id: OptionValueId,
    pub value_name: String,
}

/// Records an item was built from, used to describe it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaRefs {
    pub service_id: Option<ServiceId>,
    pub package_id: PackageId,
    pub package_name: String,
    pub term: Term,
    pub qty: u32,
    pub option: Option<OptionRef>,
}

/// Lifecycle annotation carried by meta items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMeta {
    #[serde(rename = "type")]
    pub fee: FeeType,
    pub item_type: ItemType,
    pub state: ItemState,
    pub refs: MetaRefs,
}

impl ItemMeta {
    pub fn new(fee: FeeType, item_type: ItemType, refs: MetaRefs) -> Self {
        Self {
            fee,
            item_type,
            state: ItemState::Unchanged,
            refs,
        }
    }

    pub fn with_state(mut self, state: ItemState) -> Self {
        self.state = state;
        self
    }
}

// =============================================================================
// Item
// =============================================================================

/// A single priced line
///
/// Items are immutable once built; the `with_*` methods consume the item and
/// return a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    key: Option<ItemKey>,
    price: Decimal,
    #[serde(default)]
    description: String,
    #[serde(default)]
    discounts: Vec<Discount>,
    #[serde(default)]
    taxes: Vec<TaxGroup>,
    #[serde(default)]
    meta: Option<ItemMeta>,
}

impl Item {
    pub fn new(key: Option<ItemKey>, price: Decimal) -> Self {
        Self {
            key,
            price,
            description: String::new(),
            discounts: Vec::new(),
            taxes: Vec::new(),
            meta: None,
        }
    }

    pub fn keyed(key: ItemKey, price: Decimal) -> Self {
        Self::new(Some(key), price)
    }

    pub fn with_key(mut self, key: Option<ItemKey>) -> Self {
        self.key = key;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_discounts(mut self, discounts: Vec<Discount>) -> Self {
        self.discounts = discounts;
        self
    }

    pub fn with_taxes(mut self, taxes: Vec<TaxGroup>) -> Self {
        self.taxes = taxes;
        self
    }

    pub fn with_meta(mut self, meta: Option<ItemMeta>) -> Self {
        self.meta = meta;
        self
    }

    /// Replace the lifecycle state; plain items are returned unchanged
    pub fn with_state(mut self, state: ItemState) -> Self {
        if let Some(meta) = self.meta.take() {
            self.meta = Some(meta.with_state(state));
        }
        self
    }

    pub fn key(&self) -> Option<&ItemKey> {
        self.key.as_ref()
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn discounts(&self) -> &[Discount] {
        &self.discounts
    }

    pub fn taxes(&self) -> &[TaxGroup] {
        &self.taxes
    }

    pub fn meta(&self) -> Option<&ItemMeta> {
        self.meta.as_ref()
    }

    pub fn state(&self) -> Option<ItemState> {
        self.meta.as_ref().map(|meta| meta.state)
    }

    pub fn subtotal(&self) -> Decimal {
        self.price
    }

    pub fn discount_amount(&self) -> Decimal {
        pricing::discount_amount(self.price, &self.discounts)
    }

    pub fn total_after_discount(&self) -> Decimal {
        self.price - self.discount_amount()
    }

    pub fn tax_amount(&self) -> Decimal {
        pricing::tax_amount(self.total_after_discount(), &self.taxes)
    }

    pub fn total(&self) -> Decimal {
        self.total_after_discount() + self.tax_amount()
    }
}
