//! Billing error types

use tallyhost_shared::{OptionId, OptionValueId, PackageId, Term};
use thiserror::Error;

/// Billing-specific errors
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Invalid item key: {0}")]
    InvalidKey(String),

    #[error("Option {0} is not offered by package {1}")]
    OptionNotFound(OptionId, PackageId),

    #[error("Option {option_id} has no value {value_id}")]
    OptionValueNotFound {
        option_id: OptionId,
        value_id: OptionValueId,
    },

    #[error("No pricing for option {option_id} value {value_id} on term {term}")]
    PricingNotFound {
        option_id: OptionId,
        value_id: OptionValueId,
        term: Term,
    },

    #[error("Item builder failed: {0}")]
    Builder(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type BillingResult<T> = Result<T, BillingError>;
