//! Pricing settings
//!
//! Company-level switches that shape how builders price fees and taxes.
//!
//! Configuration via environment variables:
//! - `BILLING_TAX_SETUP_FEES`: Tax setup fees (default: false)
//! - `BILLING_TAX_CANCEL_FEES`: Tax cancellation fees (default: false)
//! - `BILLING_CASCADE_TAX`: Level 2+ taxes compound on level 1 (default: false)
//! - `BILLING_PRECISION`: Decimal places used for totals (default: 2)

use serde::{Deserialize, Serialize};

use crate::error::{BillingError, BillingResult};

/// Default number of decimal places for presented totals
pub const DEFAULT_PRECISION: u32 = 2;

/// Largest precision accepted from configuration
const MAX_PRECISION: u32 = 8;

/// Settings shared by the old-state and new-state builders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSettings {
    pub tax_setup_fees: bool,
    pub tax_cancel_fees: bool,
    pub cascade_tax: bool,
    pub precision: u32,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            tax_setup_fees: false,
            tax_cancel_fees: false,
            cascade_tax: false,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl PricingSettings {
    /// Load settings from environment variables
    pub fn from_env() -> BillingResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> BillingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str| {
            lookup(name)
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false)
        };

        let precision = match lookup("BILLING_PRECISION") {
            Some(raw) => {
                let precision: u32 = raw.trim().parse().map_err(|_| {
                    BillingError::Config(format!("BILLING_PRECISION is not a number: {}", raw))
                })?;
                if precision > MAX_PRECISION {
                    return Err(BillingError::Config(format!(
                        "BILLING_PRECISION must be at most {}",
                        MAX_PRECISION
                    )));
                }
                precision
            }
            None => DEFAULT_PRECISION,
        };

        Ok(Self {
            tax_setup_fees: flag("BILLING_TAX_SETUP_FEES"),
            tax_cancel_fees: flag("BILLING_TAX_CANCEL_FEES"),
            cascade_tax: flag("BILLING_CASCADE_TAX"),
            precision,
        })
    }
}
