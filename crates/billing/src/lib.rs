//! TallyHost Billing
//!
//! Price reconciliation for service changes. Given a service as it is billed
//! today and a requested change of package, pricing term, quantity or
//! configurable options, the [`ChangeReconciler`] produces the delta
//! [`ItemCollection`]: one line per billable concept with the signed amount
//! to charge or credit, ready to be rendered or invoiced.
//!
//! ```ignore
//! use tallyhost_billing::{ChangeDescriber, ChangeReconciler, StandardItemBuilder};
//!
//! let reconciler = ChangeReconciler::new(StandardItemBuilder, ChangeDescriber);
//! let delta = reconciler.reconcile(&service, &change, &target, &old_ctx, &new_ctx)?;
//! let totals = delta.totals(new_ctx.settings.precision);
//! ```

pub mod builder;
pub mod change;
pub mod collection;
pub mod comparator;
pub mod describe;
pub mod error;
pub mod item;
pub mod preview;
pub mod pricing;
pub mod settings;

pub use builder::{ItemBuilderFactory, PricingContext, StandardItemBuilder};
pub use change::{
    combined_description, combined_price, prune::PruneRule, ChangeReconciler, ChangeTarget,
};
pub use collection::{ItemCollection, Totals};
pub use comparator::{ItemComparator, MergeComparator};
pub use describe::{ChangeDescriber, Describer};
pub use error::{BillingError, BillingResult};
pub use item::{
    FeeType, Item, ItemKey, ItemMeta, ItemState, ItemType, KeyFee, KeyScope, MetaRefs, OptionRef,
};
pub use preview::{preview, Preview, PreviewRequest};
pub use pricing::{Discount, TaxGroup, TaxRate};
pub use settings::PricingSettings;
