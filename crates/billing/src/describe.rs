//! Line descriptions for change invoices
//!
//! A [`Describer`] renders a merged item from its new-side meta first and its
//! old-side meta second. Either may be absent.

use crate::item::{FeeType, ItemMeta, ItemState, ItemType};

/// Renders a display string for a merged item
pub trait Describer {
    fn describe(&self, new: Option<&ItemMeta>, old: Option<&ItemMeta>) -> String;
}

impl<F> Describer for F
where
    F: Fn(Option<&ItemMeta>, Option<&ItemMeta>) -> String,
{
    fn describe(&self, new: Option<&ItemMeta>, old: Option<&ItemMeta>) -> String {
        self(new, old)
    }
}

/// Default describer
///
/// Package lines read `Basic` or `Basic → Pro`, option lines read
/// `Disk: 10 GB` or `Disk: 10 GB → 20 GB`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDescriber;

impl ChangeDescriber {
    pub fn new() -> Self {
        Self
    }

    fn subject(meta: &ItemMeta) -> String {
        match (&meta.item_type, &meta.refs.option) {
            (ItemType::Option, Some(option)) => format!("{}: {}", option.label, option.value_name),
            _ => meta.refs.package_name.clone(),
        }
    }

    fn changed_subject(new: &ItemMeta, old: &ItemMeta) -> String {
        match (&new.item_type, &new.refs.option, &old.refs.option) {
            (ItemType::Option, Some(to), Some(from)) => {
                if to.value_id == from.value_id {
                    format!("{}: {}", to.label, to.value_name)
                } else {
                    format!("{}: {} → {}", to.label, from.value_name, to.value_name)
                }
            }
            _ => {
                if new.refs.package_id == old.refs.package_id {
                    new.refs.package_name.clone()
                } else {
                    format!("{} → {}", old.refs.package_name, new.refs.package_name)
                }
            }
        }
    }
}

impl Describer for ChangeDescriber {
    fn describe(&self, new: Option<&ItemMeta>, old: Option<&ItemMeta>) -> String {
        let Some(new) = new else {
            return old.map(Self::subject).unwrap_or_default();
        };

        let mut line = match (new.state, old) {
            (ItemState::Updated, Some(old)) => Self::changed_subject(new, old),
            _ => Self::subject(new),
        };
        if new.refs.qty > 1 {
            line.push_str(&format!(" (x{})", new.refs.qty));
        }
        match new.fee {
            FeeType::Recurring => {}
            FeeType::Setup => line.push_str(" setup fee"),
            FeeType::Cancel => line.push_str(" cancellation fee"),
        }
        if new.state == ItemState::Removed {
            line.insert_str(0, "Remove ");
        }
        line
    }
}
