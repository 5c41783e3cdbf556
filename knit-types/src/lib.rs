//! Types used throughout `knit`.
//!
//! The goal of this crate is to be very lightweight, so take care with adding dependencies.

mod bundle;
mod key;
mod value;

pub use bundle::{Setting, SettingsBundle, SettingsBundleBuilder, Trigger};
pub use key::{Key, KeyError};
pub use value::Value;
