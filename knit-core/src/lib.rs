//! Declarative settings composition for multi-unit builds.
//!
//! A [`Workspace`] is declared once, either through a [`RegistryBuilder`] or a workspace file
//! (see [`defs`]), and validated as a whole. Afterwards every build unit can be resolved into
//! its final configuration:
//!
//! 1. every global bundle, in registration order,
//! 2. every conditional bundle that applies to the unit, in registration order,
//! 3. the unit's own settings.
//!
//! Later assignments to the same key win.

pub mod cfgs;
pub mod defs;
mod error;
pub mod load;
mod registry;
mod resolve;
mod unit;

pub use error::{LoadError, ResolveError};
pub use registry::{ConditionalBundle, RegistryBuilder, Workspace};
pub use resolve::{Origin, ResolvedConfig, ResolvedEntry};
pub use unit::{BuildUnit, BuildUnitBuilder};

pub use knit_types::{Key, KeyError, Setting, SettingsBundle, SettingsBundleBuilder, Trigger, Value};
