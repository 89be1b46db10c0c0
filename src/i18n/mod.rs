//! Multi-language support.
//!
//! - `registry`: the languages an operator may enable and the add/remove
//!   operations that keep a settings document's language set valid
//! - `strings`: user-facing messages of the admin surface
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::i18n::LanguageRegistry;
//!
//! let registry = LanguageRegistry::from_defaults(&defaults);
//! let settings = registry.add(&settings, "sv")?;
//! ```

pub mod registry;
pub mod strings;

pub use registry::{select_language, LanguageRegistry, RegistryError};
pub use strings::{AdminStrings, ENGLISH_STRINGS};
