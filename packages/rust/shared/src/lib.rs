//! Shared types, error model, and configuration for IntakeForge.
//!
//! This crate is the foundation depended on by all other IntakeForge crates.
//! It provides:
//! - [`IntakeForgeError`] — the unified error type
//! - Domain types ([`PersonRecord`], [`HouseholdRecord`], [`TargetFieldMap`], [`CanonicalField`])
//! - Name splitting shared by normalization and document mapping
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod names;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AdvisorConfig, AppConfig, BrandingConfig, DefaultsConfig, config_dir, config_file_path,
    expand_home, init_config, load_config, load_config_from,
};
pub use error::{ACCEPTED_LAYOUTS, IntakeForgeError, Result};
pub use names::{NameParts, join_name, split_full_name};
pub use types::{
    CO_HOLDER_DOB_KEY, CO_HOLDER_NAME_KEY, CanonicalField, HouseholdId, HouseholdRecord,
    NOTES_SEPARATOR, PASSTHROUGH_LIMIT, PartySummary, PassthroughField, PersonRecord, TargetField,
    TargetFieldMap,
};
