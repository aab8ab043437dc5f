//! Document catalog and field mapping for IntakeForge.
//!
//! - [`catalog`]: the static table of supported documents
//! - [`address`]: free-text address decomposition
//! - [`mapper`]: household → per-document target fields

pub mod address;
pub mod catalog;
pub mod mapper;

pub use address::{DEFAULT_COUNTRY, PostalAddress, address_of, decompose_address};
pub use catalog::{AccountType, CATALOG, DocumentKind, DocumentTypeSpec, FIELD_PREFIXES, lookup};
pub use mapper::{
    DEFAULT_FIRM, MAX_ADVISOR_ACCOUNTS, MappingContext, MappingGap, map_fields, mapping_gaps,
};
