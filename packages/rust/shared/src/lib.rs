//! Shared types, error model, and configuration for footprint.
//!
//! This crate is the foundation depended on by all other footprint crates.
//! It provides:
//! - [`FootprintError`]: the unified error type
//! - Domain types ([`Profile`], [`ProfileFragment`], [`Item`], [`Category`], [`Link`])
//! - Configuration ([`AppConfig`], [`AuditConfig`], [`FetchConfig`], [`OracleConfig`])

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AuditConfig, AuditSection, FetchConfig, FetchSection, OracleConfig, OracleSection,
    RendererKind, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_api_key,
};
pub use error::{FootprintError, Result};
pub use types::{
    Category, FieldMap, Item, Link, PORTFOLIO_URL, Profile, ProfileFragment, Section,
    is_empty_value,
};
