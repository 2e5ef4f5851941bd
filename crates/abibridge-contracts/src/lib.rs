//! Shared, version-pinned identifiers.
//!
//! These constants are the single source of truth for schema/version strings that
//! appear in machine-readable I/O and in the header of generated bindings.

pub const GENERATOR_NAME: &str = "abibridge";

pub const ABIBRIDGE_CONFIG_SCHEMA_VERSION: &str = "abibridge.config@0.1.0";
pub const ABIBRIDGE_BATCH_REPORT_SCHEMA_VERSION: &str = "abibridge.batch.report@0.1.0";

pub const DEFAULT_CONFIG_FILE_NAME: &str = "abibridge.json";
pub const DEFAULT_RUNTIME_MODULE: &str = "lamington";
pub const DEFAULT_ABI_INCLUDE_GLOB: &str = "**/*.abi";
