// Build-time identity from Cargo.toml, reported by GET /version and the push User-Agent

/// Package version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
