//! Build metadata shared by the daemon and its ping response.
//! Includes the generated version.rs from the build script so there is a
//! single source of truth.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Wire protocol version from `[package.metadata]`, parsed into u32.
/// Falls back to 1 if the build script could not read it.
pub fn protocol_version() -> u32 {
    PROTOCOL_VERSION.parse().unwrap_or(1)
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// Crate version from Cargo.toml
pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
