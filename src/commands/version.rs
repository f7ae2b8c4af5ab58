//! Command: print version information.

/// Version string: the build-time `HOSTTUNE_VERSION`, else the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("HOSTTUNE_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the hosttune version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("hosttune {}", version());
}
