//! Go package listing split into unit and end-to-end sets

use serde::Serialize;

/// Import path suffix marking end-to-end test packages
pub const E2E_SUFFIX: &str = "/e2e";

/// Packages grouped by how their tests run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageSets {
    /// Packages tested by `go test` directly
    pub unit: Vec<String>,
    /// Packages whose path ends in `/e2e`
    pub e2e: Vec<String>,
}

/// Whether `package` is an end-to-end test package
pub fn is_e2e_package(package: &str) -> bool {
    package.ends_with(E2E_SUFFIX)
}

/// Partition newline-separated `go list` output
///
/// Order is preserved within each set. Blank lines are dropped.
pub fn partition_packages(listing: &str) -> PackageSets {
    let (e2e, unit) = listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .partition(|package| is_e2e_package(package));
    PackageSets { unit, e2e }
}
