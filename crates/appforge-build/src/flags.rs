//! Go toolchain flag construction

use crate::info::{BuildInfo, Experimental};

/// Build tag that enables experimental features
pub const EXPERIMENTAL_TAG: &str = "experimental";

/// Package, relative to the module path, holding the injected variables
pub const VERSION_PACKAGE: &str = "internal";

/// Build tags flag: `-tags=experimental` when enabled, `-tags=` otherwise
pub fn tags(experimental: &Experimental) -> String {
    let mut tags = String::from("-tags=");
    if experimental.is_enabled() {
        tags.push_str(EXPERIMENTAL_TAG);
    }
    tags
}

/// Variables injected at link time, in flag order
pub fn linker_vars(info: &BuildInfo) -> [(&'static str, &str); 4] {
    [
        ("GitCommit", info.commit.as_str()),
        ("Version", info.version.as_str()),
        ("Experimental", info.experimental.as_str()),
        ("BuildTime", info.build_time.as_str()),
    ]
}

/// Linker flags: strip symbols and inject version metadata into `<package>/internal`
pub fn ldflags(package: &str, info: &BuildInfo) -> String {
    let mut flags = String::from("-ldflags=-s -w");
    for (name, value) in linker_vars(info) {
        flags.push_str(&format!(" -X {}/{}.{}={}", package, VERSION_PACKAGE, name, value));
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn info(experimental: &str) -> BuildInfo {
        BuildInfo::new(
            "abc1234",
            "v0.6.0",
            Experimental::new(experimental),
            "2018-07-30T10:20:30+02:00",
        )
    }

    #[test]
    fn test_tags_on_off() {
        assert_eq!(tags(&Experimental::new("on")), "-tags=experimental");
        assert_eq!(tags(&Experimental::new("off")), "-tags=");
    }

    #[test]
    fn test_ldflags_format() {
        assert_eq!(
            ldflags("github.com/docker/app", &info("off")),
            "-ldflags=-s -w \
             -X github.com/docker/app/internal.GitCommit=abc1234 \
             -X github.com/docker/app/internal.Version=v0.6.0 \
             -X github.com/docker/app/internal.Experimental=off \
             -X github.com/docker/app/internal.BuildTime=2018-07-30T10:20:30+02:00"
        );
    }

    #[test]
    fn test_ldflags_keeps_raw_experimental_value() {
        let flags = ldflags("example.com/app", &info("maybe"));
        assert!(flags.contains("example.com/app/internal.Experimental=maybe"));
    }
}
