use std::fmt;

/// Build metadata, fixed at compile time.
///
/// Release builds set `HEIC2PNG_BUILD_TIME` and `HEIC2PNG_RELEASE_URL` in
/// the environment of `cargo build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: &'static str,
    pub build_time: &'static str,
    pub release_url: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            build_time: match option_env!("HEIC2PNG_BUILD_TIME") {
                Some(v) => v,
                None => "unknown",
            },
            release_url: match option_env!("HEIC2PNG_RELEASE_URL") {
                Some(v) => v,
                None => "unknown",
            },
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "heic2png {}", self.version)?;
        writeln!(f, "  built on: {}", self.build_time)?;
        writeln!(f, "  release url: {}", self.release_url)
    }
}
