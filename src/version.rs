//! Build metadata embedded by vergen at compile time.

use std::fmt;

use serde::Serialize;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The crate version plus whatever git state was visible at build time.
///
/// Builds outside a git checkout carry no branch or sha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub branch: Option<&'static str>,
    pub sha: Option<&'static str>,
    pub dirty: bool,
}

impl BuildInfo {
    /// Metadata of the running build.
    pub fn current() -> Self {
        Self {
            version: PKG_VERSION,
            branch: option_env!("VERGEN_GIT_BRANCH"),
            sha: option_env!("VERGEN_GIT_SHA"),
            dirty: option_env!("VERGEN_GIT_DIRTY") == Some("true"),
        }
    }

    /// First seven characters of the commit sha.
    pub fn short_sha(&self) -> Option<&'static str> {
        self.sha.map(|sha| sha.get(..7).unwrap_or(sha))
    }
}

/// `{version}`, or `{version}+{branch}.{sha}[.dirty]` when git state is known.
impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.version)?;
        if self.branch.is_none() && self.sha.is_none() {
            return Ok(());
        }
        write!(
            f,
            "+{}.{}",
            self.branch.unwrap_or("unknown"),
            self.short_sha().unwrap_or("unknown")
        )?;
        if self.dirty {
            f.write_str(".dirty")?;
        }
        Ok(())
    }
}

/// [`BuildInfo::current`] rendered for logs and the health status.
pub fn version_string() -> String {
    BuildInfo::current().to_string()
}
