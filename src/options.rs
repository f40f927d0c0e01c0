//! Write options.
//!
//! Not every adapter supports every field. Fields an adapter does not
//! understand are ignored; a zero value means "use the adapter's default".

use serde::Deserialize;

use crate::constants;

/// Options for writing an object.
///
/// `ttl` is a hint in whole seconds for backends that can expire objects
/// themselves (zero means never expire). `mode` and `dir_mode` are POSIX
/// permission bits honoured only by the filesystem adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Seconds until the stored object expires, 0 for no expiry.
    pub ttl: u64,
    /// File permission bits.
    pub mode: u32,
    /// Directory permission bits for any parent directories created.
    pub dir_mode: u32,
}

impl Options {
    /// Options with commonly used permissions: no expiry, files `0644`,
    /// directories `0755`.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            ttl: 0,
            mode: constants::STANDARD_FILE_MODE,
            dir_mode: constants::STANDARD_DIR_MODE,
        }
    }

    /// Set the expiry hint in seconds.
    #[must_use]
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the file permission bits.
    #[must_use]
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Set the directory permission bits.
    #[must_use]
    pub fn with_dir_mode(mut self, dir_mode: u32) -> Self {
        self.dir_mode = dir_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_defers_to_adapter() {
        let options = Options::default();
        assert_eq!(options.ttl, 0);
        assert_eq!(options.mode, 0);
        assert_eq!(options.dir_mode, 0);
    }

    #[test]
    fn test_standard_permissions() {
        let options = Options::standard();
        assert_eq!(options.mode, 0o644);
        assert_eq!(options.dir_mode, 0o755);
        assert_eq!(options.ttl, 0);
    }

    #[test]
    fn test_partial_deserialize() {
        let options: Options = toml::from_str("ttl = 60").unwrap();
        assert_eq!(options, Options::default().with_ttl(60));
    }
}
