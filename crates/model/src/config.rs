use std::time::Duration;

/// Recommended default stream chunk size (1 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 20;

/// Default number of write attempts per file before giving up.
pub const DEFAULT_RETRIES: u32 = 3;

/// Process-wide synchronizer options.
///
/// Assembled once at program entry from parsed command-line arguments and
/// passed by reference to the [`Synchronizer`](../sync/struct.Synchronizer.html)
/// for the lifetime of a run. `Config` is never mutated mid-run: threading it
/// explicitly instead of reading it from ambient global state keeps the core
/// synchronization logic free of hidden inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Size, in bytes, of each chunk read from a source stream or written to
    /// the destination, and of each block fed into the MD5 hasher.
    pub buffer_size: usize,
    /// Number of write attempts made per file before the run is declared a
    /// fatal failure.
    pub retries: u32,
    /// Delay observed between successive file copies.
    pub delay: Duration,
    /// When true, files present in the index but absent from the source are
    /// deleted from the destination after a successful copy pass.
    pub destructive: bool,
    /// When true, progress and reporting side effects are replaced with
    /// no-ops.
    pub silent: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            retries: DEFAULT_RETRIES,
            delay: Duration::ZERO,
            destructive: false,
            silent: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_recommendations() {
        let config = Config::default();
        assert_eq!(config.buffer_size, 1 << 20);
        assert_eq!(config.retries, 3);
        assert_eq!(config.delay, Duration::ZERO);
        assert!(!config.destructive);
        assert!(!config.silent);
    }
}
