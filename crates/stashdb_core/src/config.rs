//! Storage and autosave configuration.

use stashdb_codec::{Codec, DEFAULT_MAX_CHUNK_LEN};
use stashdb_storage::SqlExecutor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Per-storage behaviour.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Largest chunk payload written to a relational backend, in bytes.
    pub max_chunk_len: usize,

    /// Transform applied to serialized values. Flat-file storages always
    /// use [`Codec::Identity`].
    pub codec: Codec,

    /// Put a uniqueness constraint on the relational `value` column.
    pub unique_value_column: bool,

    /// Yield to the runtime between keys of a save sweep.
    pub yield_between_keys: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_chunk_len: DEFAULT_MAX_CHUNK_LEN,
            codec: Codec::Identity,
            unique_value_column: false,
            yield_between_keys: true,
        }
    }
}

impl StorageConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest chunk payload.
    #[must_use]
    pub const fn max_chunk_len(mut self, len: usize) -> Self {
        self.max_chunk_len = len;
        self
    }

    /// Sets the value codec.
    #[must_use]
    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Sets whether the relational value column is unique.
    #[must_use]
    pub const fn unique_value_column(mut self, value: bool) -> Self {
        self.unique_value_column = value;
        self
    }

    /// Sets whether sweeps yield between keys.
    #[must_use]
    pub const fn yield_between_keys(mut self, value: bool) -> Self {
        self.yield_between_keys = value;
        self
    }
}

/// Everything [`StorageRegistry::create_storage`](crate::StorageRegistry::create_storage)
/// needs to build a backend.
#[derive(Debug, Clone, Default)]
pub struct StorageOptions {
    /// File path for flat-file kinds. Defaults to the storage name.
    pub path: Option<PathBuf>,

    /// SQL executor for relational kinds.
    pub executor: Option<Arc<dyn SqlExecutor>>,

    /// Storage behaviour.
    pub config: StorageConfig,
}

impl StorageOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the file path.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the SQL executor.
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn SqlExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Sets the storage configuration.
    #[must_use]
    pub fn config(mut self, config: StorageConfig) -> Self {
        self.config = config;
        self
    }
}

/// Shortest period an autosave task ticks at.
pub const MIN_AUTOSAVE_PERIOD: Duration = Duration::from_millis(1);

/// Periodic save settings.
///
/// Hosts that count time in ticks can convert with
/// [`from_ticks`](Self::from_ticks) and [`period_ticks`](Self::period_ticks).
/// Periods shorter than [`MIN_AUTOSAVE_PERIOD`] (including zero) run at
/// that minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Time between sweeps.
    pub period: Duration,

    /// Host ticks per second.
    pub ticks_per_second: u32,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(30 * 60), // 30 minutes
            ticks_per_second: 20,
        }
    }
}

impl AutosaveConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration whose period is `ticks` host ticks at the
    /// default tick rate.
    #[must_use]
    pub fn from_ticks(ticks: u64) -> Self {
        Self::default().period_in_ticks(ticks)
    }

    /// Sets the period.
    #[must_use]
    pub const fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Sets the host tick rate. Zero is treated as one.
    #[must_use]
    pub const fn ticks_per_second(mut self, rate: u32) -> Self {
        self.ticks_per_second = if rate == 0 { 1 } else { rate };
        self
    }

    /// Sets the period as a number of ticks at the current tick rate.
    #[must_use]
    pub fn period_in_ticks(mut self, ticks: u64) -> Self {
        let rate = u64::from(self.ticks_per_second.max(1));
        self.period = Duration::from_millis(ticks.saturating_mul(1000) / rate);
        self
    }

    /// The period a task actually ticks at: [`period`](Self::period)
    /// raised to at least [`MIN_AUTOSAVE_PERIOD`].
    #[must_use]
    pub fn effective_period(&self) -> Duration {
        self.period.max(MIN_AUTOSAVE_PERIOD)
    }

    /// The period expressed in host ticks.
    #[must_use]
    pub fn period_ticks(&self) -> u64 {
        let millis = u64::try_from(self.period.as_millis()).unwrap_or(u64::MAX);
        millis.saturating_mul(u64::from(self.ticks_per_second)) / 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_storage_config() {
        let config = StorageConfig::default();
        assert_eq!(config.max_chunk_len, u32::MAX as usize);
        assert_eq!(config.codec.name(), "identity");
        assert!(!config.unique_value_column);
        assert!(config.yield_between_keys);
    }

    #[test]
    fn builder_pattern() {
        let config = StorageConfig::new()
            .max_chunk_len(1024)
            .codec(Codec::Compress)
            .unique_value_column(true)
            .yield_between_keys(false);

        assert_eq!(config.max_chunk_len, 1024);
        assert_eq!(config.codec.name(), "compress");
        assert!(config.unique_value_column);
        assert!(!config.yield_between_keys);
    }

    #[test]
    fn options_default_to_name_path() {
        let options = StorageOptions::new();
        assert!(options.path.is_none());
        assert!(options.executor.is_none());
        assert_eq!(StorageOptions::new().path("a.yml").path, Some("a.yml".into()));
    }

    #[test]
    fn autosave_default_is_thirty_minutes_of_ticks() {
        let config = AutosaveConfig::default();
        assert_eq!(config.period, Duration::from_secs(1800));
        assert_eq!(config.period_ticks(), 30 * 60 * 20);
    }

    #[test]
    fn autosave_tick_conversion() {
        let config = AutosaveConfig::from_ticks(40);
        assert_eq!(config.period, Duration::from_secs(2));

        let config = AutosaveConfig::new().ticks_per_second(10).period_in_ticks(5);
        assert_eq!(config.period, Duration::from_millis(500));
        assert_eq!(config.period_ticks(), 5);
        assert_eq!(AutosaveConfig::new().ticks_per_second(0).ticks_per_second, 1);
    }

    #[test]
    fn zero_period_is_raised_to_minimum() {
        assert_eq!(AutosaveConfig::from_ticks(0).period, Duration::ZERO);
        assert_eq!(AutosaveConfig::from_ticks(0).effective_period(), MIN_AUTOSAVE_PERIOD);
        assert_eq!(
            AutosaveConfig::new().period(Duration::ZERO).effective_period(),
            MIN_AUTOSAVE_PERIOD
        );
        assert_eq!(
            AutosaveConfig::from_ticks(40).effective_period(),
            Duration::from_secs(2)
        );
    }
}
