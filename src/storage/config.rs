//! Store configuration.

use std::time::Duration;

/// Default time-to-live for records created without an explicit TTL.
pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

/// Smallest TTL a record can be given. Shorter inputs are clamped up.
pub const MIN_TTL: Duration = Duration::from_secs(1);

/// Largest TTL a record can be given (10 years). Longer inputs are clamped
/// down so deadlines always fit in an `Instant`.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Number of recent access instants kept per record.
pub const DEFAULT_ACCESS_LOG_CAPACITY: usize = 10;

/// Interval between sweeper ticks.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Characters generated aliases are drawn from.
pub const DEFAULT_ALIAS_ALPHABET: &str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Length of generated aliases.
pub const DEFAULT_ALIAS_LENGTH: usize = 8;

/// Configuration for an [`AliasStore`](crate::storage::AliasStore) and its sweeper.
///
/// # Example
///
/// ```
/// use flashlink::storage::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_default_ttl(Duration::from_secs(300))
///     .with_access_log_capacity(20);
/// assert_eq!(config.access_log_capacity, 20);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// TTL used when the caller omits one (default: 120s)
    pub default_ttl: Duration,

    /// Lower bound applied to every TTL (default: 1s)
    pub min_ttl: Duration,

    /// Upper bound applied to every TTL (default: 10 years)
    pub max_ttl: Duration,

    /// Capacity of each record's access log (default: 10)
    pub access_log_capacity: usize,

    /// Interval between sweeper ticks (default: 1s)
    pub sweep_interval: Duration,

    /// Alphabet for generated aliases
    pub alias_alphabet: String,

    /// Length of generated aliases (default: 8)
    pub alias_length: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            min_ttl: MIN_TTL,
            max_ttl: MAX_TTL,
            access_log_capacity: DEFAULT_ACCESS_LOG_CAPACITY,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            alias_alphabet: DEFAULT_ALIAS_ALPHABET.to_string(),
            alias_length: DEFAULT_ALIAS_LENGTH,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_min_ttl(mut self, ttl: Duration) -> Self {
        self.min_ttl = ttl;
        self
    }

    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        self
    }

    pub fn with_access_log_capacity(mut self, capacity: usize) -> Self {
        self.access_log_capacity = capacity;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the alphabet and length used for generated aliases.
    ///
    /// Characters outside `[A-Za-z0-9_-]` would produce aliases that fail
    /// format validation, so they are dropped.
    pub fn with_alias_shape(mut self, alphabet: impl Into<String>, length: usize) -> Self {
        self.alias_alphabet = alphabet
            .into()
            .chars()
            .filter(|c| crate::alias::is_alias_char(*c))
            .collect();
        self.alias_length = length;
        self
    }

    /// Clamps a requested TTL into `min_ttl..=max_ttl`.
    ///
    /// The upper bound wins if the two are misconfigured.
    #[inline]
    pub fn clamp_ttl(&self, ttl: Duration) -> Duration {
        ttl.max(self.min_ttl).min(self.max_ttl)
    }

    /// Converts a signed TTL in seconds into a clamped duration.
    pub fn ttl_from_secs(&self, secs: i64) -> Duration {
        let secs = u64::try_from(secs).unwrap_or(0);
        self.clamp_ttl(Duration::from_secs(secs))
    }
}
