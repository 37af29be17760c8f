//! Manager parameters and synthesis-flow settings.

use std::path::PathBuf;

use log::warn;

use crate::flow::ReorderMethod;
use crate::sifting::{GrowthLimit, SiftingMethod};
use crate::types::DecompositionType;
use crate::utils::PRIMES;

/// Parameters of a [`Kfdd`][crate::kfdd::Kfdd] manager.
///
/// # Examples
///
/// ```
/// use kfdd_rs::config::KfddConfig;
/// use kfdd_rs::types::DecompositionType;
///
/// let config = KfddConfig::default()
///     .with_ct_hashsize(10007)
///     .with_default_decomposition(DecompositionType::PositiveDavio);
/// assert_eq!(config.ct_searchlen, 3);
/// ```
#[derive(Debug, Clone)]
pub struct KfddConfig {
    /// Initial unique-table size, as an index into the prime table.
    pub ut_hashsize: usize,
    /// Number of computed-table buckets.
    pub ct_hashsize: usize,
    /// Maximum number of entries per computed-table bucket.
    pub ct_searchlen: usize,
    /// Capacity of the recycler ring.
    pub rc_cachesize: usize,
    /// Maximum number of primaries (inputs plus outputs).
    pub pi_limit: usize,
    /// Node budget. Exceeding it sets the overflow status.
    pub node_limit: usize,
    pub explode_factor: f64,
    pub implode_factor: f64,
    /// Decomposition type for new inputs.
    pub default_decomposition: DecompositionType,
    /// Maximum primary name length in bytes.
    pub name_limit: usize,
    /// Seed of the random sifting order.
    pub seed: u64,
}

impl Default for KfddConfig {
    fn default() -> Self {
        Self {
            ut_hashsize: 0,
            ct_hashsize: 5003,
            ct_searchlen: 3,
            rc_cachesize: 1000,
            pi_limit: 5000,
            node_limit: 1_000_000_000,
            explode_factor: 4.0,
            implode_factor: 0.5,
            default_decomposition: DecompositionType::Shannon,
            name_limit: 50,
            seed: 0,
        }
    }
}

impl KfddConfig {
    pub fn with_ut_hashsize(mut self, prime_index: usize) -> Self {
        self.ut_hashsize = prime_index.min(PRIMES.len() - 1);
        self
    }

    pub fn with_ct_hashsize(mut self, size: usize) -> Self {
        self.ct_hashsize = size;
        self
    }

    pub fn with_ct_searchlen(mut self, len: usize) -> Self {
        self.ct_searchlen = len;
        self
    }

    pub fn with_rc_cachesize(mut self, size: usize) -> Self {
        self.rc_cachesize = size;
        self
    }

    pub fn with_pi_limit(mut self, limit: usize) -> Self {
        self.pi_limit = limit;
        self
    }

    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = limit;
        self
    }

    pub fn with_default_decomposition(mut self, dtl: DecompositionType) -> Self {
        self.default_decomposition = dtl;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Settings of the reorder-then-synthesize flow.
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub reordering: ReorderMethod,
    pub sift_factor: f64,
    pub growth_limit: GrowthLimit,
    pub sifting_method: SiftingMethod,
    pub default_decomposition: DecompositionType,
    /// Synthesize from complemented edges (true) or from the complement-free view.
    pub complemented_edges: bool,
    /// Write the final variable order here.
    pub order_dump: Option<PathBuf>,
    /// Establish the order in this file before reordering.
    pub order_file: Option<PathBuf>,
    /// Seed for the random sifting order.
    pub seed: u64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            reordering: ReorderMethod::None,
            sift_factor: 2.5,
            growth_limit: GrowthLimit::Absolute,
            sifting_method: SiftingMethod::Verify,
            default_decomposition: DecompositionType::Shannon,
            complemented_edges: true,
            order_dump: None,
            order_file: None,
            seed: 0,
        }
    }
}

impl SynthesisSettings {
    /// Build settings from named options.
    ///
    /// Unknown keys and values that do not parse are reported with a warning
    /// and leave the default in place.
    ///
    /// # Examples
    ///
    /// ```
    /// use kfdd_rs::config::SynthesisSettings;
    /// use kfdd_rs::flow::ReorderMethod;
    ///
    /// let settings = SynthesisSettings::from_options([
    ///     ("reordering", "6"),
    ///     ("sift_factor", "oops"),
    /// ]);
    /// assert_eq!(settings.reordering, ReorderMethod::Sifting);
    /// assert_eq!(settings.sift_factor, 2.5);
    /// ```
    pub fn from_options<K, V>(options: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        for (key, value) in options {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            let ok = match key {
                "reordering" => value
                    .parse()
                    .ok()
                    .and_then(ReorderMethod::from_code)
                    .map(|m| settings.reordering = m)
                    .is_some(),
                "sift_factor" => value
                    .parse::<f64>()
                    .ok()
                    .filter(|f| *f >= 1.0)
                    .map(|f| settings.sift_factor = f)
                    .is_some(),
                "sifting_growth_limit" => single_char(value)
                    .and_then(GrowthLimit::from_code)
                    .map(|g| settings.growth_limit = g)
                    .is_some(),
                "sifting_method" => single_char(value)
                    .and_then(SiftingMethod::from_code)
                    .map(|m| settings.sifting_method = m)
                    .is_some(),
                "default_decomposition" => parse_decomposition(value)
                    .map(|d| settings.default_decomposition = d)
                    .is_some(),
                "complemented_edges" => value
                    .parse::<bool>()
                    .ok()
                    .map(|b| settings.complemented_edges = b)
                    .is_some(),
                "order_dump" => {
                    settings.order_dump = Some(PathBuf::from(value));
                    true
                }
                "order_file" => {
                    settings.order_file = Some(PathBuf::from(value));
                    true
                }
                "seed" => value.parse().ok().map(|s| settings.seed = s).is_some(),
                _ => {
                    warn!("unknown option '{}' ignored", key);
                    continue;
                }
            };
            if !ok {
                warn!("invalid value '{}' for option '{}', keeping the default", value, key);
            }
        }
        settings
    }
}

fn single_char(value: &str) -> Option<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Accepts the numeric code (0, 1, 2) or the letter (S, P, N).
fn parse_decomposition(value: &str) -> Option<DecompositionType> {
    match value.parse::<usize>() {
        Ok(i) => DecompositionType::from_index(i),
        Err(_) => single_char(value).and_then(DecompositionType::from_code),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SynthesisSettings::default();
        assert_eq!(settings.reordering, ReorderMethod::None);
        assert_eq!(settings.growth_limit, GrowthLimit::Absolute);
        assert_eq!(settings.sifting_method, SiftingMethod::Verify);
        assert!(settings.complemented_edges);

        let config = KfddConfig::default();
        assert_eq!(config.ct_hashsize, 5003);
        assert_eq!(config.rc_cachesize, 1000);
        assert_eq!(config.pi_limit, 5000);
    }

    #[test]
    fn test_from_options() {
        let settings = SynthesisSettings::from_options([
            ("reordering", "9"),
            ("sift_factor", "1.5"),
            ("sifting_growth_limit", "r"),
            ("sifting_method", "g"),
            ("default_decomposition", "P"),
            ("complemented_edges", "false"),
            ("order_dump", "/tmp/x.order"),
        ]);
        assert_eq!(settings.reordering, ReorderMethod::SiftingDtlLines);
        assert_eq!(settings.sift_factor, 1.5);
        assert_eq!(settings.growth_limit, GrowthLimit::Relative);
        assert_eq!(settings.sifting_method, SiftingMethod::Greatest);
        assert_eq!(settings.default_decomposition, DecompositionType::PositiveDavio);
        assert!(!settings.complemented_edges);
        assert_eq!(settings.order_dump, Some(PathBuf::from("/tmp/x.order")));
    }

    #[test]
    fn test_invalid_options_fall_back() {
        let settings = SynthesisSettings::from_options([
            ("reordering", "42"),
            ("sifting_method", "xyz"),
            ("default_decomposition", "2"),
            ("no_such_option", "1"),
        ]);
        assert_eq!(settings.reordering, ReorderMethod::None);
        assert_eq!(settings.sifting_method, SiftingMethod::Verify);
        assert_eq!(settings.default_decomposition, DecompositionType::NegativeDavio);
    }
}
