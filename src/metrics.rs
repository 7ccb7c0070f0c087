//! Cached selector metrics.

/// Snapshot of a cached selector's counters.
///
/// # Example
///
/// ```
/// use selector_cache::{CachedSelector, Dependents};
///
/// let selector = CachedSelector::new(|_: &Dependents, _| 1, |_: &(), _| Dependents::new().with("k", 1));
/// selector.select(&(), &[]);
/// selector.select(&(), &[]);
///
/// let metrics = selector.metrics();
/// assert_eq!(metrics.hits, 1);
/// assert_eq!(metrics.misses, 1);
/// println!("Hit rate: {:.2}%", metrics.hit_rate() * 100.0);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorMetrics {
	/// Calls answered from the cache.
	pub hits: u64,
	/// Calls that invoked the selector.
	pub misses: u64,
	/// Calls short-circuited because the dependents record was empty.
	pub invalid_dependents: u64,
	/// Calls flagged for composite arguments (development mode only).
	pub unstable_arguments: u64,
	/// Dead object branches removed by sweeps.
	pub swept_branches: u64,
	/// Memoized results reachable through live branches at snapshot time.
	pub entry_count: usize,
}

impl SelectorMetrics {
	/// Ratio of hits to cached lookups, between 0.0 and 1.0.
	///
	/// Returns 0.0 if nothing has been looked up yet.
	pub fn hit_rate(&self) -> f64 {
		let total = self.hits + self.misses;
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}

	/// Every call, including short-circuited ones.
	pub fn total_calls(&self) -> u64 {
		self.hits + self.misses + self.invalid_dependents
	}
}
