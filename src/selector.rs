#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::builder::{CachedSelectorBuilder, DependentsFn, Mode, SelectorFn, WarningHook};
use crate::dependents::Dependents;
use crate::error::Warning;
#[cfg(feature = "metrics")]
use crate::metrics::SelectorMetrics;
use crate::trie::{DEFAULT_SWEEP_THRESHOLD, Node};
use crate::value::{Arg, args_key};

/// A selector memoized on the dependents it reads from the state.
///
/// Every call extracts a [`Dependents`] record from the state, walks a trie with one
/// level per dependent value (in sorted field order), and looks up the comma-joined
/// argument key at the node it reaches. The selector function only runs when that
/// lookup misses.
///
/// # Invalidation
///
/// There is no invalidation API. A result is recomputed when any dependent differs:
/// a primitive with another value, or an object behind another `Arc` allocation. When
/// the last `Arc` to an object dependent is dropped, every branch keyed by it becomes
/// unreachable and is swept on a later insertion, releasing the results beneath it.
///
/// # Concurrency
///
/// Calls are synchronous. The trie is guarded by a mutex that is released while the
/// selector function runs, so selectors may call other cached selectors. If two calls
/// race on the same miss, both compute and the first stored result is returned to both.
/// Results are never dropped while the mutex is held, so a result's `Drop` may call
/// back into the same selector.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
/// use selector_cache::{args, CachedSelector, Dependents};
///
/// struct Post {
///     site_id: &'static str,
/// }
///
/// struct State {
///     posts: Arc<BTreeMap<&'static str, Post>>,
/// }
///
/// let site_posts = CachedSelector::new(
///     |deps: &Dependents, args| {
///         let site = args[0].as_str().unwrap_or_default();
///         deps.get::<BTreeMap<&'static str, Post>>("posts")
///             .map(|posts| {
///                 posts
///                     .iter()
///                     .filter(|(_, p)| p.site_id == site)
///                     .map(|(id, _)| *id)
///                     .collect::<Vec<_>>()
///             })
///             .unwrap_or_default()
///     },
///     |state: &State, _| Dependents::new().with_object("posts", state.posts.clone()),
/// );
///
/// let state = State {
///     posts: Arc::new(BTreeMap::from([
///         ("id1", Post { site_id: "s1" }),
///         ("id2", Post { site_id: "s2" }),
///     ])),
/// };
///
/// let first = site_posts.select(&state, &args!["s1"]).unwrap();
/// let again = site_posts.select(&state, &args!["s1"]).unwrap();
/// assert_eq!(*first, vec!["id1"]);
/// assert!(Arc::ptr_eq(&first, &again));
/// ```
pub struct CachedSelector<S, R> {
	selector: SelectorFn<R>,
	get_dependents: DependentsFn<S>,
	mode: Mode,
	on_warning: Option<WarningHook>,
	root: Mutex<Node<R>>,
	/// Metrics: results served from the trie
	#[cfg(feature = "metrics")]
	hits: AtomicU64,
	/// Metrics: selector invocations
	#[cfg(feature = "metrics")]
	misses: AtomicU64,
	/// Metrics: calls with an empty dependents record
	#[cfg(feature = "metrics")]
	invalid_dependents: AtomicU64,
	/// Metrics: calls with composite arguments
	#[cfg(feature = "metrics")]
	unstable_arguments: AtomicU64,
	/// Metrics: dead branches removed
	#[cfg(feature = "metrics")]
	swept_branches: AtomicU64,
}

impl<S, R> CachedSelector<S, R> {
	/// Start configuring a cached selector.
	pub fn builder() -> CachedSelectorBuilder<S, R> {
		CachedSelectorBuilder::new()
	}

	/// Create a cached selector with default configuration.
	///
	/// Equivalent to the builder with both functions set, so it cannot fail.
	pub fn new<F, G>(selector: F, get_dependents: G) -> Self
	where
		F: Fn(&Dependents, &[Arg]) -> R + Send + Sync + 'static,
		G: Fn(&S, &[Arg]) -> Dependents + Send + Sync + 'static,
	{
		Self::from_parts(
			Box::new(selector),
			Box::new(get_dependents),
			Mode::default(),
			DEFAULT_SWEEP_THRESHOLD,
			None,
		)
	}

	pub(crate) fn from_parts(
		selector: SelectorFn<R>,
		get_dependents: DependentsFn<S>,
		mode: Mode,
		sweep_threshold: usize,
		on_warning: Option<WarningHook>,
	) -> Self {
		Self {
			selector,
			get_dependents,
			mode,
			on_warning,
			root: Mutex::new(Node::new(sweep_threshold)),
			#[cfg(feature = "metrics")]
			hits: AtomicU64::new(0),
			#[cfg(feature = "metrics")]
			misses: AtomicU64::new(0),
			#[cfg(feature = "metrics")]
			invalid_dependents: AtomicU64::new(0),
			#[cfg(feature = "metrics")]
			unstable_arguments: AtomicU64::new(0),
			#[cfg(feature = "metrics")]
			swept_branches: AtomicU64::new(0),
		}
	}

	/// Return the memoized result for `state` and `args`, computing it on a miss.
	///
	/// Returns `None` only when the dependents extractor yields an empty record; that
	/// call is reported as [`Warning::InvalidDependents`] and nothing is cached.
	///
	/// # Runtime Complexity
	///
	/// Expected case: O(d + a) for d dependents and an argument key of length a, plus
	/// the cost of the dependents extractor. A miss adds the cost of the selector.
	pub fn select(&self, state: &S, args: &[Arg]) -> Option<Arc<R>> {
		let dependents = (self.get_dependents)(state, args);

		if self.mode.is_development() {
			if let Some(index) = args.iter().position(Arg::is_composite) {
				#[cfg(feature = "metrics")]
				self.unstable_arguments.fetch_add(1, Ordering::Relaxed);
				self.warn(Warning::UnstableArgument {
					index,
				});
			}
		}

		if dependents.is_empty() {
			#[cfg(feature = "metrics")]
			self.invalid_dependents.fetch_add(1, Ordering::Relaxed);
			self.warn(Warning::InvalidDependents);
			return None;
		}

		let key = args_key(args);

		// Short-lived lock for the lookup
		{
			let root = self.root.lock();
			if let Some(hit) = root.find(dependents.values()).and_then(|node| node.result(&key)) {
				#[cfg(feature = "metrics")]
				self.hits.fetch_add(1, Ordering::Relaxed);
				tracing::trace!(target: "selector_cache", args_key = %key, "hit");
				return Some(Arc::clone(hit));
			}
		}

		#[cfg(feature = "metrics")]
		self.misses.fetch_add(1, Ordering::Relaxed);
		tracing::trace!(
			target: "selector_cache",
			args_key = %key,
			depth = dependents.len(),
			"miss"
		);

		// The selector runs unlocked
		let value = Arc::new((self.selector)(&dependents, args));

		let mut removed = Vec::new();
		let stored = {
			let mut root = self.root.lock();
			root.find_or_create(dependents.values(), &mut removed).store(key, Arc::clone(&value))
		};
		#[cfg(feature = "metrics")]
		self.swept_branches.fetch_add(removed.len() as u64, Ordering::Relaxed);

		// A losing result and swept subtrees are dropped outside the lock
		drop(value);
		drop(removed);
		Some(stored)
	}

	/// Number of memoized results reachable through live branches.
	///
	/// # Runtime Complexity
	///
	/// O(n) where n is the number of nodes in the trie.
	pub fn entry_count(&self) -> usize {
		self.root.lock().entry_count()
	}

	/// Drop every dead branch now instead of waiting for the next insertion to reach
	/// a sweep threshold. Live results are never affected.
	///
	/// Returns the number of branches removed. Their results are dropped after the
	/// trie lock is released.
	pub fn sweep(&self) -> usize {
		let mut removed = Vec::new();
		let swept = self.root.lock().sweep_all(&mut removed);
		#[cfg(feature = "metrics")]
		self.swept_branches.fetch_add(swept as u64, Ordering::Relaxed);
		drop(removed);
		swept
	}

	pub fn mode(&self) -> Mode {
		self.mode
	}

	/// Get a snapshot of the counters.
	#[cfg(feature = "metrics")]
	pub fn metrics(&self) -> SelectorMetrics {
		SelectorMetrics {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			invalid_dependents: self.invalid_dependents.load(Ordering::Relaxed),
			unstable_arguments: self.unstable_arguments.load(Ordering::Relaxed),
			swept_branches: self.swept_branches.load(Ordering::Relaxed),
			entry_count: self.entry_count(),
		}
	}

	fn warn(&self, warning: Warning) {
		if !self.mode.is_development() {
			return;
		}
		tracing::warn!(target: "selector_cache", "{warning}");
		if let Some(hook) = &self.on_warning {
			hook(&warning);
		}
	}
}

impl<S, R> fmt::Debug for CachedSelector<S, R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CachedSelector")
			.field("mode", &self.mode)
			.field("entry_count", &self.entry_count())
			.finish_non_exhaustive()
	}
}

/// Create a cached selector from a selector function and a dependents extractor.
///
/// Shorthand for [`CachedSelector::new`].
pub fn create_cached_selector<S, R, F, G>(selector: F, get_dependents: G) -> CachedSelector<S, R>
where
	F: Fn(&Dependents, &[Arg]) -> R + Send + Sync + 'static,
	G: Fn(&S, &[Arg]) -> Dependents + Send + Sync + 'static,
{
	CachedSelector::new(selector, get_dependents)
}
