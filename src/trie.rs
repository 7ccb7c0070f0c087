//! Cache trie storage.
//!
//! The trie has one level per dependent value, in sorted field order, and every node
//! carries a leaf map from argument key to memoized result.
//!
//! # Key kinds
//!
//! A level is a [`DependentMap`], a tagged union over the kind of key:
//!
//! - **Object keys** are stored by allocation address next to a `Weak` handle. The trie
//!   never keeps a dependent alive. Once the last `Arc` to a dependent is dropped its
//!   branch is dead: it can no longer be reached because no live object shares the
//!   address, and the `Weak` keeps the allocation reserved so the address is not reused
//!   while the key exists.
//! - **Primitive keys** live in a conventional map and are never evicted. They are
//!   typically small, bounded sets (site ids, flags).
//!
//! # Sweeping
//!
//! Dead object branches are removed lazily. Inserting into an object level whose size
//! has reached its sweep threshold first drops every dead branch (and with it the whole
//! subtree and its results), then doubles the threshold relative to the surviving size.
//! This keeps sweeping amortised O(1) per insertion.
//!
//! Swept subtrees are moved into a caller-provided `removed` buffer instead of being
//! dropped in place, so the caller can release its lock before any result is dropped.

use std::sync::{Arc, Weak};

use ahash::RandomState;
use hashbrown::HashMap;

use crate::dependents::{Dependent, SharedObject};
use crate::value::Primitive;

/// Default number of object branches a level may hold before it is swept.
pub(crate) const DEFAULT_SWEEP_THRESHOLD: usize = 32;

type WeakObject = Weak<dyn std::any::Any + Send + Sync>;

struct WeakEntry<V> {
	key: WeakObject,
	value: V,
}

impl<V> WeakEntry<V> {
	fn is_alive(&self) -> bool {
		self.key.strong_count() > 0
	}
}

/// Object-keyed map that holds its keys weakly.
struct WeakKeyMap<V> {
	entries: HashMap<usize, WeakEntry<V>, RandomState>,
	/// Size at which the next insertion sweeps dead entries.
	sweep_at: usize,
	min_sweep: usize,
}

impl<V> WeakKeyMap<V> {
	fn new(min_sweep: usize) -> Self {
		Self {
			entries: HashMap::with_hasher(RandomState::new()),
			sweep_at: min_sweep,
			min_sweep,
		}
	}

	fn get(&self, key: &SharedObject) -> Option<&V> {
		self.entries
			.get(&Dependent::addr(key))
			.filter(|entry| entry.is_alive())
			.map(|entry| &entry.value)
	}

	fn get_or_insert_with(
		&mut self,
		key: &SharedObject,
		f: impl FnOnce() -> V,
		removed: &mut Vec<V>,
	) -> &mut V {
		if self.entries.len() >= self.sweep_at {
			self.sweep(removed);
		}

		let entry = self.entries.entry(Dependent::addr(key)).or_insert_with(|| WeakEntry {
			key: Arc::downgrade(key),
			value: f(),
		});
		&mut entry.value
	}

	/// Move the value of every dead entry into `removed`, returning how many were removed.
	fn sweep(&mut self, removed: &mut Vec<V>) -> usize {
		let before = removed.len();
		let dead = self.entries.extract_if(|_, entry| !entry.is_alive());
		removed.extend(dead.map(|(_, entry)| entry.value));
		let swept = removed.len() - before;
		self.sweep_at = (self.entries.len() * 2).max(self.min_sweep);
		if swept > 0 {
			tracing::trace!(
				target: "selector_cache",
				swept,
				remaining = self.entries.len(),
				"swept dead branches"
			);
		}
		swept
	}

	fn live_values(&self) -> impl Iterator<Item = &V> {
		self.entries.values().filter(|entry| entry.is_alive()).map(|entry| &entry.value)
	}

	#[cfg(test)]
	fn len(&self) -> usize {
		self.entries.len()
	}
}

/// One trie level: a map from dependent value to child, dispatching on key kind.
pub(crate) struct DependentMap<V> {
	objects: WeakKeyMap<V>,
	primitives: HashMap<Primitive, V, RandomState>,
}

impl<V> DependentMap<V> {
	pub fn new(sweep_threshold: usize) -> Self {
		Self {
			objects: WeakKeyMap::new(sweep_threshold),
			primitives: HashMap::with_hasher(RandomState::new()),
		}
	}

	pub fn get(&self, key: &Dependent) -> Option<&V> {
		match key {
			Dependent::Object(o) => self.objects.get(o),
			Dependent::Primitive(p) => self.primitives.get(p),
		}
	}

	/// Look up `key`, inserting `f()` if it is absent or its branch is dead.
	///
	/// Dead object branches swept during the insertion are moved into `removed`.
	pub fn get_or_insert_with(
		&mut self,
		key: &Dependent,
		f: impl FnOnce() -> V,
		removed: &mut Vec<V>,
	) -> &mut V {
		match key {
			Dependent::Object(o) => self.objects.get_or_insert_with(o, f, removed),
			Dependent::Primitive(p) => self.primitives.entry(p.clone()).or_insert_with(f),
		}
	}

	/// Move dead object branches into `removed` now, regardless of the sweep threshold.
	pub fn sweep(&mut self, removed: &mut Vec<V>) -> usize {
		self.objects.sweep(removed)
	}

	/// Children whose key is still reachable.
	pub fn live_values(&self) -> impl Iterator<Item = &V> {
		self.objects.live_values().chain(self.primitives.values())
	}

	/// Stored branches, including dead object branches that have not been swept yet.
	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.objects.len() + self.primitives.len()
	}
}

/// A trie node: children keyed by the next dependent, plus results for paths ending here.
pub(crate) struct Node<R> {
	children: DependentMap<Node<R>>,
	results: HashMap<String, Arc<R>, RandomState>,
	sweep_threshold: usize,
}

impl<R> Node<R> {
	pub fn new(sweep_threshold: usize) -> Self {
		Self {
			children: DependentMap::new(sweep_threshold),
			results: HashMap::with_hasher(RandomState::new()),
			sweep_threshold,
		}
	}

	/// Follow `path` without creating anything.
	pub fn find<'a, I>(&self, path: I) -> Option<&Node<R>>
	where
		I: IntoIterator<Item = &'a Dependent>,
	{
		let mut node = self;
		for dependent in path {
			node = node.children.get(dependent)?;
		}
		Some(node)
	}

	/// Follow `path`, creating missing nodes. Dead branches swept on the way are moved
	/// into `removed`.
	pub fn find_or_create<'a, I>(&mut self, path: I, removed: &mut Vec<Node<R>>) -> &mut Node<R>
	where
		I: IntoIterator<Item = &'a Dependent>,
	{
		let mut node = self;
		for dependent in path {
			let threshold = node.sweep_threshold;
			node = node.children.get_or_insert_with(dependent, || Node::new(threshold), removed);
		}
		node
	}

	pub fn result(&self, args_key: &str) -> Option<&Arc<R>> {
		self.results.get(args_key)
	}

	/// Store `value` under `args_key` unless a result is already present. Returns the
	/// stored result.
	///
	/// A rejected `value` is dropped here, so callers holding a lock should pass a clone.
	pub fn store(&mut self, args_key: String, value: Arc<R>) -> Arc<R> {
		Arc::clone(self.results.entry(args_key).or_insert(value))
	}

	/// Results reachable from this node through live branches.
	pub fn entry_count(&self) -> usize {
		self.results.len() + self.children.live_values().map(Node::entry_count).sum::<usize>()
	}

	/// Branches stored directly under this node.
	#[cfg(test)]
	pub fn branch_count(&self) -> usize {
		self.children.len()
	}

	/// Sweep dead branches in this node and every live descendant into `removed`.
	pub fn sweep_all(&mut self, removed: &mut Vec<Node<R>>) -> usize {
		let mut swept = self.children.sweep(removed);
		for child in self.children.objects.entries.values_mut() {
			swept += child.value.sweep_all(removed);
		}
		for child in self.children.primitives.values_mut() {
			swept += child.sweep_all(removed);
		}
		swept
	}
}
