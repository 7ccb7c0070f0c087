use crate::dependents::Dependents;
use crate::error::{Error, Result, Warning};
use crate::selector::CachedSelector;
use crate::trie::DEFAULT_SWEEP_THRESHOLD;
use crate::value::Arg;

pub(crate) type SelectorFn<R> = Box<dyn Fn(&Dependents, &[Arg]) -> R + Send + Sync>;
pub(crate) type DependentsFn<S> = Box<dyn Fn(&S, &[Arg]) -> Dependents + Send + Sync>;
pub(crate) type WarningHook = Box<dyn Fn(&Warning) + Send + Sync>;

/// Whether call-time diagnostics are reported.
///
/// In `Development` every [`Warning`] is logged and passed to the warning hook, and
/// arguments are checked for composite values. In `Production` the argument check is
/// skipped and warnings are suppressed entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	Development,
	Production,
}

impl Mode {
	pub fn is_development(self) -> bool {
		self == Mode::Development
	}
}

impl Default for Mode {
	/// `Development` in builds with debug assertions, `Production` otherwise.
	fn default() -> Self {
		if cfg!(debug_assertions) {
			Mode::Development
		} else {
			Mode::Production
		}
	}
}

/// Builder for configuring a [`CachedSelector`].
///
/// Both the selector and the dependents extractor are required; [`build`](Self::build)
/// fails with [`Error::InvalidArgument`] if either is missing.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use selector_cache::{args, CachedSelector, Dependents, Mode};
///
/// struct State {
///     titles: Arc<Vec<String>>,
/// }
///
/// let longest = CachedSelector::builder()
///     .selector(|deps: &Dependents, _args| {
///         deps.get::<Vec<String>>("titles")
///             .and_then(|t| t.iter().map(String::len).max())
///             .unwrap_or(0)
///     })
///     .dependents(|state: &State, _args| Dependents::new().with_object("titles", state.titles.clone()))
///     .mode(Mode::Production)
///     .build()
///     .expect("both functions supplied");
///
/// let state = State { titles: Arc::new(vec!["a".into(), "abc".into()]) };
/// assert_eq!(longest.select(&state, &args![]).as_deref(), Some(&3));
/// ```
pub struct CachedSelectorBuilder<S, R> {
	selector: Option<SelectorFn<R>>,
	get_dependents: Option<DependentsFn<S>>,
	mode: Mode,
	sweep_threshold: usize,
	on_warning: Option<WarningHook>,
}

impl<S, R> CachedSelectorBuilder<S, R> {
	pub fn new() -> Self {
		Self {
			selector: None,
			get_dependents: None,
			mode: Mode::default(),
			sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
			on_warning: None,
		}
	}

	/// Set the function computing a result from the dependents and arguments.
	///
	/// It is only invoked on a cache miss and must be pure.
	pub fn selector<F>(mut self, selector: F) -> Self
	where
		F: Fn(&Dependents, &[Arg]) -> R + Send + Sync + 'static,
	{
		self.selector = Some(Box::new(selector));
		self
	}

	/// Set the function extracting the dependents from the state.
	///
	/// It runs on every call and must return a non-empty record.
	pub fn dependents<F>(mut self, get_dependents: F) -> Self
	where
		F: Fn(&S, &[Arg]) -> Dependents + Send + Sync + 'static,
	{
		self.get_dependents = Some(Box::new(get_dependents));
		self
	}

	/// Set the diagnostics mode.
	///
	/// Default: [`Mode::default()`]
	pub fn mode(mut self, mode: Mode) -> Self {
		self.mode = mode;
		self
	}

	/// Set how many object branches a trie level may hold before dead ones are swept.
	///
	/// The threshold doubles relative to the surviving size after every sweep.
	///
	/// Default: 32
	pub fn sweep_threshold(mut self, threshold: usize) -> Self {
		assert!(threshold > 0, "sweep_threshold must be greater than 0");
		self.sweep_threshold = threshold;
		self
	}

	/// Register a hook receiving every warning reported in development mode.
	pub fn on_warning<F>(mut self, hook: F) -> Self
	where
		F: Fn(&Warning) + Send + Sync + 'static,
	{
		self.on_warning = Some(Box::new(hook));
		self
	}

	/// Build the cached selector.
	pub fn build(self) -> Result<CachedSelector<S, R>> {
		let selector =
			self.selector.ok_or(Error::InvalidArgument("a selector function is required"))?;
		let get_dependents = self
			.get_dependents
			.ok_or(Error::InvalidArgument("a getDependents function is required"))?;

		Ok(CachedSelector::from_parts(
			selector,
			get_dependents,
			self.mode,
			self.sweep_threshold,
			self.on_warning,
		))
	}
}

impl<S, R> Default for CachedSelectorBuilder<S, R> {
	fn default() -> Self {
		Self::new()
	}
}
