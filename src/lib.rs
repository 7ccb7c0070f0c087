//! # Selector Cache
//!
//! A memoizing cache for selectors over an application state tree:
//! - **Dependency-keyed**: results are keyed by the slice of state a selector reads
//!   (its *dependents*), not by the whole state
//! - **Order independent**: dependents are walked in sorted field order
//! - **Self-evicting**: branches keyed by shared objects hold them weakly and are
//!   reclaimed once the objects are dropped
//! - **Per-argument entries**: positional arguments select a leaf entry by their
//!   comma-joined key
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use selector_cache::{args, CachedSelector, Dependents};
//!
//! #[derive(Debug, PartialEq)]
//! struct Post {
//!     id: &'static str,
//!     site_id: &'static str,
//! }
//!
//! struct State {
//!     posts: Arc<Vec<Post>>,
//! }
//!
//! // Count the posts of a site. Only `state.posts` is a dependent.
//! let site_post_count = CachedSelector::builder()
//!     .selector(|deps: &Dependents, args| {
//!         let site = args[0].as_str().unwrap_or_default();
//!         deps.get::<Vec<Post>>("posts")
//!             .map_or(0, |posts| posts.iter().filter(|p| p.site_id == site).count())
//!     })
//!     .dependents(|state: &State, _args| Dependents::new().with_object("posts", state.posts.clone()))
//!     .build()
//!     .expect("selector and dependents are set");
//!
//! let state = State {
//!     posts: Arc::new(vec![
//!         Post { id: "id1", site_id: "s1" },
//!         Post { id: "id2", site_id: "s1" },
//!         Post { id: "id3", site_id: "s2" },
//!     ]),
//! };
//!
//! assert_eq!(site_post_count.select(&state, &args!["s1"]).as_deref(), Some(&2));
//! // Same posts, same argument: served from the cache.
//! assert_eq!(site_post_count.select(&state, &args!["s1"]).as_deref(), Some(&2));
//! assert_eq!(site_post_count.select(&state, &args!["s2"]).as_deref(), Some(&1));
//! ```
//!
//! ## Identity
//!
//! Object dependents are compared by the address of their `Arc` allocation. Replace the
//! `Arc` when the data changes (as an immutable state tree does) and hand out clones of
//! the same `Arc` while it does not.
//!
//! ## Diagnostics
//!
//! In [`Mode::Development`] (the default in debug builds) the cache reports
//! [`Warning`]s through `tracing` under the `selector_cache` target and through an
//! optional hook. In [`Mode::Production`] warnings are suppressed.

mod builder;
mod dependents;
mod error;
#[cfg(feature = "metrics")]
mod metrics;
mod selector;
mod trie;
mod value;

pub use builder::{CachedSelectorBuilder, Mode};
pub use dependents::{Dependent, Dependents, SharedObject};
pub use error::{Error, Result, Warning};
#[cfg(feature = "metrics")]
pub use metrics::SelectorMetrics;
pub use selector::{CachedSelector, create_cached_selector};
pub use value::{Arg, Primitive, args_key};
