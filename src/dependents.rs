//! Dependents: the slice of state a cached selector actually reads.

use std::any::Any;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::sync::Arc;

use crate::value::Primitive;

/// Shared, type-erased object reference stored in a dependents record.
pub type SharedObject = Arc<dyn Any + Send + Sync>;

/// A single dependent value.
///
/// Objects are compared by identity (the address of their `Arc` allocation), so a
/// cached result stays valid for as long as the caller hands back clones of the same
/// `Arc`. Primitives are compared by value.
#[derive(Clone)]
pub enum Dependent {
	Primitive(Primitive),
	Object(SharedObject),
}

impl Dependent {
	/// Wrap a shared object. The `Arc` is not cloned deeply; identity is preserved.
	pub fn object<T: Any + Send + Sync>(value: Arc<T>) -> Self {
		Dependent::Object(value)
	}

	pub fn primitive(value: impl Into<Primitive>) -> Self {
		Dependent::Primitive(value.into())
	}

	pub fn is_object(&self) -> bool {
		matches!(self, Dependent::Object(_))
	}

	/// Address of the object allocation, used as its identity.
	pub(crate) fn addr(object: &SharedObject) -> usize {
		Arc::as_ptr(object) as *const () as usize
	}
}

impl fmt::Debug for Dependent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Dependent::Primitive(p) => f.debug_tuple("Primitive").field(p).finish(),
			Dependent::Object(o) => {
				f.debug_tuple("Object").field(&format_args!("{:#x}", Self::addr(o))).finish()
			}
		}
	}
}

impl From<Primitive> for Dependent {
	fn from(value: Primitive) -> Self {
		Dependent::Primitive(value)
	}
}

/// A record of named dependents.
///
/// Fields are always iterated in lexicographic order of their names, whatever order
/// they were inserted in. That order is the path taken through the cache trie.
///
/// ```
/// use std::sync::Arc;
/// use selector_cache::Dependents;
///
/// let posts = Arc::new(vec!["a", "b"]);
/// let deps = Dependents::new().with_object("posts", posts.clone()).with("site", 7);
///
/// assert_eq!(deps.names().collect::<Vec<_>>(), ["posts", "site"]);
/// assert_eq!(deps.get::<Vec<&str>>("posts"), Some(&vec!["a", "b"]));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Dependents {
	fields: BTreeMap<String, Dependent>,
}

impl Dependents {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a primitive dependent, replacing any field with the same name.
	pub fn with(mut self, name: impl Into<String>, value: impl Into<Primitive>) -> Self {
		self.insert(name, Dependent::Primitive(value.into()));
		self
	}

	/// Add an object dependent, replacing any field with the same name.
	pub fn with_object<T: Any + Send + Sync>(
		mut self,
		name: impl Into<String>,
		value: Arc<T>,
	) -> Self {
		self.insert(name, Dependent::object(value));
		self
	}

	/// Insert a dependent, returning the previous value of the field.
	pub fn insert(&mut self, name: impl Into<String>, value: Dependent) -> Option<Dependent> {
		self.fields.insert(name.into(), value)
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.fields.contains_key(name)
	}

	/// Borrow an object dependent as its concrete type.
	///
	/// Returns `None` if the field is missing, is a primitive, or has another type.
	pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
		match self.fields.get(name)? {
			Dependent::Object(o) => o.downcast_ref::<T>(),
			Dependent::Primitive(_) => None,
		}
	}

	/// Clone out an object dependent as a typed `Arc`, keeping its identity.
	pub fn get_arc<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
		match self.fields.get(name)? {
			Dependent::Object(o) => Arc::clone(o).downcast::<T>().ok(),
			Dependent::Primitive(_) => None,
		}
	}

	pub fn primitive(&self, name: &str) -> Option<&Primitive> {
		match self.fields.get(name)? {
			Dependent::Primitive(p) => Some(p),
			Dependent::Object(_) => None,
		}
	}

	pub fn dependent(&self, name: &str) -> Option<&Dependent> {
		self.fields.get(name)
	}

	/// Field names in sorted order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.fields.keys().map(String::as_str)
	}

	/// Dependent values in sorted field order.
	pub fn values(&self) -> btree_map::Values<'_, String, Dependent> {
		self.fields.values()
	}
}

impl<K: Into<String>> FromIterator<(K, Dependent)> for Dependents {
	fn from_iter<I: IntoIterator<Item = (K, Dependent)>>(iter: I) -> Self {
		Self {
			fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, PartialEq)]
	struct Post {
		id: &'static str,
	}

	#[test]
	fn test_values_follow_sorted_names() {
		let a = Dependents::new().with("zeta", 1).with("alpha", 2).with("mid", 3);
		let b = Dependents::new().with("mid", 3).with("zeta", 1).with("alpha", 2);

		assert_eq!(a.names().collect::<Vec<_>>(), ["alpha", "mid", "zeta"]);
		let order = |d: &Dependents| {
			d.values()
				.map(|v| match v {
					Dependent::Primitive(p) => p.as_i64(),
					Dependent::Object(_) => None,
				})
				.collect::<Vec<_>>()
		};
		assert_eq!(order(&a), order(&b));
	}

	#[test]
	fn test_typed_access() {
		let post = Arc::new(Post {
			id: "id1",
		});
		let deps = Dependents::new().with_object("post", post.clone()).with("site", "s1");

		assert_eq!(deps.get::<Post>("post").map(|p| p.id), Some("id1"));
		assert!(deps.get::<String>("post").is_none());
		assert!(deps.get::<Post>("site").is_none());
		assert_eq!(deps.primitive("site").and_then(Primitive::as_str), Some("s1"));

		let shared = deps.get_arc::<Post>("post").expect("post should downcast");
		assert!(Arc::ptr_eq(&shared, &post));
	}

	#[test]
	fn test_object_identity_survives_erasure() {
		let post = Arc::new(Post {
			id: "id1",
		});
		let erased: SharedObject = post.clone();
		assert_eq!(Dependent::addr(&erased), Arc::as_ptr(&post) as *const () as usize);
	}

	#[test]
	fn test_insert_replaces_field() {
		let mut deps = Dependents::new().with("site", 1);
		let previous = deps.insert("site", Dependent::primitive(2));
		assert!(matches!(previous, Some(Dependent::Primitive(Primitive::Int(1)))));
		assert_eq!(deps.len(), 1);
	}

	#[test]
	fn test_from_iterator() {
		let deps: Dependents = [("b", Dependent::primitive(true)), ("a", Dependent::primitive("x"))]
			.into_iter()
			.collect();
		assert_eq!(deps.names().collect::<Vec<_>>(), ["a", "b"]);
		assert!(!deps.is_empty());
	}
}
