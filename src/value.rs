//! Scalar and argument values, and the argument key they produce.
//!
//! Positional arguments are turned into a single string key by joining their display
//! forms with commas. The display rules follow the array-join semantics of the state
//! layer this cache serves: `Undefined` and `Null` render empty, lists are flattened
//! recursively, records render as `[object Object]`.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A scalar value compared by value.
///
/// Used both as a dependent (see [`Dependent::Primitive`](crate::Dependent::Primitive))
/// and as a positional argument. Numbers compare the way the state layer compares them:
/// `Int(1)` equals `Float(1.0)`, `-0.0` equals `0.0`, and `NaN` equals `NaN`.
#[derive(Debug, Clone)]
pub enum Primitive {
	Undefined,
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(Arc<str>),
}

/// Normalised view used for equality and hashing.
#[derive(PartialEq, Eq, Hash)]
enum Canonical<'a> {
	Undefined,
	Null,
	Bool(bool),
	Int(i64),
	Float(u64),
	Str(&'a str),
}

/// Lower bound of the magnitude at which floats switch to exponent notation.
const EXPONENT_LOWER: f64 = 1e-6;
/// Upper bound of the magnitude at which floats switch to exponent notation.
const EXPONENT_UPPER: f64 = 1e21;

fn integral(v: f64) -> Option<i64> {
	if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
		Some(v as i64)
	} else {
		None
	}
}

impl Primitive {
	fn canonical(&self) -> Canonical<'_> {
		match self {
			Primitive::Undefined => Canonical::Undefined,
			Primitive::Null => Canonical::Null,
			Primitive::Bool(b) => Canonical::Bool(*b),
			Primitive::Int(i) => Canonical::Int(*i),
			Primitive::Float(f) if f.is_nan() => Canonical::Float(f64::NAN.to_bits()),
			Primitive::Float(f) => match integral(*f) {
				Some(i) => Canonical::Int(i),
				None => Canonical::Float(f.to_bits()),
			},
			Primitive::Str(s) => Canonical::Str(s),
		}
	}

	/// Returns true for `Undefined` and `Null`.
	pub fn is_nullish(&self) -> bool {
		matches!(self, Primitive::Undefined | Primitive::Null)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Primitive::Str(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Primitive::Int(i) => Some(*i),
			Primitive::Float(f) => integral(*f),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Primitive::Bool(b) => Some(*b),
			_ => None,
		}
	}
}

impl PartialEq for Primitive {
	fn eq(&self, other: &Self) -> bool {
		self.canonical() == other.canonical()
	}
}

impl Eq for Primitive {}

impl Hash for Primitive {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.canonical().hash(state);
	}
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
	if v.is_nan() {
		return f.write_str("NaN");
	}
	if v.is_infinite() {
		return f.write_str(if v > 0.0 { "Infinity" } else { "-Infinity" });
	}
	if let Some(i) = integral(v) {
		return write!(f, "{i}");
	}
	let magnitude = v.abs();
	if magnitude >= EXPONENT_UPPER || magnitude < EXPONENT_LOWER {
		let exp = format!("{v:e}");
		// Positive exponents carry an explicit sign in the joined form.
		match exp.split_once('e') {
			Some((mantissa, power)) if !power.starts_with('-') => write!(f, "{mantissa}e+{power}"),
			_ => f.write_str(&exp),
		}
	} else {
		write!(f, "{v}")
	}
}

impl fmt::Display for Primitive {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Primitive::Undefined | Primitive::Null => Ok(()),
			Primitive::Bool(b) => write!(f, "{b}"),
			Primitive::Int(i) => write!(f, "{i}"),
			Primitive::Float(v) => write_float(f, *v),
			Primitive::Str(s) => f.write_str(s),
		}
	}
}

/// A positional argument passed to a cached selector after the state.
///
/// Composite arguments ([`Arg::List`], [`Arg::Record`]) are accepted, but their key form
/// does not capture their identity, so they are flagged with
/// [`Warning::UnstableArgument`](crate::Warning::UnstableArgument) in development mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
	Value(Primitive),
	List(Vec<Arg>),
	Record(BTreeMap<String, Arg>),
}

impl Arg {
	pub const UNDEFINED: Arg = Arg::Value(Primitive::Undefined);
	pub const NULL: Arg = Arg::Value(Primitive::Null);

	/// Returns true for lists and records.
	pub fn is_composite(&self) -> bool {
		!matches!(self, Arg::Value(_))
	}

	pub fn as_primitive(&self) -> Option<&Primitive> {
		match self {
			Arg::Value(p) => Some(p),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		self.as_primitive().and_then(Primitive::as_str)
	}
}

impl fmt::Display for Arg {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Arg::Value(p) => fmt::Display::fmt(p, f),
			Arg::List(items) => write_joined(f, items),
			Arg::Record(_) => f.write_str("[object Object]"),
		}
	}
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Arg]) -> fmt::Result {
	for (i, item) in items.iter().enumerate() {
		if i > 0 {
			f.write_str(",")?;
		}
		fmt::Display::fmt(item, f)?;
	}
	Ok(())
}

/// Build the leaf key for a call: every argument's display form, comma-joined.
pub fn args_key(args: &[Arg]) -> String {
	struct Joined<'a>(&'a [Arg]);

	impl fmt::Display for Joined<'_> {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			write_joined(f, self.0)
		}
	}

	Joined(args).to_string()
}

macro_rules! impl_from_scalar {
	($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
		$(
			impl From<$ty> for Primitive {
				fn from($v: $ty) -> Self {
					$body
				}
			}

			impl From<$ty> for Arg {
				fn from(v: $ty) -> Self {
					Arg::Value(Primitive::from(v))
				}
			}
		)*
	};
}

impl_from_scalar! {
	bool => |v| Primitive::Bool(v),
	i32 => |v| Primitive::Int(i64::from(v)),
	i64 => |v| Primitive::Int(v),
	u32 => |v| Primitive::Int(i64::from(v)),
	f64 => |v| Primitive::Float(v),
	&str => |v| Primitive::Str(Arc::from(v)),
	String => |v| Primitive::Str(Arc::from(v)),
	Arc<str> => |v| Primitive::Str(v),
}

impl<T: Into<Primitive>> From<Option<T>> for Primitive {
	fn from(v: Option<T>) -> Self {
		v.map_or(Primitive::Null, Into::into)
	}
}

impl From<Primitive> for Arg {
	fn from(v: Primitive) -> Self {
		Arg::Value(v)
	}
}

impl From<Vec<Arg>> for Arg {
	fn from(v: Vec<Arg>) -> Self {
		Arg::List(v)
	}
}

impl From<BTreeMap<String, Arg>> for Arg {
	fn from(v: BTreeMap<String, Arg>) -> Self {
		Arg::Record(v)
	}
}

/// Build a `[Arg; N]` array from values convertible into [`Arg`].
///
/// ```
/// use selector_cache::args;
///
/// let args = args!["site1", 42, true];
/// assert_eq!(args.len(), 3);
/// assert_eq!(selector_cache::args_key(&args), "site1,42,true");
/// ```
#[macro_export]
macro_rules! args {
	($($arg:expr),* $(,)?) => {
		[$($crate::Arg::from($arg)),*]
	};
}

#[cfg(test)]
mod tests {
	use std::collections::hash_map::DefaultHasher;

	use super::*;

	fn hash_of(p: &Primitive) -> u64 {
		let mut hasher = DefaultHasher::new();
		p.hash(&mut hasher);
		hasher.finish()
	}

	#[test]
	fn test_numeric_equality() {
		assert_eq!(Primitive::Int(1), Primitive::Float(1.0));
		assert_eq!(hash_of(&Primitive::Int(1)), hash_of(&Primitive::Float(1.0)));
		assert_eq!(Primitive::Float(-0.0), Primitive::Float(0.0));
		assert_eq!(Primitive::Float(f64::NAN), Primitive::Float(f64::NAN));
		assert_ne!(Primitive::Float(1.5), Primitive::Int(1));
	}

	#[test]
	fn test_distinct_kinds_are_not_equal() {
		assert_ne!(Primitive::Null, Primitive::Undefined);
		assert_ne!(Primitive::from("1"), Primitive::Int(1));
		assert_ne!(Primitive::Bool(true), Primitive::Int(1));
	}

	#[test]
	fn test_option_into_primitive() {
		assert_eq!(Primitive::from(None::<i64>), Primitive::Null);
		assert_eq!(Primitive::from(Some("a")), Primitive::from("a"));
	}

	#[test]
	fn test_args_key_primitives() {
		let args = [
			Arg::from(1),
			Arg::from(""),
			Arg::from("foo"),
			Arg::from(true),
			Arg::NULL,
			Arg::UNDEFINED,
		];
		assert_eq!(args_key(&args), "1,,foo,true,,");
	}

	#[test]
	fn test_args_key_empty() {
		assert_eq!(args_key(&[]), "");
	}

	#[test]
	fn test_args_key_composites() {
		let nested = Arg::List(vec![Arg::from(1), Arg::List(vec![Arg::from(2), Arg::from(3)])]);
		assert_eq!(args_key(&[nested]), "1,2,3");
		assert_eq!(args_key(&[Arg::Record(BTreeMap::new())]), "[object Object]");
		assert_eq!(args_key(&[Arg::from(1), Arg::List(vec![])]), "1,");
	}

	#[test]
	fn test_arg_display() {
		let list = Arg::List(vec![Arg::from(0.5), Arg::NULL, Arg::List(vec![Arg::from("x")])]);
		assert_eq!(list.to_string(), "0.5,,x");
		assert_eq!(Arg::from(false).to_string(), "false");
	}

	#[test]
	fn test_float_display() {
		assert_eq!(Primitive::Float(1.0).to_string(), "1");
		assert_eq!(Primitive::Float(-0.0).to_string(), "0");
		assert_eq!(Primitive::Float(2.5).to_string(), "2.5");
		assert_eq!(Primitive::Float(f64::NAN).to_string(), "NaN");
		assert_eq!(Primitive::Float(f64::NEG_INFINITY).to_string(), "-Infinity");
		assert_eq!(Primitive::Float(1e21).to_string(), "1e+21");
		assert_eq!(Primitive::Float(1.5e-7).to_string(), "1.5e-7");
	}

	#[test]
	fn test_is_composite() {
		assert!(!Arg::from(5).is_composite());
		assert!(!Arg::NULL.is_composite());
		assert!(Arg::List(vec![]).is_composite());
		assert!(Arg::Record(BTreeMap::new()).is_composite());
	}

	#[test]
	fn test_args_macro() {
		let args = args!["a", 1, Primitive::Null];
		assert_eq!(args_key(&args), "a,1,");
	}
}
