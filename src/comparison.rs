use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

/// Equality a type provides for itself, used by
/// [`ComparisonStrategy::equals_function`].
pub trait ValueEquals {
	fn value_equals(&self, other: &Self) -> bool;
}

impl<T: ValueEquals> ValueEquals for Option<T> {
	fn value_equals(&self, other: &Self) -> bool {
		match (self, other) {
			(None, None) => true,
			(Some(a), Some(b)) => a.value_equals(b),
			_ => false,
		}
	}
}

impl<T: ValueEquals + ?Sized> ValueEquals for Rc<T> {
	fn value_equals(&self, other: &Self) -> bool {
		(**self).value_equals(&**other)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
	Reference,
	Pointer,
	Structural,
	Custom,
	EqualsFunction,
}

/// Decides whether a new value is different enough from the current one to
/// be written and notified.
pub struct ComparisonStrategy<T> {
	kind: StrategyKind,
	func: Rc<dyn Fn(&T, &T) -> bool>,
}

impl<T> Clone for ComparisonStrategy<T> {
	fn clone(&self) -> Self {
		ComparisonStrategy {
			kind: self.kind,
			func: self.func.clone(),
		}
	}
}

impl<T: PartialEq + 'static> Default for ComparisonStrategy<T> {
	fn default() -> Self {
		Self::reference()
	}
}

impl<T: 'static> ComparisonStrategy<T> {
	/// Plain `==`.
	pub fn reference() -> Self
	where
		T: PartialEq,
	{
		ComparisonStrategy {
			kind: StrategyKind::Reference,
			func: Rc::new(|a: &T, b: &T| a == b),
		}
	}

	/// Deep comparison. Differing digests reject early, equal digests are
	/// confirmed with `==`.
	pub fn structural() -> Self
	where
		T: Hash + PartialEq,
	{
		ComparisonStrategy {
			kind: StrategyKind::Structural,
			func: Rc::new(|a: &T, b: &T| fxhash::hash64(a) == fxhash::hash64(b) && a == b),
		}
	}

	pub fn custom(func: impl Fn(&T, &T) -> bool + 'static) -> Self {
		ComparisonStrategy {
			kind: StrategyKind::Custom,
			func: Rc::new(func),
		}
	}

	pub fn equals_function() -> Self
	where
		T: ValueEquals,
	{
		ComparisonStrategy {
			kind: StrategyKind::EqualsFunction,
			func: Rc::new(|a: &T, b: &T| a.value_equals(b)),
		}
	}

	pub fn kind(&self) -> StrategyKind {
		self.kind
	}

	#[inline]
	pub fn equals(&self, a: &T, b: &T) -> bool {
		(self.func)(a, b)
	}
}

impl<U: ?Sized + 'static> ComparisonStrategy<Rc<U>> {
	/// Identity of the shared allocation, ignoring its contents.
	pub fn pointer() -> Self {
		ComparisonStrategy {
			kind: StrategyKind::Pointer,
			func: Rc::new(|a: &Rc<U>, b: &Rc<U>| Rc::ptr_eq(a, b)),
		}
	}
}

impl<T> Debug for ComparisonStrategy<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("ComparisonStrategy").field(&self.kind).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Hash, PartialEq)]
	struct Point {
		x: i32,
		y: Vec<i32>,
	}

	#[derive(PartialEq)]
	struct Keyed {
		id: u32,
		label: &'static str,
	}

	impl std::hash::Hash for Keyed {
		fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
			self.id.hash(state);
		}
	}

	struct Approx(f64);

	impl ValueEquals for Approx {
		fn value_equals(&self, other: &Self) -> bool {
			(self.0 - other.0).abs() < 1e-9
		}
	}

	#[test]
	fn structural_compares_contents() {
		let s = ComparisonStrategy::<Point>::structural();
		let a = Point { x: 1, y: vec![1, 2] };
		let b = Point { x: 1, y: vec![1, 2] };
		let c = Point { x: 1, y: vec![2, 1] };
		assert!(s.equals(&a, &b));
		assert!(!s.equals(&a, &c));
	}

	#[test]
	fn structural_does_not_trust_equal_digests() {
		let s = ComparisonStrategy::<Keyed>::structural();
		let a = Keyed { id: 1, label: "a" };
		let b = Keyed { id: 1, label: "b" };
		assert_eq!(fxhash::hash64(&a), fxhash::hash64(&b));
		assert!(!s.equals(&a, &b));
		assert!(s.equals(&a, &Keyed { id: 1, label: "a" }));
	}

	#[test]
	fn pointer_ignores_contents() {
		let s = ComparisonStrategy::<Rc<String>>::pointer();
		let a = Rc::new("x".to_owned());
		let b = Rc::new("x".to_owned());
		assert!(s.equals(&a, &a.clone()));
		assert!(!s.equals(&a, &b));
	}

	#[test]
	fn equals_function_handles_missing_values() {
		let s = ComparisonStrategy::<Option<Approx>>::equals_function();
		assert!(s.equals(&None, &None));
		assert!(!s.equals(&None, &Some(Approx(1.0))));
		assert!(!s.equals(&Some(Approx(1.0)), &None));
		assert!(s.equals(&Some(Approx(1.0)), &Some(Approx(1.0 + 1e-12))));
	}
}
