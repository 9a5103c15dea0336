pub mod macros;

mod comparison;
mod deferral;
mod derived;
mod error;
mod instrument;
mod listeners;
mod multilink;
mod number;
mod property;
mod range;
mod reentrancy;
mod units;
mod validation;

use std::fmt::Debug;
use std::rc::Rc;

pub use comparison::{ComparisonStrategy, StrategyKind, ValueEquals};
pub use deferral::{transaction, Commit, Deferrable, Notify, Phase};
pub use derived::DerivedProperty;
pub use error::{PropertyError, Result, UsageError};
pub use instrument::{Instrumented, Registry};
pub use listeners::{Listener, ListenerId, ListenerRegistry};
pub use multilink::{lazy_multilink, multilink, Multilink, Sources};
pub use number::{NumberProperty, NumberPropertyOptions, NumberType, RangeSource};
pub use property::{Property, PropertyOptions, WeakProperty};
pub use range::Range;
pub use reentrancy::ReentrantStrategy;
pub use units::{is_valid_unit, UNITS};
pub use validation::{
	AsNumber, ContractBuilder, Inspect, Kind, Primitive, RangeBound, TypeTag, ValidationContract,
	ValueType,
};

/// Values a property can hold.
pub trait PropertyValue: Clone + PartialEq + Debug + 'static {}

impl<T> PropertyValue for T where T: Clone + PartialEq + Debug + 'static {}

/// Read side shared by every observable: mutable, derived and numeric
/// properties alike.
pub trait ReadOnlyProperty {
	type Value: PropertyValue;

	fn name(&self) -> &str;

	fn get(&self) -> Self::Value;

	/// Registers `listener`. When `eager` it is called once right away with
	/// the current and previous value.
	fn link_listener(&self, listener: Listener<Self::Value>, eager: bool) -> Result<ListenerId>;

	/// Removes a listener. Safe to call while listeners are being notified.
	fn unlink(&self, id: ListenerId) -> bool;

	fn has_listener(&self, id: ListenerId) -> bool;

	fn listener_count(&self) -> usize;

	/// Drops every listener. Idempotent.
	fn dispose(&self);

	fn is_disposed(&self) -> bool;

	fn link(&self, listener: impl Fn(&Self::Value, Option<&Self::Value>) + 'static) -> Result<ListenerId>
	where
		Self: Sized,
	{
		self.link_listener(Rc::new(listener), true)
	}

	fn lazy_link(
		&self,
		listener: impl Fn(&Self::Value, Option<&Self::Value>) + 'static,
	) -> Result<ListenerId>
	where
		Self: Sized,
	{
		self.link_listener(Rc::new(listener), false)
	}
}

pub trait SettableProperty: ReadOnlyProperty {
	fn set(&self, value: Self::Value) -> Result<()>;

	/// Writes the initial value back through the validated path.
	fn reset(&self) -> Result<()>;
}
