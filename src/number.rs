use std::fmt::Debug;
use std::rc::Rc;

use crate::listeners::{Listener, ListenerId};
use crate::property::{Property, PropertyOptions};
use crate::range::Range;
use crate::reentrancy::ReentrantStrategy;
use crate::validation::{Primitive, ValidationContract, ValueType};
use crate::{
	Commit, Deferrable, Notify, Phase, PropertyError, ReadOnlyProperty, Result, SettableProperty,
	UsageError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberType {
	#[default]
	Float,
	Integer,
}

impl NumberType {
	fn describe_error(self, value: f64) -> Option<String> {
		match self {
			NumberType::Integer if value.fract() != 0.0 || !value.is_finite() => {
				Some(format!("{value} is not an integer"))
			}
			_ => None,
		}
	}
}

pub enum RangeSource {
	/// A range property created and owned by the number.
	Static(Range),
	/// A range property owned elsewhere, possibly shared by several numbers.
	Shared(Property<Range>),
}

#[derive(Default)]
pub struct NumberPropertyOptions {
	name: Option<String>,
	number_type: NumberType,
	range: Option<RangeSource>,
	units: Option<String>,
	reentrant: bool,
	strategy: ReentrantStrategy,
}

impl NumberPropertyOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn number_type(mut self, number_type: NumberType) -> Self {
		self.number_type = number_type;
		self
	}

	pub fn range(mut self, range: Range) -> Self {
		self.range = Some(RangeSource::Static(range));
		self
	}

	pub fn range_property(mut self, range: Property<Range>) -> Self {
		self.range = Some(RangeSource::Shared(range));
		self
	}

	pub fn units(mut self, units: impl Into<String>) -> Self {
		self.units = Some(units.into());
		self
	}

	pub fn reentrant(mut self, reentrant: bool) -> Self {
		self.reentrant = reentrant;
		self
	}

	pub fn reentrant_strategy(mut self, strategy: ReentrantStrategy) -> Self {
		self.strategy = strategy;
		self
	}
}

struct RangeLink {
	property: Property<Range>,
	owned: bool,
}

/// A numeric property kept inside the range held by a second property.
#[derive(Clone)]
pub struct NumberProperty {
	value: Property<f64>,
	number_type: NumberType,
	range: Option<Rc<RangeLink>>,
}

impl NumberProperty {
	pub fn new(value: f64, options: NumberPropertyOptions) -> Result<Self> {
		let NumberPropertyOptions {
			name,
			number_type,
			range,
			units,
			reentrant,
			strategy,
		} = options;

		let (range_property, owned) = match range {
			Some(RangeSource::Static(range)) => {
				let range_name = format!("{}.range", name.as_deref().unwrap_or("<unnamed>"));
				(Some(Property::with_options(range, PropertyOptions::new().name(range_name))?), true)
			}
			Some(RangeSource::Shared(property)) => (Some(property), false),
			None => (None, false),
		};

		let mut contract = ValidationContract::builder()
			.value_type(ValueType::Primitive(Primitive::Number))
			.is_valid_value(move |value: &f64| number_type.describe_error(*value).is_none());

		if let Some(range_property) = &range_property {
			contract = contract.range_property(range_property.clone());
		}

		if let Some(units) = units {
			contract = contract.units(units);
		}

		let mut property_options = PropertyOptions::new()
			.contract(contract.build()?)
			.reentrant(reentrant)
			.reentrant_strategy(strategy);
		if let Some(name) = name {
			property_options = property_options.name(name);
		}

		let value = Property::with_options(value, property_options).map_err(|error| {
			// An owned range dies with the number it was made for.
			if owned {
				if let Some(range) = &range_property {
					range.dispose();
				}
			}
			error
		})?;

		let range = range_property.map(|property| {
			Self::order_commits(&value, &property);
			Rc::new(RangeLink { property, owned })
		});

		Ok(NumberProperty {
			value,
			number_type,
			range,
		})
	}

	/// Holds value commits back until a pending range commit has notified.
	fn order_commits(value: &Property<f64>, range: &Property<Range>) {
		let range = range.downgrade();
		value.add_commit_guard(move || {
			let range = range.upgrade()?;
			match range.phase() {
				Phase::Deferred | Phase::CommitPending => Some(format!(
					"range `{}` has not notified its own commit yet",
					range.name()
				)),
				_ => None,
			}
		});
	}

	pub fn number_type(&self) -> NumberType {
		self.number_type
	}

	pub fn range(&self) -> Option<Range> {
		self.range.as_ref().map(|link| link.property.get())
	}

	pub fn range_property(&self) -> Option<&Property<Range>> {
		self.range.as_ref().map(|link| &link.property)
	}

	pub fn phase(&self) -> Phase {
		self.value.phase()
	}

	pub fn set_deferred(&self, deferred: bool) -> Result<Commit<f64>> {
		self.value.set_deferred(deferred)
	}

	/// Changes value and range as one step. Listeners of either side only
	/// ever observe the value inside the range.
	pub fn set_value_and_range(&self, value: f64, range: Range) -> Result<()> {
		let Some(link) = &self.range else {
			return Err(PropertyError::usage(self.name(), UsageError::NoRange));
		};

		if let Some(message) = self.number_type.describe_error(value) {
			return Err(PropertyError::validation(self.name(), message));
		}
		if !range.contains(value) {
			return Err(PropertyError::validation(
				self.name(),
				format!("{value} is outside range {range}"),
			));
		}

		let range_property = &link.property;
		range_property.defer()?;
		if let Err(error) = self.value.defer() {
			range_property.discard_deferred();
			return Err(error);
		}

		let written = range_property
			.set(range)
			.and_then(|_| self.value.set(value));
		if let Err(error) = written {
			range_property.discard_deferred();
			self.value.discard_deferred();
			return Err(error);
		}

		let mut range_commit = match range_property.undefer() {
			Ok(commit) => commit,
			Err(error) => {
				// Another number sharing the range refused it.
				range_property.discard_deferred();
				self.value.discard_deferred();
				return Err(error);
			}
		};

		let mut value_commit = match self.value.undefer() {
			Ok(commit) => commit,
			Err(error) => {
				self.value.discard_deferred();
				if range_commit.notify().is_err() {
					range_commit.abandon();
				}
				return Err(error);
			}
		};

		if let Err(error) = range_commit.notify() {
			range_commit.abandon();
			value_commit.abandon();
			return Err(error);
		}
		value_commit.notify().map_err(|error| {
			value_commit.abandon();
			error
		})
	}
}

impl ReadOnlyProperty for NumberProperty {
	type Value = f64;

	fn name(&self) -> &str {
		self.value.name()
	}

	fn get(&self) -> f64 {
		self.value.get()
	}

	fn link_listener(&self, listener: Listener<f64>, eager: bool) -> Result<ListenerId> {
		self.value.link_listener(listener, eager)
	}

	fn unlink(&self, id: ListenerId) -> bool {
		self.value.unlink(id)
	}

	fn has_listener(&self, id: ListenerId) -> bool {
		self.value.has_listener(id)
	}

	fn listener_count(&self) -> usize {
		self.value.listener_count()
	}

	fn dispose(&self) {
		self.value.dispose();
		if let Some(link) = &self.range {
			if link.owned {
				link.property.dispose();
			}
		}
	}

	fn is_disposed(&self) -> bool {
		self.value.is_disposed()
	}
}

impl SettableProperty for NumberProperty {
	fn set(&self, value: f64) -> Result<()> {
		self.value.set(value)
	}

	fn reset(&self) -> Result<()> {
		self.value.reset()
	}
}

impl Deferrable for NumberProperty {
	fn defer(&self) -> Result<()> {
		self.value.defer()
	}

	fn undefer_erased(&self) -> Result<Box<dyn Notify>> {
		Deferrable::undefer_erased(&self.value)
	}

	fn discard_deferred(&self) {
		self.value.discard_deferred()
	}
}

impl Debug for NumberProperty {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NumberProperty")
			.field("name", &self.name())
			.field("value", &self.get())
			.field("range", &self.range())
			.finish()
	}
}
