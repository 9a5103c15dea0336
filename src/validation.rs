use std::any::TypeId;
use std::fmt::{Debug, Display};
use std::rc::Rc;

use crate::property::Property;
use crate::range::Range;
use crate::units::is_valid_unit;
use crate::{PropertyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
	Boolean,
	Number,
	String,
	Array,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TypeTag {
	id: TypeId,
	name: &'static str,
}

impl TypeTag {
	pub fn of<U: 'static>() -> Self {
		TypeTag {
			id: TypeId::of::<U>(),
			name: std::any::type_name::<U>(),
		}
	}

	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl Debug for TypeTag {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name)
	}
}

/// Runtime shape of a value as seen by a [`ValueType`] check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
	Null,
	Primitive(Primitive),
	Instance(TypeTag),
}

pub trait Inspect {
	fn kind(&self) -> Kind;
}

macro_rules! inspect_primitive {
	($primitive:ident => $($ty:ty),*) => {
		$(
			impl Inspect for $ty {
				fn kind(&self) -> Kind {
					Kind::Primitive(Primitive::$primitive)
				}
			}
		)*
	};
}

inspect_primitive!(Boolean => bool);
inspect_primitive!(Number => f32, f64, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);
inspect_primitive!(String => String, &'static str);

impl<T> Inspect for Vec<T> {
	fn kind(&self) -> Kind {
		Kind::Primitive(Primitive::Array)
	}
}

impl<T: Inspect> Inspect for Option<T> {
	fn kind(&self) -> Kind {
		match self {
			Some(value) => value.kind(),
			None => Kind::Null,
		}
	}
}

impl<T: Inspect + ?Sized> Inspect for Rc<T> {
	fn kind(&self) -> Kind {
		(**self).kind()
	}
}

impl Inspect for Range {
	fn kind(&self) -> Kind {
		Kind::Instance(TypeTag::of::<Range>())
	}
}

/// Declared type of the values a property accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
	Primitive(Primitive),
	InstanceOf(TypeTag),
	OneOf(Vec<ValueType>),
	Nullable(Box<ValueType>),
}

impl ValueType {
	pub fn instance_of<U: 'static>() -> Self {
		ValueType::InstanceOf(TypeTag::of::<U>())
	}

	pub fn nullable(self) -> Self {
		ValueType::Nullable(Box::new(self))
	}

	pub fn matches(&self, kind: &Kind) -> bool {
		match (self, kind) {
			(ValueType::Primitive(expected), Kind::Primitive(actual)) => expected == actual,
			(ValueType::InstanceOf(expected), Kind::Instance(actual)) => expected == actual,
			(ValueType::OneOf(options), kind) => options.iter().any(|option| option.matches(kind)),
			(ValueType::Nullable(_), Kind::Null) => true,
			(ValueType::Nullable(inner), kind) => inner.matches(kind),
			_ => false,
		}
	}
}

impl Display for ValueType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ValueType::Primitive(p) => write!(f, "{p:?}"),
			ValueType::InstanceOf(tag) => write!(f, "instance of {}", tag.name()),
			ValueType::OneOf(options) => {
				f.write_str("one of (")?;
				for (i, option) in options.iter().enumerate() {
					if i > 0 {
						f.write_str(" | ")?;
					}
					write!(f, "{option}")?;
				}
				f.write_str(")")
			}
			ValueType::Nullable(inner) => write!(f, "{inner} or null"),
		}
	}
}

/// Numeric view of a value for range checks.
pub trait AsNumber {
	fn as_number(&self) -> Option<f64>;
}

macro_rules! as_number {
	($($ty:ty),*) => {
		$(
			impl AsNumber for $ty {
				fn as_number(&self) -> Option<f64> {
					Some(*self as f64)
				}
			}
		)*
	};
}

as_number!(f32, f64, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl<T: AsNumber> AsNumber for Option<T> {
	fn as_number(&self) -> Option<f64> {
		self.as_ref().and_then(AsNumber::as_number)
	}
}

pub enum RangeBound {
	Static(Range),
	/// Looked up on every check. `None` skips the check.
	Dynamic(Rc<dyn Fn() -> Option<Range>>),
}

impl RangeBound {
	fn current(&self) -> Option<Range> {
		match self {
			RangeBound::Static(range) => Some(*range),
			RangeBound::Dynamic(func) => func(),
		}
	}
}

struct TypeCheck<T> {
	value_type: ValueType,
	kind: fn(&T) -> Kind,
}

struct ValidValues<T> {
	values: Vec<T>,
	eq: fn(&T, &T) -> bool,
}

struct RangeCheck<T> {
	bound: RangeBound,
	number: fn(&T) -> Option<f64>,
}

/// Range held by another property. The owner of the contract keeps that
/// property from moving its range away from the current value.
pub(crate) struct LinkedRange<T> {
	pub property: Property<Range>,
	pub number: fn(&T) -> Option<f64>,
}

/// What values a property accepts. Every present check must pass.
pub struct ValidationContract<T> {
	permissive: bool,
	value_type: Option<TypeCheck<T>>,
	valid_values: Option<ValidValues<T>>,
	predicate: Option<Rc<dyn Fn(&T) -> bool>>,
	range: Option<RangeCheck<T>>,
	linked_range: Option<LinkedRange<T>>,
	units: Option<String>,
}

impl<T> Default for ValidationContract<T> {
	fn default() -> Self {
		Self::permissive()
	}
}

impl<T> ValidationContract<T> {
	/// A contract that accepts every value.
	pub fn permissive() -> Self {
		ValidationContract {
			permissive: true,
			value_type: None,
			valid_values: None,
			predicate: None,
			range: None,
			linked_range: None,
			units: None,
		}
	}

	pub fn builder() -> ContractBuilder<T> {
		ContractBuilder {
			contract: ValidationContract {
				permissive: false,
				..Self::permissive()
			},
		}
	}

	pub fn is_permissive(&self) -> bool {
		self.permissive
	}

	pub fn is_meaningful(&self) -> bool {
		self.value_type.is_some()
			|| self.valid_values.is_some()
			|| self.predicate.is_some()
			|| self.range.is_some()
			|| self.units.is_some()
	}

	pub fn units(&self) -> Option<&str> {
		self.units.as_deref()
	}

	pub fn value_type(&self) -> Option<&ValueType> {
		self.value_type.as_ref().map(|check| &check.value_type)
	}

	pub fn range_property(&self) -> Option<&Property<Range>> {
		self.linked_range.as_ref().map(|link| &link.property)
	}

	pub(crate) fn linked_range(&self) -> Option<&LinkedRange<T>> {
		self.linked_range.as_ref()
	}

	pub fn is_valid(&self, value: &T) -> bool {
		self.describe_error(value).is_none()
	}

	/// Reason the value is rejected, from the first failing check in order
	/// type, valid values, predicate, range, units.
	pub fn describe_error(&self, value: &T) -> Option<String> {
		self.check_type(value)
			.or_else(|| self.check_valid_values(value))
			.or_else(|| self.check_predicate(value))
			.or_else(|| self.check_range(value))
			.or_else(|| self.check_units())
	}

	fn check_type(&self, value: &T) -> Option<String> {
		let check = self.value_type.as_ref()?;
		let kind = (check.kind)(value);
		if check.value_type.matches(&kind) {
			None
		} else {
			Some(format!(
				"value type {:?} does not match {}",
				kind, check.value_type
			))
		}
	}

	fn check_valid_values(&self, value: &T) -> Option<String> {
		let valid = self.valid_values.as_ref()?;
		if valid.values.iter().any(|v| (valid.eq)(v, value)) {
			None
		} else {
			Some(format!(
				"value is not one of the {} valid values",
				valid.values.len()
			))
		}
	}

	fn check_predicate(&self, value: &T) -> Option<String> {
		let predicate = self.predicate.as_ref()?;
		if predicate(value) {
			None
		} else {
			Some("value failed is_valid_value".to_owned())
		}
	}

	fn check_range(&self, value: &T) -> Option<String> {
		let check = self.range.as_ref()?;
		let range = check.bound.current()?;
		match (check.number)(value) {
			Some(number) if range.contains(number) => None,
			Some(number) => Some(format!("{number} is outside range {range}")),
			None => Some(format!("value has no numeric form for range {range}")),
		}
	}

	fn check_units(&self) -> Option<String> {
		match &self.units {
			Some(units) if !is_valid_unit(units) => Some(format!("unknown units `{units}`")),
			_ => None,
		}
	}

	fn check_configuration(&self) -> Result<()> {
		if !self.permissive && !self.is_meaningful() {
			return Err(PropertyError::Configuration(
				"validation contract has no discriminating key".to_owned(),
			));
		}

		if let Some(message) = self.check_units() {
			return Err(PropertyError::Configuration(message));
		}

		if let Some(valid) = &self.valid_values {
			for (i, value) in valid.values.iter().enumerate() {
				let message = self
					.check_type(value)
					.or_else(|| self.check_predicate(value))
					.or_else(|| self.check_range(value));

				if let Some(message) = message {
					return Err(PropertyError::Configuration(format!(
						"valid value #{i} can never be accepted: {message}"
					)));
				}
			}
		}

		Ok(())
	}
}

pub struct ContractBuilder<T> {
	contract: ValidationContract<T>,
}

impl<T> ContractBuilder<T> {
	pub fn value_type(mut self, value_type: ValueType) -> Self
	where
		T: Inspect,
	{
		self.contract.value_type = Some(TypeCheck {
			value_type,
			kind: |value: &T| value.kind(),
		});
		self
	}

	pub fn valid_values(mut self, values: impl IntoIterator<Item = T>) -> Self
	where
		T: PartialEq,
	{
		self.contract.valid_values = Some(ValidValues {
			values: values.into_iter().collect(),
			eq: |a: &T, b: &T| a == b,
		});
		self
	}

	pub fn is_valid_value(mut self, predicate: impl Fn(&T) -> bool + 'static) -> Self {
		self.contract.predicate = Some(Rc::new(predicate));
		self
	}

	pub fn range(self, range: Range) -> Self
	where
		T: AsNumber,
	{
		self.range_bound(RangeBound::Static(range))
	}

	pub fn dynamic_range(self, range: impl Fn() -> Option<Range> + 'static) -> Self
	where
		T: AsNumber,
	{
		self.range_bound(RangeBound::Dynamic(Rc::new(range)))
	}

	/// Bounds values by the range held in `range`. A property built with this
	/// contract also rejects range changes that would exclude its value.
	pub fn range_property(mut self, range: Property<Range>) -> Self
	where
		T: AsNumber,
	{
		let source = range.downgrade();
		self.contract.linked_range = Some(LinkedRange {
			property: range,
			number: |value: &T| value.as_number(),
		});
		self.dynamic_range(move || source.upgrade().map(|range| range.effective_value()))
	}

	fn range_bound(mut self, bound: RangeBound) -> Self
	where
		T: AsNumber,
	{
		self.contract.range = Some(RangeCheck {
			bound,
			number: |value: &T| value.as_number(),
		});
		self
	}

	pub fn units(mut self, units: impl Into<String>) -> Self {
		self.contract.units = Some(units.into());
		self
	}

	/// Accept a contract with no checks at all.
	pub fn permissive(mut self) -> Self {
		self.contract.permissive = true;
		self
	}

	pub fn build(self) -> Result<ValidationContract<T>> {
		self.contract.check_configuration()?;
		Ok(self.contract)
	}
}
