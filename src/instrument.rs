use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as StateObject;

use crate::property::{Property, PropertyBody};
use crate::{PropertyError, PropertyValue, Result, UsageError};

/// What an external recording or debugging tool sees of a property.
pub trait Instrumented {
	fn name(&self) -> &str;
	fn to_state_object(&self) -> Result<StateObject>;
	/// Writes a previously captured state through the validated write path.
	fn apply_state_object(&self, state: &StateObject) -> Result<()>;
}

impl<T> Instrumented for PropertyBody<T>
where
	T: PropertyValue + Serialize + DeserializeOwned,
{
	fn name(&self) -> &str {
		PropertyBody::name(self)
	}

	fn to_state_object(&self) -> Result<StateObject> {
		let value = self.value();
		serde_json::to_value(&value).map_err(|error| {
			PropertyError::validation(PropertyBody::name(self), format!("cannot serialize: {error}"))
		})
	}

	fn apply_state_object(&self, state: &StateObject) -> Result<()> {
		let value = T::deserialize(state).map_err(|error| {
			PropertyError::validation(PropertyBody::name(self), format!("cannot deserialize: {error}"))
		})?;
		self.write(value)
	}
}

struct Entry {
	instrumented: Rc<dyn Instrumented>,
	any: Rc<dyn Any>,
}

/// Named properties visible to instrumentation. Nothing is registered
/// unless a registry is handed to [`Property::instrument`].
#[derive(Default)]
pub struct Registry {
	entries: RefCell<BTreeMap<String, Entry>>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.borrow().is_empty()
	}

	pub fn names(&self) -> Vec<String> {
		self.entries.borrow().keys().cloned().collect()
	}

	pub fn get(&self, name: &str) -> Option<Rc<dyn Instrumented>> {
		self.entries
			.borrow()
			.get(name)
			.map(|entry| entry.instrumented.clone())
	}

	/// Typed access to a registered property.
	pub fn property<T: PropertyValue>(&self, name: &str) -> Option<Property<T>> {
		let any = self.entries.borrow().get(name)?.any.clone();
		Property::try_from(any).ok()
	}

	pub fn unregister(&self, name: &str) -> bool {
		self.entries.borrow_mut().remove(name).is_some()
	}

	/// State objects of every registered property, keyed by name.
	pub fn snapshot(&self) -> Result<BTreeMap<String, StateObject>> {
		let entries: Vec<(String, Rc<dyn Instrumented>)> = self
			.entries
			.borrow()
			.iter()
			.map(|(name, entry)| (name.clone(), entry.instrumented.clone()))
			.collect();

		entries
			.into_iter()
			.map(|(name, instrumented)| Ok((name, instrumented.to_state_object()?)))
			.collect()
	}

	fn insert(&self, name: &str, instrumented: Rc<dyn Instrumented>, any: Rc<dyn Any>) -> Result<()> {
		let mut entries = self.entries.borrow_mut();
		if entries.contains_key(name) {
			return Err(PropertyError::usage(
				name,
				UsageError::DuplicateName(name.to_owned()),
			));
		}

		entries.insert(name.to_owned(), Entry { instrumented, any });
		tracing::debug!(property = %name, "instrumented");
		Ok(())
	}
}

impl<T> Property<T>
where
	T: PropertyValue + Serialize + DeserializeOwned,
{
	/// Registers this property under its name.
	pub fn instrument(&self, registry: &Registry) -> Result<()> {
		let body = self.body();
		if !body.has_name() {
			return Err(PropertyError::usage(body.name(), UsageError::Unnamed));
		}

		registry.insert(
			body.name(),
			body.clone() as Rc<dyn Instrumented>,
			self.clone().into(),
		)
	}

	pub fn to_state_object(&self) -> Result<StateObject> {
		self.body().to_state_object()
	}

	pub fn apply_state_object(&self, state: &StateObject) -> Result<()> {
		self.body().apply_state_object(state)
	}
}
