use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::listeners::{Listener, ListenerId};
use crate::multilink::{Sources, Subscriptions};
use crate::property::{Property, PropertyOptions};
use crate::{PropertyValue, ReadOnlyProperty, Result};

/// Read-only value recomputed from its sources whenever one of them
/// changes.
pub struct DerivedProperty<T: PropertyValue> {
	body: Rc<DerivedBody<T>>,
}

impl<T: PropertyValue> Clone for DerivedProperty<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

struct DerivedBody<T: PropertyValue> {
	value: Property<T>,
	derive: Box<dyn Fn() -> T>,
	subscriptions: Subscriptions,
}

impl<T: PropertyValue> Drop for DerivedBody<T> {
	fn drop(&mut self) {
		self.subscriptions.cancel();
	}
}

impl<T: PropertyValue> DerivedProperty<T> {
	pub fn new<S, F>(sources: S, derive: F) -> Result<Self>
	where
		S: Sources,
		F: Fn(S::Values) -> T + 'static,
	{
		Self::with_options(sources, derive, PropertyOptions::default())
	}

	pub fn with_options<S, F>(sources: S, derive: F, options: PropertyOptions<T>) -> Result<Self>
	where
		S: Sources,
		F: Fn(S::Values) -> T + 'static,
	{
		let value = Property::with_options(derive(sources.values()), options)?;

		let mut subscribed = Ok(Vec::new());
		let body = Rc::new_cyclic(|this: &Weak<DerivedBody<T>>| {
			let this = this.clone();
			subscribed = sources.subscribe(Rc::new(move || {
				if let Some(body) = this.upgrade() {
					body.recompute();
				}
			}));

			DerivedBody {
				value,
				derive: Box::new(move || derive(sources.values())),
				subscriptions: Subscriptions::new(Vec::new()),
			}
		});

		body.subscriptions.replace(subscribed?);
		Ok(DerivedProperty { body })
	}
}

impl<T: PropertyValue> DerivedBody<T> {
	fn recompute(&self) {
		if self.value.is_disposed() {
			return;
		}

		let value = (self.derive)();
		if let Err(error) = self.value.body().write(value) {
			tracing::error!(property = %self.value.name(), %error, "derived value rejected");
		}
	}
}

impl<T: PropertyValue> ReadOnlyProperty for DerivedProperty<T> {
	type Value = T;

	fn name(&self) -> &str {
		self.body.value.name()
	}

	fn get(&self) -> T {
		self.body.value.get()
	}

	fn link_listener(&self, listener: Listener<T>, eager: bool) -> Result<ListenerId> {
		self.body.value.link_listener(listener, eager)
	}

	fn unlink(&self, id: ListenerId) -> bool {
		self.body.value.unlink(id)
	}

	fn has_listener(&self, id: ListenerId) -> bool {
		self.body.value.has_listener(id)
	}

	fn listener_count(&self) -> usize {
		self.body.value.listener_count()
	}

	fn dispose(&self) {
		self.body.subscriptions.cancel();
		self.body.value.dispose();
	}

	fn is_disposed(&self) -> bool {
		self.body.value.is_disposed()
	}
}

impl<T: PropertyValue> Property<T> {
	pub fn map<R, F>(&self, func: F) -> Result<DerivedProperty<R>>
	where
		R: PropertyValue,
		F: Fn(&T) -> R + 'static,
	{
		DerivedProperty::new((self.clone(),), move |(value,)| func(&value))
	}
}

impl<T: PropertyValue> Debug for DerivedProperty<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DerivedProperty")
			.field("name", &self.name())
			.field("value", &self.get())
			.finish()
	}
}
