use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::comparison::ComparisonStrategy;
use crate::deferral::{Commit, Deferrable, Notify, Phase};
use crate::listeners::{Listener, ListenerId, ListenerRegistry};
use crate::range::Range;
use crate::reentrancy::{self, Change, Coordinator, ReentrantStrategy};
use crate::validation::ValidationContract;
use crate::{PropertyError, PropertyValue, ReadOnlyProperty, Result, SettableProperty, UsageError};

type Constraint<T> = Rc<dyn Fn(&T) -> Option<String>>;
type CommitGuard = Rc<dyn Fn() -> Option<String>>;

/// Construction options for a [`Property`].
pub struct PropertyOptions<T> {
	name: Option<String>,
	contract: ValidationContract<T>,
	comparison: Option<ComparisonStrategy<T>>,
	reentrant: bool,
	strategy: ReentrantStrategy,
}

impl<T> Default for PropertyOptions<T> {
	fn default() -> Self {
		PropertyOptions {
			name: None,
			contract: ValidationContract::permissive(),
			comparison: None,
			reentrant: false,
			strategy: ReentrantStrategy::Queue,
		}
	}
}

impl<T> PropertyOptions<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stable external name, used in errors, logs and instrumentation.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn contract(mut self, contract: ValidationContract<T>) -> Self {
		self.contract = contract;
		self
	}

	pub fn comparison(mut self, comparison: ComparisonStrategy<T>) -> Self {
		self.comparison = Some(comparison);
		self
	}

	/// Allow listeners to write to the property they are notified by.
	pub fn reentrant(mut self, reentrant: bool) -> Self {
		self.reentrant = reentrant;
		self
	}

	pub fn reentrant_strategy(mut self, strategy: ReentrantStrategy) -> Self {
		self.strategy = strategy;
		self
	}
}

/// A validated, observable value.
pub struct Property<T: PropertyValue> {
	body: Rc<PropertyBody<T>>,
}

impl<T: PropertyValue> Clone for Property<T> {
	fn clone(&self) -> Self {
		Property {
			body: self.body.clone(),
		}
	}
}

pub struct WeakProperty<T: PropertyValue> {
	body: Weak<PropertyBody<T>>,
}

impl<T: PropertyValue> Clone for WeakProperty<T> {
	fn clone(&self) -> Self {
		WeakProperty {
			body: self.body.clone(),
		}
	}
}

impl<T: PropertyValue> WeakProperty<T> {
	pub fn upgrade(&self) -> Option<Property<T>> {
		self.body.upgrade().map(|body| Property { body })
	}
}

pub struct PropertyBody<T: PropertyValue> {
	name: Option<String>,
	initial: T,
	contract: ValidationContract<T>,
	comparison: ComparisonStrategy<T>,
	reentrant: bool,
	state: RefCell<PropertyState<T>>,
	listeners: RefCell<ListenerRegistry<T>>,
	coordinator: RefCell<Coordinator<T>>,
	constraints: RefCell<Vec<(ListenerId, Constraint<T>)>>,
	guards: RefCell<Vec<(ListenerId, CommitGuard)>>,
	range_constraint: Cell<Option<ListenerId>>,
	this: Weak<PropertyBody<T>>,
}

struct PropertyState<T> {
	value: T,
	previous: Option<T>,
	deferred: bool,
	pending: Option<T>,
	pending_commits: usize,
	disposed: bool,
}

impl<T: PropertyValue> From<Property<T>> for Rc<dyn Any> {
	fn from(property: Property<T>) -> Self {
		property.body
	}
}

impl<T: PropertyValue> TryFrom<Rc<dyn Any>> for Property<T> {
	type Error = Rc<dyn Any>;
	fn try_from(value: Rc<dyn Any>) -> std::result::Result<Self, Self::Error> {
		Rc::downcast::<PropertyBody<T>>(value).map(|body| Property { body })
	}
}

impl<T: PropertyValue> Property<T> {
	pub fn new(value: T) -> Self {
		Property {
			body: PropertyBody::new(value, PropertyOptions::default()),
		}
	}

	/// Fails if the initial value is rejected by the contract.
	pub fn with_options(value: T, options: PropertyOptions<T>) -> Result<Self> {
		if let Some(message) = options.contract.describe_error(&value) {
			let name = options.name.as_deref().unwrap_or(UNNAMED);
			return Err(PropertyError::validation(
				name,
				format!("initial value {value:?}: {message}"),
			));
		}

		let body = PropertyBody::new(value, options);
		body.constrain_range();
		Ok(Property { body })
	}

	pub fn initial_value(&self) -> &T {
		&self.body.initial
	}

	/// Borrow the current value without cloning it.
	pub fn with<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		func(&self.body.state.borrow().value)
	}

	pub fn phase(&self) -> Phase {
		self.body.phase()
	}

	pub fn is_deferred(&self) -> bool {
		self.body.state.borrow().deferred
	}

	pub fn is_notifying(&self) -> bool {
		self.body.coordinator.borrow().is_notifying()
	}

	pub fn reentrant_strategy(&self) -> ReentrantStrategy {
		self.body.coordinator.borrow().strategy()
	}

	pub fn contract(&self) -> &ValidationContract<T> {
		&self.body.contract
	}

	/// Buffered value while deferred, otherwise the current one.
	pub fn effective_value(&self) -> T {
		let state = self.body.state.borrow();
		state.pending.as_ref().unwrap_or(&state.value).clone()
	}

	pub fn validate(&self, value: &T) -> Result<()> {
		self.body.validate(value)
	}

	pub fn set_deferred(&self, deferred: bool) -> Result<Commit<T>> {
		if deferred {
			self.defer().map(|_| Commit::noop())
		} else {
			self.undefer()
		}
	}

	pub fn defer(&self) -> Result<()> {
		self.body.defer()
	}

	/// Applies the buffered value. Listeners are notified once the returned
	/// commit is.
	pub fn undefer(&self) -> Result<Commit<T>> {
		self.body.undefer()
	}

	/// Leaves deferral without writing the buffered value. No-op when the
	/// property is not deferred.
	pub fn discard_deferred(&self) {
		self.body.discard_deferred()
	}

	/// Installs a check that runs after the contract on every write. Used by
	/// dependents whose invariants span this property.
	pub fn add_constraint(&self, constraint: impl Fn(&T) -> Option<String> + 'static) -> ListenerId {
		let id = ListenerId::next();
		self.body.constraints.borrow_mut().push((id, Rc::new(constraint)));
		id
	}

	pub fn remove_constraint(&self, id: ListenerId) -> bool {
		let mut constraints = self.body.constraints.borrow_mut();
		let len = constraints.len();
		constraints.retain(|(entry, _)| *entry != id);
		constraints.len() != len
	}

	/// Installs a check that a pending commit of this property must pass
	/// before its listeners are notified.
	pub fn add_commit_guard(&self, guard: impl Fn() -> Option<String> + 'static) -> ListenerId {
		let id = ListenerId::next();
		self.body.guards.borrow_mut().push((id, Rc::new(guard)));
		id
	}

	pub fn remove_commit_guard(&self, id: ListenerId) -> bool {
		let mut guards = self.body.guards.borrow_mut();
		let len = guards.len();
		guards.retain(|(entry, _)| *entry != id);
		guards.len() != len
	}

	pub fn downgrade(&self) -> WeakProperty<T> {
		WeakProperty {
			body: Rc::downgrade(&self.body),
		}
	}

	pub fn ptr_eq(&self, other: &Property<T>) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}

	pub(crate) fn body(&self) -> &Rc<PropertyBody<T>> {
		&self.body
	}
}

impl<T: PropertyValue> ReadOnlyProperty for Property<T> {
	type Value = T;

	fn name(&self) -> &str {
		self.body.name()
	}

	fn get(&self) -> T {
		self.body.value()
	}

	fn link_listener(&self, listener: Listener<T>, eager: bool) -> Result<ListenerId> {
		self.body.link(listener, eager)
	}

	fn unlink(&self, id: ListenerId) -> bool {
		let removed = self.body.listeners.borrow_mut().remove(id);
		if removed {
			tracing::trace!(property = %self.body.name(), ?id, "listener removed");
		}
		removed
	}

	fn has_listener(&self, id: ListenerId) -> bool {
		self.body.listeners.borrow().contains(id)
	}

	fn listener_count(&self) -> usize {
		self.body.listeners.borrow().len()
	}

	fn dispose(&self) {
		self.body.dispose()
	}

	fn is_disposed(&self) -> bool {
		self.body.state.borrow().disposed
	}
}

impl<T: PropertyValue> SettableProperty for Property<T> {
	fn set(&self, value: T) -> Result<()> {
		self.body.write(value)
	}

	fn reset(&self) -> Result<()> {
		self.body.write(self.body.initial.clone())
	}
}

impl<T: PropertyValue> Deferrable for Property<T> {
	fn defer(&self) -> Result<()> {
		self.body.defer()
	}

	fn undefer_erased(&self) -> Result<Box<dyn Notify>> {
		Ok(Box::new(self.body.undefer()?))
	}

	fn discard_deferred(&self) {
		self.body.discard_deferred()
	}
}

impl<T: PropertyValue> Debug for Property<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Property")
			.field("name", &self.body.name())
			.field("value", &self.body.state.borrow().value)
			.finish()
	}
}

const UNNAMED: &str = "<unnamed>";

impl<T: PropertyValue> PropertyBody<T> {
	fn new(value: T, options: PropertyOptions<T>) -> Rc<Self> {
		Rc::new_cyclic(|this| PropertyBody {
			name: options.name,
			initial: value.clone(),
			contract: options.contract,
			comparison: options.comparison.unwrap_or_default(),
			reentrant: options.reentrant,
			state: RefCell::new(PropertyState {
				value,
				previous: None,
				deferred: false,
				pending: None,
				pending_commits: 0,
				disposed: false,
			}),
			listeners: RefCell::new(ListenerRegistry::new()),
			coordinator: RefCell::new(Coordinator::new(options.strategy)),
			constraints: RefCell::new(Vec::new()),
			guards: RefCell::new(Vec::new()),
			range_constraint: Cell::new(None),
			this: this.clone(),
		})
	}

	pub(crate) fn name(&self) -> &str {
		self.name.as_deref().unwrap_or(UNNAMED)
	}

	pub(crate) fn value(&self) -> T {
		self.state.borrow().value.clone()
	}

	pub(crate) fn has_name(&self) -> bool {
		self.name.is_some()
	}

	fn usage(&self, error: UsageError) -> PropertyError {
		PropertyError::usage(self.name(), error)
	}

	fn phase(&self) -> Phase {
		let state = self.state.borrow();
		if state.disposed {
			Phase::Disposed
		} else if state.deferred {
			Phase::Deferred
		} else if state.pending_commits > 0 {
			Phase::CommitPending
		} else {
			Phase::Idle
		}
	}

	fn check_live(&self) -> Result<()> {
		if self.state.borrow().disposed {
			return Err(self.usage(UsageError::Disposed));
		}
		Ok(())
	}

	fn validate(&self, value: &T) -> Result<()> {
		let message = self.contract.describe_error(value).or_else(|| {
			// Cloned out so a constraint may inspect this property.
			let constraints: Vec<Constraint<T>> =
				self.constraints.borrow().iter().map(|(_, c)| c.clone()).collect();
			constraints.iter().find_map(|constraint| constraint(value))
		});

		match message {
			Some(message) => {
				tracing::warn!(property = %self.name(), ?value, %message, "value rejected");
				Err(PropertyError::validation(
					self.name(),
					format!("{value:?}: {message}"),
				))
			}
			None => Ok(()),
		}
	}

	fn link(&self, listener: Listener<T>, eager: bool) -> Result<ListenerId> {
		self.check_live()?;

		let id = ListenerId::next();
		self.listeners
			.borrow_mut()
			.add(id, listener.clone())
			.map_err(|error| self.usage(error))?;
		tracing::trace!(property = %self.name(), ?id, eager, "listener added");

		if eager {
			let (value, previous) = {
				let state = self.state.borrow();
				(state.value.clone(), state.previous.clone())
			};
			listener(&value, previous.as_ref());
		}

		Ok(id)
	}

	pub(crate) fn write(&self, value: T) -> Result<()> {
		self.check_live()?;
		self.validate(&value)?;

		{
			let mut state = self.state.borrow_mut();
			if state.deferred {
				state.pending = Some(value);
				return Ok(());
			}
		}

		if self.equals_current(&value) {
			return Ok(());
		}

		if !self.reentrant && self.coordinator.borrow().is_notifying() {
			return Err(self.usage(UsageError::Reentrant {
				value: format!("{value:?}"),
			}));
		}

		let old = {
			let mut state = self.state.borrow_mut();
			let old = std::mem::replace(&mut state.value, value.clone());
			state.previous = Some(old.clone());
			old
		};

		self.notify(Change {
			new: value,
			old: Some(old),
		});
		Ok(())
	}

	fn notify(&self, change: Change<T>) {
		let listeners = self.listeners.borrow().snapshot();
		if listeners.is_empty() {
			return;
		}

		let position = {
			let mut coordinator = self.coordinator.borrow_mut();
			tracing::trace!(
				property = %self.name(),
				depth = coordinator.depth(),
				listeners = listeners.len(),
				"notification wave started"
			);
			coordinator.begin(change, listeners)
		};

		if let Some(position) = position {
			reentrancy::run(&self.coordinator, position);
		}
	}

	fn defer(&self) -> Result<()> {
		self.check_live()?;

		let mut state = self.state.borrow_mut();
		if state.deferred {
			return Err(self.usage(UsageError::NestedDeferral));
		}

		state.deferred = true;
		tracing::debug!(property = %self.name(), "deferred");
		Ok(())
	}

	fn undefer(&self) -> Result<Commit<T>> {
		self.check_live()?;

		let pending = {
			let state = self.state.borrow();
			if !state.deferred {
				return Err(self.usage(UsageError::NotDeferred));
			}
			state.pending.clone()
		};

		let Some(pending) = pending else {
			self.state.borrow_mut().deferred = false;
			return Ok(Commit::noop());
		};

		// Ranges and constraints may have moved while the value was buffered.
		// A rejected value stays buffered and the property stays deferred.
		self.validate(&pending)?;

		let unchanged = self.equals_current(&pending);
		let mut state = self.state.borrow_mut();
		state.deferred = false;
		state.pending = None;
		if unchanged {
			return Ok(Commit::noop());
		}

		let old = std::mem::replace(&mut state.value, pending.clone());
		state.previous = Some(old.clone());
		state.pending_commits += 1;
		tracing::debug!(property = %self.name(), value = ?pending, "undeferred with pending value");

		let body = self.this.upgrade().ok_or_else(|| self.usage(UsageError::Disposed))?;
		Ok(Commit::pending(
			body,
			Change {
				new: pending,
				old: Some(old),
			},
		))
	}

	fn discard_deferred(&self) {
		let mut state = self.state.borrow_mut();
		if state.deferred {
			state.deferred = false;
			state.pending = None;
			tracing::debug!(property = %self.name(), "deferred value discarded");
		}
	}

	/// Comparators may read the property, so only a shared borrow is held.
	fn equals_current(&self, value: &T) -> bool {
		let state = self.state.borrow();
		self.comparison.equals(&state.value, value)
	}

	/// Makes a linked range property refuse ranges that exclude the
	/// current value.
	fn constrain_range(&self) {
		let Some(link) = self.contract.linked_range() else {
			return;
		};

		let number = link.number;
		let this = self.this.clone();
		let id = link.property.add_constraint(move |range: &Range| {
			let body = this.upgrade()?;
			let state = body.state.borrow();
			if state.deferred || state.disposed {
				return None;
			}

			let current = number(&state.value)?;
			(!range.contains(current))
				.then(|| format!("{} = {current} would fall outside {range}", body.name()))
		});
		self.range_constraint.set(Some(id));
	}

	pub(crate) fn check_commit(&self) -> Result<()> {
		if self.state.borrow().disposed {
			return Ok(());
		}

		if !self.reentrant && self.coordinator.borrow().is_notifying() {
			let value = format!("{:?}", self.state.borrow().value);
			return Err(self.usage(UsageError::Reentrant { value }));
		}

		let guards: Vec<CommitGuard> = self.guards.borrow().iter().map(|(_, g)| g.clone()).collect();
		match guards.iter().find_map(|guard| guard()) {
			Some(message) => Err(self.usage(UsageError::CommitOrder(message))),
			None => Ok(()),
		}
	}

	pub(crate) fn finish_commit(&self, change: Change<T>) {
		{
			let mut state = self.state.borrow_mut();
			state.pending_commits -= 1;
			if state.disposed {
				return;
			}
		}

		self.notify(change);
	}

	pub(crate) fn abandon_commit(&self) {
		let mut state = self.state.borrow_mut();
		state.pending_commits = state.pending_commits.saturating_sub(1);
	}

	fn dispose(&self) {
		{
			let mut state = self.state.borrow_mut();
			if state.disposed {
				return;
			}
			state.disposed = true;
			state.deferred = false;
			state.pending = None;
		}

		self.listeners.borrow_mut().clear();
		self.coordinator.borrow_mut().clear();
		self.constraints.borrow_mut().clear();
		self.guards.borrow_mut().clear();
		if let (Some(id), Some(link)) = (self.range_constraint.take(), self.contract.linked_range()) {
			link.property.remove_constraint(id);
		}
		tracing::debug!(property = %self.name(), "disposed");
	}
}
