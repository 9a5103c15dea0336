use std::cell::Cell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::UsageError;

pub type Listener<T> = Rc<dyn Fn(&T, Option<&T>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

thread_local! {
	static NEXT_ID: Cell<u64> = Cell::new(0);
}

impl ListenerId {
	pub(crate) fn next() -> Self {
		NEXT_ID.with(|next| {
			let id = next.get();
			next.set(id + 1);
			ListenerId(id)
		})
	}
}

/// Listeners of one observable in registration order.
pub struct ListenerRegistry<T> {
	entries: SmallVec<[(ListenerId, Listener<T>); 4]>,
}

impl<T> Default for ListenerRegistry<T> {
	fn default() -> Self {
		ListenerRegistry {
			entries: SmallVec::new(),
		}
	}
}

impl<T> ListenerRegistry<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, id: ListenerId, listener: Listener<T>) -> Result<(), UsageError> {
		if self.contains(id) {
			return Err(UsageError::DuplicateListener);
		}

		self.entries.push((id, listener));
		Ok(())
	}

	/// Returns `false` if the listener was not registered.
	pub fn remove(&mut self, id: ListenerId) -> bool {
		match self.entries.iter().position(|(entry, _)| *entry == id) {
			Some(index) => {
				self.entries.remove(index);
				true
			}
			None => false,
		}
	}

	pub fn contains(&self, id: ListenerId) -> bool {
		self.entries.iter().any(|(entry, _)| *entry == id)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	/// Copy of the current listeners. Iterating the copy stays valid while
	/// the registry itself is modified by the listeners being called.
	pub fn snapshot(&self) -> Snapshot<T> {
		self.entries.iter().map(|(_, listener)| listener.clone()).collect()
	}
}

pub type Snapshot<T> = SmallVec<[Listener<T>; 4]>;
