use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::listeners::{Listener, Snapshot};

/// Order in which reentrant writes are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReentrantStrategy {
	/// Breadth first: a write made by a listener is delivered after the
	/// current wave reached every listener.
	#[default]
	Queue,
	/// Depth first: a write made by a listener is delivered to every
	/// listener before the current wave resumes.
	Stack,
}

pub(crate) struct Change<T> {
	pub new: T,
	pub old: Option<T>,
}

struct Wave<T> {
	change: Rc<Change<T>>,
	listeners: Snapshot<T>,
	next: usize,
}

/// Pending notification waves of one observable.
pub(crate) struct Coordinator<T> {
	strategy: ReentrantStrategy,
	waves: VecDeque<Wave<T>>,
}

impl<T> Coordinator<T> {
	pub fn new(strategy: ReentrantStrategy) -> Self {
		Coordinator {
			strategy,
			waves: VecDeque::new(),
		}
	}

	pub fn strategy(&self) -> ReentrantStrategy {
		self.strategy
	}

	pub fn is_notifying(&self) -> bool {
		!self.waves.is_empty()
	}

	pub fn depth(&self) -> usize {
		self.waves.len()
	}

	/// Schedules a wave. Returns the position the caller has to drive with
	/// [`run`], or `None` when an outer caller already drives the queue.
	pub fn begin(&mut self, change: Change<T>, listeners: Snapshot<T>) -> Option<usize> {
		self.waves.push_back(Wave {
			change: Rc::new(change),
			listeners,
			next: 0,
		});

		match self.strategy {
			ReentrantStrategy::Queue if self.waves.len() == 1 => Some(0),
			ReentrantStrategy::Queue => None,
			ReentrantStrategy::Stack => Some(self.waves.len() - 1),
		}
	}

	fn next(&mut self, position: usize) -> Option<(Listener<T>, Rc<Change<T>>)> {
		loop {
			let wave = self.waves.get_mut(position)?;
			if let Some(listener) = wave.listeners.get(wave.next) {
				wave.next += 1;
				return Some((listener.clone(), wave.change.clone()));
			}

			self.waves.remove(position);
			tracing::trace!(remaining = self.waves.len(), "notification wave finished");

			if self.strategy == ReentrantStrategy::Stack {
				return None;
			}
		}
	}

	pub fn clear(&mut self) {
		self.waves.clear();
	}
}

/// Calls the listeners of the wave at `position` until it, and for the queue
/// strategy every wave scheduled behind it, is delivered.
pub(crate) fn run<T>(coordinator: &RefCell<Coordinator<T>>, position: usize) {
	loop {
		let next = coordinator.borrow_mut().next(position);
		match next {
			Some((listener, change)) => listener(&change.new, change.old.as_ref()),
			None => break,
		}
	}
}
