use std::fmt::Debug;
use std::rc::Rc;

use crate::property::PropertyBody;
use crate::reentrancy::Change;
use crate::{PropertyError, PropertyValue, Result, UsageError};

/// Where a property is in its deferral lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Idle,
	Deferred,
	/// Undeferred, but the commit returned by the undeferral has not
	/// notified its listeners yet.
	CommitPending,
	Disposed,
}

enum CommitState<T: PropertyValue> {
	Noop,
	Pending {
		body: Rc<PropertyBody<T>>,
		change: Change<T>,
	},
	Done(String),
}

/// Notification owed by an undeferred property.
///
/// The new value is already visible through `get` when the commit is
/// created, listeners only hear about it once [`Commit::notify`] runs.
#[must_use = "listeners are not notified until `notify` is called"]
pub struct Commit<T: PropertyValue> {
	state: CommitState<T>,
}

impl<T: PropertyValue> Commit<T> {
	pub(crate) fn noop() -> Self {
		Commit {
			state: CommitState::Noop,
		}
	}

	pub(crate) fn pending(body: Rc<PropertyBody<T>>, change: Change<T>) -> Self {
		Commit {
			state: CommitState::Pending { body, change },
		}
	}

	pub fn is_noop(&self) -> bool {
		matches!(self.state, CommitState::Noop)
	}

	pub fn notify(&mut self) -> Result<()> {
		let name = match &self.state {
			CommitState::Noop => return Ok(()),
			CommitState::Done(name) => {
				return Err(PropertyError::usage(name, UsageError::AlreadyCommitted))
			}
			CommitState::Pending { body, .. } => {
				body.check_commit()?;
				body.name().to_owned()
			}
		};

		if let CommitState::Pending { body, change } =
			std::mem::replace(&mut self.state, CommitState::Done(name))
		{
			body.finish_commit(change);
		}

		Ok(())
	}

	/// Gives up on notifying. The value stays applied, its listeners never
	/// hear about it.
	pub fn abandon(&mut self) {
		if let CommitState::Pending { body, .. } = &self.state {
			let name = body.name().to_owned();
			body.abandon_commit();
			tracing::warn!(property = %name, "commit abandoned");
			self.state = CommitState::Done(name);
		}
	}
}

impl<T: PropertyValue> Debug for Commit<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &self.state {
			CommitState::Noop => f.write_str("Commit::Noop"),
			CommitState::Pending { body, change } => f
				.debug_struct("Commit::Pending")
				.field("property", &body.name())
				.field("new", &change.new)
				.field("old", &change.old)
				.finish(),
			CommitState::Done(name) => f.debug_tuple("Commit::Done").field(name).finish(),
		}
	}
}

impl<T: PropertyValue> Drop for Commit<T> {
	fn drop(&mut self) {
		if let CommitState::Pending { body, .. } = &self.state {
			body.abandon_commit();
			tracing::error!(property = %body.name(), "commit dropped before notifying");

			if cfg!(debug_assertions) && !std::thread::panicking() {
				panic!("commit of `{}` dropped before notifying its listeners", body.name());
			}
		}
	}
}

/// Type-erased commit, so heterogeneous properties can take part in one
/// [`transaction`].
pub trait Notify {
	fn notify(&mut self) -> Result<()>;
	fn abandon(&mut self);
}

impl<T: PropertyValue> Notify for Commit<T> {
	fn notify(&mut self) -> Result<()> {
		Commit::notify(self)
	}

	fn abandon(&mut self) {
		Commit::abandon(self)
	}
}

pub trait Deferrable {
	fn defer(&self) -> Result<()>;
	fn undefer_erased(&self) -> Result<Box<dyn Notify>>;
	/// Leaves deferral, dropping the buffered value.
	fn discard_deferred(&self);
}

/// Defers every member, runs `func`, then undefers and notifies the members
/// in the order given. Every member is undeferred before the first listener
/// runs. A member that is already deferred fails the whole transaction
/// before `func` runs. A member whose buffered value is no longer valid is
/// left unchanged.
///
/// Commits refused by a commit guard are retried once every other commit
/// has notified. Commits refused again are abandoned and the first error is
/// returned.
pub fn transaction<R>(members: &[&dyn Deferrable], func: impl FnOnce() -> R) -> Result<R> {
	for (i, member) in members.iter().enumerate() {
		if let Err(error) = member.defer() {
			for started in &members[..i] {
				started.discard_deferred();
			}
			return Err(error);
		}
	}

	let output = func();

	let mut first_error = None;
	let mut commits = Vec::with_capacity(members.len());
	for member in members {
		match member.undefer_erased() {
			Ok(commit) => commits.push(commit),
			Err(error) => {
				member.discard_deferred();
				first_error.get_or_insert(error);
			}
		}
	}

	let mut refused = Vec::new();
	for mut commit in commits {
		if commit.notify().is_err() {
			refused.push(commit);
		}
	}

	for mut commit in refused {
		if let Err(error) = commit.notify() {
			commit.abandon();
			first_error.get_or_insert(error);
		}
	}

	match first_error {
		Some(error) => Err(error),
		None => Ok(output),
	}
}
