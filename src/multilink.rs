use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::listeners::ListenerId;
use crate::{ReadOnlyProperty, Result};

/// Registration of a private listener on one source.
pub struct Subscription {
	unlink: Box<dyn Fn()>,
}

impl Subscription {
	fn new<P>(source: &P, id: ListenerId) -> Self
	where
		P: ReadOnlyProperty + Clone + 'static,
	{
		let source = source.clone();
		Subscription {
			unlink: Box::new(move || {
				source.unlink(id);
			}),
		}
	}

	pub(crate) fn cancel(self) {
		(self.unlink)()
	}
}

/// A fixed, ordered group of observables.
pub trait Sources: 'static {
	type Values;

	fn values(&self) -> Self::Values;

	#[doc(hidden)]
	fn subscribe(&self, notify: Rc<dyn Fn()>) -> Result<Vec<Subscription>>;
}

macro_rules! sources {
	($($name:ident : $index:tt),+) => {
		impl<$($name),+> Sources for ($($name,)+)
		where
			$($name: ReadOnlyProperty + Clone + 'static,)+
		{
			type Values = ($($name::Value,)+);

			fn values(&self) -> Self::Values {
				($(self.$index.get(),)+)
			}

			fn subscribe(&self, notify: Rc<dyn Fn()>) -> Result<Vec<Subscription>> {
				let mut subscriptions = Vec::new();
				$(
					let id = {
						let notify = notify.clone();
						self.$index.lazy_link(move |_, _| notify())
					};
					match id {
						Ok(id) => subscriptions.push(Subscription::new(&self.$index, id)),
						Err(error) => {
							subscriptions.into_iter().for_each(Subscription::cancel);
							return Err(error);
						}
					}
				)+
				Ok(subscriptions)
			}
		}
	};
}

sources!(A: 0);
sources!(A: 0, B: 1);
sources!(A: 0, B: 1, C: 2);
sources!(A: 0, B: 1, C: 2, D: 3);

pub(crate) struct Subscriptions {
	inner: RefCell<Vec<Subscription>>,
}

impl Subscriptions {
	pub fn new(subscriptions: Vec<Subscription>) -> Self {
		Subscriptions {
			inner: RefCell::new(subscriptions),
		}
	}

	pub fn replace(&self, subscriptions: Vec<Subscription>) {
		let previous = std::mem::replace(&mut *self.inner.borrow_mut(), subscriptions);
		previous.into_iter().for_each(Subscription::cancel);
	}

	pub fn cancel(&self) {
		let subscriptions = std::mem::take(&mut *self.inner.borrow_mut());
		subscriptions.into_iter().for_each(Subscription::cancel);
	}
}

/// Calls back whenever any of its sources changes, until disposed or
/// dropped.
#[must_use = "a multilink stops listening as soon as it is dropped"]
pub struct Multilink {
	body: Rc<MultilinkBody>,
}

struct MultilinkBody {
	fire: Box<dyn Fn()>,
	subscriptions: RefCell<Option<Subscriptions>>,
}

impl Drop for MultilinkBody {
	fn drop(&mut self) {
		if let Some(subscriptions) = self.subscriptions.get_mut().take() {
			subscriptions.cancel();
		}
	}
}

impl MultilinkBody {
	fn fire(&self) {
		if self.subscriptions.borrow().is_some() {
			(self.fire)();
		}
	}
}

pub fn multilink<S, F>(sources: S, callback: F) -> Result<Multilink>
where
	S: Sources,
	F: Fn(S::Values) + 'static,
{
	Multilink::new(sources, callback, true)
}

/// Like [`multilink`], without the initial call.
pub fn lazy_multilink<S, F>(sources: S, callback: F) -> Result<Multilink>
where
	S: Sources,
	F: Fn(S::Values) + 'static,
{
	Multilink::new(sources, callback, false)
}

impl Multilink {
	fn new<S, F>(sources: S, callback: F, eager: bool) -> Result<Self>
	where
		S: Sources,
		F: Fn(S::Values) + 'static,
	{
		let mut subscribed = Ok(Vec::new());
		let body = Rc::new_cyclic(|this: &Weak<MultilinkBody>| {
			let this = this.clone();
			subscribed = sources.subscribe(Rc::new(move || {
				if let Some(body) = this.upgrade() {
					body.fire();
				}
			}));

			MultilinkBody {
				fire: Box::new(move || callback(sources.values())),
				subscriptions: RefCell::new(None),
			}
		});

		*body.subscriptions.borrow_mut() = Some(Subscriptions::new(subscribed?));

		if eager {
			body.fire();
		}

		Ok(Multilink { body })
	}

	pub fn dispose(&self) {
		let subscriptions = self.body.subscriptions.borrow_mut().take();
		if let Some(subscriptions) = subscriptions {
			subscriptions.cancel();
			tracing::trace!("multilink disposed");
		}
	}

	pub fn is_disposed(&self) -> bool {
		self.body.subscriptions.borrow().is_none()
	}
}
