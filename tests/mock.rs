use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard};

use mockall::*;

#[automock]
pub trait Spy {
	fn changed(&self, new: i64, old: Option<i64>);
	fn fired(&self);
}

#[derive(Clone)]
pub struct SharedMock(Arc<Mutex<MockSpy>>);

impl SharedMock {
	pub fn new() -> SharedMock {
		SharedMock(Arc::new(Mutex::new(MockSpy::new())))
	}

	pub fn get<'a>(&'a self) -> MutexGuard<'a, MockSpy> {
		return self.0.lock().unwrap();
	}
}

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_max_level(tracing::Level::TRACE)
		.with_test_writer()
		.try_init();
}

/// Keeps every notification in arrival order.
pub struct Recorder<T>(Rc<RefCell<Vec<T>>>);

impl<T> Clone for Recorder<T> {
	fn clone(&self) -> Self {
		Recorder(self.0.clone())
	}
}

impl<T: Clone> Recorder<T> {
	pub fn new() -> Self {
		Recorder(Rc::new(RefCell::new(Vec::new())))
	}

	pub fn push(&self, item: T) {
		self.0.borrow_mut().push(item);
	}

	pub fn take(&self) -> Vec<T> {
		std::mem::take(&mut *self.0.borrow_mut())
	}

	pub fn len(&self) -> usize {
		self.0.borrow().len()
	}
}
