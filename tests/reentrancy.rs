use tether::{
	Property, PropertyOptions, ReadOnlyProperty, ReentrantStrategy, SettableProperty, UsageError,
};

use crate::mock::{self, Recorder};

/// A property whose first listener keeps incrementing it up to 9 and whose
/// second listener records every `(old, new)` pair it hears about.
fn counter(strategy: ReentrantStrategy) -> (Property<i32>, Recorder<(i32, i32)>) {
	let property = Property::with_options(
		1,
		PropertyOptions::new()
			.name("counter")
			.reentrant(true)
			.reentrant_strategy(strategy),
	)
	.unwrap();

	property
		.lazy_link({
			let property = property.downgrade();
			move |new, _| {
				if *new < 9 {
					property.upgrade().unwrap().set(new + 1).unwrap();
				}
			}
		})
		.unwrap();

	let log = Recorder::new();
	property
		.lazy_link({
			let log = log.clone();
			move |new, old: Option<&i32>| log.push((*old.unwrap(), *new))
		})
		.unwrap();

	(property, log)
}

#[test]
fn queue_delivers_writes_in_order() {
	mock::init_tracing();
	let (property, log) = counter(ReentrantStrategy::Queue);

	property.set(2).unwrap();

	let expected: Vec<_> = (1..9).map(|n| (n, n + 1)).collect();
	assert_eq!(log.take(), expected);
	assert_eq!(property.get(), 9);
	assert!(!property.is_notifying());
}

#[test]
fn stack_delivers_the_latest_write_first() {
	let (property, log) = counter(ReentrantStrategy::Stack);
	assert_eq!(property.reentrant_strategy(), ReentrantStrategy::Stack);

	property.set(2).unwrap();

	let expected: Vec<_> = (1..9).rev().map(|n| (n, n + 1)).collect();
	assert_eq!(log.take(), expected);
	assert_eq!(property.get(), 9);
	assert!(!property.is_notifying());
}

#[test]
fn non_reentrant_property_rejects_writes_from_listeners() {
	let property = Property::with_options(0, PropertyOptions::new().name("strict")).unwrap();
	let errors = Recorder::new();

	property
		.lazy_link({
			let property = property.downgrade();
			let errors = errors.clone();
			move |new, _| {
				if let Err(error) = property.upgrade().unwrap().set(new + 1) {
					errors.push(error);
				}
			}
		})
		.unwrap();

	property.set(1).unwrap();

	let errors = errors.take();
	assert_eq!(errors.len(), 1);
	assert!(matches!(
		errors[0].usage_error(),
		Some(UsageError::Reentrant { .. })
	));
	assert_eq!(property.get(), 1);

	// Outside of a notification writes go through again.
	property.set(5).unwrap();
	assert_eq!(property.get(), 5);
}

#[test]
fn writing_the_current_value_from_a_listener_is_allowed() {
	let property = Property::new(0);
	let calls = Recorder::new();

	property
		.lazy_link({
			let property = property.downgrade();
			let calls = calls.clone();
			move |new, _| {
				calls.push(*new);
				property.upgrade().unwrap().set(*new).unwrap();
			}
		})
		.unwrap();

	property.set(3).unwrap();
	assert_eq!(calls.take(), vec![3]);
}

#[test]
fn listeners_of_one_wave_see_the_same_change() {
	let property = Property::with_options(0, PropertyOptions::new().reentrant(true)).unwrap();
	let log = Recorder::new();

	property
		.lazy_link({
			let property = property.downgrade();
			move |new, _| {
				if *new == 1 {
					property.upgrade().unwrap().set(10).unwrap();
				}
			}
		})
		.unwrap();
	property
		.lazy_link({
			let log = log.clone();
			move |new, old: Option<&i32>| log.push((*old.unwrap(), *new))
		})
		.unwrap();

	property.set(1).unwrap();

	// The second listener still hears 0 -> 1 even though the value is
	// already 10 when it runs.
	assert_eq!(log.take(), vec![(0, 1), (1, 10)]);
}
