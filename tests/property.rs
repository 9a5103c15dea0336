use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tether::{
	ComparisonStrategy, Property, PropertyOptions, Range, ReadOnlyProperty, SettableProperty,
	UsageError, ValidationContract, WeakProperty,
};

use crate::mock::{self, Recorder, Spy};

#[test]
fn set_notifies_once_per_change() {
	mock::init_tracing();
	let a = Property::new(10i64);
	let mock = mock::SharedMock::new();

	mock.get().expect_changed().times(1).return_const(());

	a.lazy_link({
		let mock = mock.clone();
		move |new, old| mock.get().changed(*new, old.copied())
	})
	.unwrap();

	a.set(20).unwrap();
	a.set(20).unwrap();
	a.set(20).unwrap();

	mock.get().checkpoint();
	assert_eq!(a.get(), 20);
}

#[test]
fn link_calls_back_immediately() {
	let a = Property::new(1i64);
	a.set(2).unwrap();

	let mock = mock::SharedMock::new();
	mock.get()
		.expect_changed()
		.withf(|new, old| *new == 2 && *old == Some(1))
		.times(1)
		.return_const(());

	a.link({
		let mock = mock.clone();
		move |new, old| mock.get().changed(*new, old.copied())
	})
	.unwrap();

	mock.get().checkpoint();

	mock.get().expect_changed().times(0).return_const(());
	a.lazy_link({
		let mock = mock.clone();
		move |new, old| mock.get().changed(*new, old.copied())
	})
	.unwrap();
	mock.get().checkpoint();
}

#[test]
fn listeners_see_old_and_new_values_in_order() {
	let a = Property::new("a".to_owned());
	let log = Recorder::new();

	for tag in 0..3 {
		let log = log.clone();
		a.lazy_link(move |new: &String, old: Option<&String>| {
			log.push((tag, old.cloned(), new.clone()))
		})
		.unwrap();
	}

	a.set("b".to_owned()).unwrap();

	let expected: Vec<_> = (0..3)
		.map(|tag| (tag, Some("a".to_owned()), "b".to_owned()))
		.collect();
	assert_eq!(log.take(), expected);
}

#[test]
fn unlink_during_notification_applies_to_the_next_wave() {
	let a = Property::new(0);
	let log = Recorder::new();

	let second = std::rc::Rc::new(std::cell::Cell::new(None));
	a.lazy_link({
		let a = a.downgrade();
		let second = second.clone();
		let log = log.clone();
		move |_, _| {
			log.push("first");
			if let (Some(a), Some(id)) = (a.upgrade(), second.get()) {
				a.unlink(id);
			}
		}
	})
	.unwrap();

	let id = a
		.lazy_link({
			let log = log.clone();
			move |_, _| log.push("second")
		})
		.unwrap();
	second.set(Some(id));

	a.set(1).unwrap();
	assert_eq!(log.take(), vec!["first", "second"]);
	assert!(!a.has_listener(id));

	a.set(2).unwrap();
	assert_eq!(log.take(), vec!["first"]);
}

#[test]
fn listener_added_during_notification_waits_for_the_next_wave() {
	let a = Property::new(0);
	let log = Recorder::new();

	a.lazy_link({
		let a = a.downgrade();
		let log = log.clone();
		move |new, _| {
			log.push(format!("outer {new}"));
			if *new == 1 {
				let log = log.clone();
				a.upgrade()
					.unwrap()
					.lazy_link(move |new, _| log.push(format!("inner {new}")))
					.unwrap();
			}
		}
	})
	.unwrap();

	a.set(1).unwrap();
	a.set(2).unwrap();

	assert_eq!(log.take(), vec!["outer 1", "outer 2", "inner 2"]);
}

#[test]
fn rejected_value_leaves_property_untouched() {
	let contract = ValidationContract::builder()
		.is_valid_value(|v: &i32| *v >= 0)
		.build()
		.unwrap();
	let a = Property::with_options(1, PropertyOptions::new().name("count").contract(contract))
		.unwrap();
	let log = Recorder::new();
	a.lazy_link({
		let log = log.clone();
		move |new, _| log.push(*new)
	})
	.unwrap();

	let err = a.set(-1).unwrap_err();
	assert!(err.is_validation());
	assert!(err.to_string().contains("count"), "{err}");
	assert_eq!(a.get(), 1);
	assert_eq!(log.len(), 0);
	assert_eq!(a.listener_count(), 1);
}

#[test]
fn invalid_initial_value_fails_construction() {
	let contract = ValidationContract::builder()
		.valid_values(["red", "green"])
		.build()
		.unwrap();

	let result = Property::with_options("blue", PropertyOptions::new().contract(contract));
	assert!(result.unwrap_err().is_validation());
}

#[test]
fn reset_restores_the_initial_value() {
	let a = Property::new(3);
	a.set(4).unwrap();
	a.set(5).unwrap();

	let log = Recorder::new();
	a.lazy_link({
		let log = log.clone();
		move |new, old: Option<&i32>| log.push((*old.unwrap(), *new))
	})
	.unwrap();

	a.reset().unwrap();
	a.reset().unwrap();

	assert_eq!(a.get(), *a.initial_value());
	assert_eq!(log.take(), vec![(5, 3)]);
}

#[test]
fn dispose_severs_listeners_and_rejects_writes() {
	let a = Property::with_options(0, PropertyOptions::new().name("a")).unwrap();
	let log = Recorder::new();
	a.lazy_link({
		let log = log.clone();
		move |new, _| log.push(*new)
	})
	.unwrap();

	a.dispose();
	a.dispose();

	assert!(a.is_disposed());
	assert_eq!(a.listener_count(), 0);
	assert_eq!(
		a.set(1).unwrap_err().usage_error(),
		Some(&UsageError::Disposed)
	);
	assert!(a.link(|_, _| {}).is_err());
	assert_eq!(a.get(), 0);
	assert_eq!(log.len(), 0);
}

#[test]
fn dispose_during_notification_stops_the_wave() {
	let a = Property::new(0);
	let log = Recorder::new();

	a.lazy_link({
		let a = a.downgrade();
		move |_, _| a.upgrade().unwrap().dispose()
	})
	.unwrap();
	a.lazy_link({
		let log = log.clone();
		move |new, _| log.push(*new)
	})
	.unwrap();

	a.set(1).unwrap();
	assert_eq!(log.len(), 0);
}

#[derive(Debug, Clone, PartialEq, Hash)]
struct Tagged {
	id: u32,
	label: &'static str,
}

#[test]
fn comparison_strategy_decides_what_counts_as_a_change() {
	let by_id = Property::with_options(
		Tagged { id: 1, label: "a" },
		PropertyOptions::new().comparison(ComparisonStrategy::custom(|a: &Tagged, b: &Tagged| {
			a.id == b.id
		})),
	)
	.unwrap();

	let log = Recorder::new();
	by_id
		.lazy_link({
			let log = log.clone();
			move |new: &Tagged, _| log.push(new.label)
		})
		.unwrap();

	by_id.set(Tagged { id: 1, label: "b" }).unwrap();
	assert_eq!(by_id.get().label, "a");

	by_id.set(Tagged { id: 2, label: "c" }).unwrap();
	assert_eq!(log.take(), vec!["c"]);
}

#[derive(Debug, Clone, PartialEq)]
struct Keyed {
	id: u32,
	label: &'static str,
}

impl Hash for Keyed {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

#[test]
fn structural_comparison_sees_fields_outside_the_hash() {
	let a = Property::with_options(
		Keyed { id: 1, label: "a" },
		PropertyOptions::new().comparison(ComparisonStrategy::structural()),
	)
	.unwrap();

	let log = Recorder::new();
	a.lazy_link({
		let log = log.clone();
		move |new: &Keyed, _| log.push(new.label)
	})
	.unwrap();

	a.set(Keyed { id: 1, label: "b" }).unwrap();
	a.set(Keyed { id: 1, label: "b" }).unwrap();

	assert_eq!(a.get().label, "b");
	assert_eq!(log.take(), vec!["b"]);
}

#[test]
fn comparators_may_read_the_property() {
	let slot: Rc<RefCell<Option<WeakProperty<i32>>>> = Default::default();
	let reads = Recorder::new();
	let comparison = ComparisonStrategy::custom({
		let slot = slot.clone();
		let reads = reads.clone();
		move |a: &i32, b: &i32| {
			if let Some(property) = slot.borrow().as_ref().and_then(WeakProperty::upgrade) {
				reads.push(property.get());
			}
			a == b
		}
	});

	let a = Property::with_options(1, PropertyOptions::new().comparison(comparison)).unwrap();
	*slot.borrow_mut() = Some(a.downgrade());

	a.set(1).unwrap();
	a.set(2).unwrap();
	a.defer().unwrap();
	a.set(3).unwrap();
	a.undefer().unwrap().notify().unwrap();

	assert_eq!(reads.take(), vec![1, 1, 2]);
	assert_eq!(a.get(), 3);
}

#[test]
fn range_property_contract_keeps_value_and_range_consistent() {
	let limits = Property::new(Range::new(0.0, 10.0).unwrap());
	let contract = ValidationContract::<i32>::builder()
		.range_property(limits.clone())
		.build()
		.unwrap();
	let level =
		Property::with_options(5, PropertyOptions::new().name("level").contract(contract)).unwrap();
	assert!(level.contract().range_property().unwrap().ptr_eq(&limits));

	assert!(level.set(11).unwrap_err().is_validation());

	let err = limits.set(Range::new(6.0, 10.0).unwrap()).unwrap_err();
	assert!(err.is_validation());
	assert!(err.to_string().contains("level = 5"), "{err}");
	assert_eq!(limits.get(), Range::new(0.0, 10.0).unwrap());

	limits.set(Range::new(0.0, 20.0).unwrap()).unwrap();
	level.set(15).unwrap();

	level.dispose();
	limits.set(Range::new(100.0, 200.0).unwrap()).unwrap();
}

#[test]
fn registry_handles_round_trip_through_any() {
	let a = Property::new(1.5f64);
	let any: std::rc::Rc<dyn std::any::Any> = a.clone().into();
	let back = Property::<f64>::try_from(any).ok().unwrap();
	assert!(back.ptr_eq(&a));
}
