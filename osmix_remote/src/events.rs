//! Event bus relaying progress, steps, warnings and log records to subscribers.
//!
//! Events are delivered synchronously on the thread that emits them, so the events of one
//! call arrive in the order the worker produced them.

use arc_swap::ArcSwap;
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::SystemTime,
};

/// A progress message of one coordinator call.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
	pub request_id: u64,
	pub dataset: String,
	pub message: String,
	pub timestamp: SystemTime,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
	Progress(ProgressEvent),
	Step { message: String },
	Warning { message: String },
	Log { level: log::Level, target: String, message: String },
}

/// Identifies a subscription, for [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

type EventListener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Thread-safe, cloneable event bus. Listeners are stored behind an [`ArcSwap`], so emitting
/// never takes a lock.
#[derive(Clone)]
pub struct EventBus {
	listeners: Arc<ArcSwap<Vec<(ListenerId, EventListener)>>>,
	next_id: Arc<AtomicUsize>,
}

impl EventBus {
	#[must_use]
	pub fn new() -> Self {
		Self {
			listeners: Arc::new(ArcSwap::from_pointee(Vec::new())),
			next_id: Arc::new(AtomicUsize::new(0)),
		}
	}

	/// Registers a listener that is called for every event emitted afterwards.
	pub fn subscribe<F>(&self, listener: F) -> ListenerId
	where
		F: Fn(&Event) + Send + Sync + 'static,
	{
		let listener: EventListener = Arc::new(listener);
		let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.listeners.rcu(|old| {
			let mut new = (**old).clone();
			new.push((id, listener.clone()));
			new
		});
		id
	}

	/// Removes a listener. Returns false if `id` was not subscribed.
	pub fn unsubscribe(&self, id: ListenerId) -> bool {
		let previous = self.listeners.rcu(|old| {
			let mut new = (**old).clone();
			new.retain(|(listener_id, _)| *listener_id != id);
			new
		});
		previous.iter().any(|(listener_id, _)| *listener_id == id)
	}

	/// Calls every listener in registration order. A panicking listener does not stop the others.
	pub fn emit(&self, event: Event) {
		let listeners = self.listeners.load();
		for (_, listener) in listeners.iter() {
			let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
				listener(&event);
			}));
		}
	}

	pub fn progress(&self, request_id: u64, dataset: &str, message: String) {
		self.emit(Event::Progress(ProgressEvent {
			request_id,
			dataset: dataset.to_string(),
			message,
			timestamp: SystemTime::now(),
		}));
	}

	pub fn step(&self, message: String) {
		self.emit(Event::Step { message });
	}

	pub fn warn(&self, message: String) {
		self.emit(Event::Warning { message });
	}

	/// A `log` backend forwarding records onto this bus.
	#[must_use]
	pub fn create_log_adapter(&self) -> LogAdapter {
		LogAdapter {
			event_bus: self.clone(),
		}
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new()
	}
}

/// Forwards `log` records to an [`EventBus`] as [`Event::Log`].
pub struct LogAdapter {
	event_bus: EventBus,
}

impl log::Log for LogAdapter {
	fn enabled(&self, _metadata: &log::Metadata) -> bool {
		true
	}

	fn log(&self, record: &log::Record) {
		self.event_bus.emit(Event::Log {
			level: record.level(),
			target: record.target().to_string(),
			message: format!("{}", record.args()),
		});
	}

	fn flush(&self) {}
}

#[cfg(test)]
mod tests {
	use super::*;
	use log::Log;
	use parking_lot::Mutex;

	fn recorder(bus: &EventBus) -> Arc<Mutex<Vec<Event>>> {
		let events = Arc::new(Mutex::new(Vec::new()));
		let sink = events.clone();
		bus.subscribe(move |event| sink.lock().push(event.clone()));
		events
	}

	#[test]
	fn listeners_see_events_in_order() {
		let bus = EventBus::new();
		let events = recorder(&bus);
		bus.step("start".into());
		bus.progress(7, "monaco", "block 0".into());
		bus.warn("3 incomplete entities".into());

		let events = events.lock();
		assert_eq!(events.len(), 3);
		assert_eq!(events[0], Event::Step { message: "start".into() });
		let Event::Progress(progress) = &events[1] else {
			panic!("expected progress, got {:?}", events[1]);
		};
		assert_eq!((progress.request_id, progress.dataset.as_str()), (7, "monaco"));
		assert!(matches!(events[2], Event::Warning { .. }));
	}

	#[test]
	fn panicking_listener_does_not_stop_others() {
		let bus = EventBus::new();
		bus.subscribe(|_| panic!("listener failure"));
		let events = recorder(&bus);
		bus.step("still delivered".into());
		assert_eq!(events.lock().len(), 1);
	}

	#[test]
	fn unsubscribed_listeners_stop_receiving() {
		let bus = EventBus::new();
		let first = Arc::new(Mutex::new(0));
		let counter = first.clone();
		let id = bus.subscribe(move |_| *counter.lock() += 1);
		let second = recorder(&bus);

		bus.step("both".into());
		assert!(bus.clone().unsubscribe(id));
		assert!(!bus.unsubscribe(id));
		bus.step("second only".into());

		assert_eq!(*first.lock(), 1);
		assert_eq!(second.lock().len(), 2);
	}

	#[test]
	fn listener_ids_are_not_reused() {
		let bus = EventBus::new();
		let a = bus.subscribe(|_| {});
		assert!(bus.unsubscribe(a));
		let b = bus.subscribe(|_| {});
		assert_ne!(a, b);
	}

	#[test]
	fn clones_share_listeners() {
		let bus = EventBus::default();
		let events = recorder(&bus);
		bus.clone().step("from a clone".into());
		assert_eq!(events.lock().len(), 1);
	}

	#[test]
	fn log_adapter() {
		let bus = EventBus::new();
		let events = recorder(&bus);
		let adapter = bus.create_log_adapter();
		adapter.log(
			&log::Record::builder()
				.level(log::Level::Warn)
				.target("osmix")
				.args(format_args!("dangling way"))
				.build(),
		);
		assert_eq!(
			events.lock()[0],
			Event::Log {
				level: log::Level::Warn,
				target: "osmix".into(),
				message: "dangling way".into()
			}
		);
	}
}
