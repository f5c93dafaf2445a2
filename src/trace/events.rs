//! Span events and their bounded container.

use crate::common::KeyValue;
use std::borrow::Cow;
use std::collections::VecDeque;
use std::time::SystemTime;

/// A timestamped annotation on a span.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Event {
    /// The event name.
    pub name: Cow<'static, str>,
    /// The time the event occurred.
    pub timestamp: SystemTime,
    /// The event attributes, already bounded and truncated.
    pub attributes: Vec<KeyValue>,
    /// The number of attributes dropped from this event by bounding.
    pub dropped_attributes_count: u32,
}

impl Event {
    /// Create a new event.
    pub fn new<T: Into<Cow<'static, str>>>(
        name: T,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
        dropped_attributes_count: u32,
    ) -> Self {
        Event {
            name: name.into(),
            timestamp,
            attributes,
            dropped_attributes_count,
        }
    }

    /// Create a new event with a name, the current time and no attributes.
    pub fn with_name<T: Into<Cow<'static, str>>>(name: T) -> Self {
        Event {
            name: name.into(),
            timestamp: SystemTime::now(),
            attributes: Vec::new(),
            dropped_attributes_count: 0,
        }
    }
}

/// A bounded, ordered list of span events.
///
/// When full, adding a new event evicts the oldest, so the list always holds
/// the most recent events. A lifetime counter records every add; the dropped
/// count is derived from it.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanEvents {
    events: VecDeque<Event>,
    capacity: u32,
    total_recorded: u32,
}

impl SpanEvents {
    /// Create an event list holding at most `capacity` events.
    pub(crate) fn with_capacity(capacity: u32) -> Self {
        SpanEvents {
            events: VecDeque::new(),
            capacity,
            total_recorded: 0,
        }
    }

    /// Add an event, evicting the oldest if at capacity.
    pub(crate) fn add(&mut self, event: Event) {
        if self.capacity > 0 {
            if self.events.len() as u32 == self.capacity {
                self.events.pop_front();
            }
            self.events.push_back(event);
        }
        self.total_recorded += 1;
    }

    /// The number of events currently retained.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no events are retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The number of events recorded over the span's lifetime, including
    /// evicted ones.
    pub fn total_recorded(&self) -> u32 {
        self.total_recorded
    }

    /// The number of events no longer retained.
    pub fn dropped_count(&self) -> u32 {
        self.total_recorded.saturating_sub(self.events.len() as u32)
    }

    /// An oldest-to-newest iterator over the retained events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }
}

impl<'a> IntoIterator for &'a SpanEvents {
    type Item = &'a Event;
    type IntoIter = std::collections::vec_deque::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl IntoIterator for SpanEvents {
    type Item = Event;
    type IntoIter = std::collections::vec_deque::IntoIter<Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_the_most_recent_events() {
        let mut events = SpanEvents::with_capacity(2);
        events.add(Event::with_name("a"));
        events.add(Event::with_name("b"));
        events.add(Event::with_name("c"));

        let names: Vec<&str> = events.iter().map(|e| e.name.as_ref()).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(events.total_recorded(), 3);
        assert_eq!(events.dropped_count(), 1);
    }

    #[test]
    fn zero_capacity_retains_nothing() {
        let mut events = SpanEvents::with_capacity(0);
        events.add(Event::with_name("a"));
        assert!(events.is_empty());
        assert_eq!(events.total_recorded(), 1);
    }
}
