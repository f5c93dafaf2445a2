//! Span links and their bounded container.

use crate::common::KeyValue;
use crate::trace::SpanContext;
use std::collections::VecDeque;

/// A causal reference from one span to another, possibly in another trace.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Link {
    /// The context of the linked span.
    pub span_context: SpanContext,
    /// The link attributes, already bounded and truncated.
    pub attributes: Vec<KeyValue>,
    /// The number of attributes dropped from this link by bounding.
    pub dropped_attributes_count: u32,
}

impl Link {
    /// Create a new link.
    pub fn new(
        span_context: SpanContext,
        attributes: Vec<KeyValue>,
        dropped_attributes_count: u32,
    ) -> Self {
        Link {
            span_context,
            attributes,
            dropped_attributes_count,
        }
    }

    /// Create a new link to the given context with no attributes.
    pub fn with_context(span_context: SpanContext) -> Self {
        Link {
            span_context,
            attributes: Vec::new(),
            dropped_attributes_count: 0,
        }
    }

    /// The total number of attributes recorded on this link, including
    /// dropped ones.
    pub fn total_attribute_count(&self) -> u32 {
        self.attributes.len() as u32 + self.dropped_attributes_count
    }
}

/// A bounded, ordered list of span links.
///
/// Same eviction policy as [`SpanEvents`]: oldest out first, so the list
/// always holds the most recent links, with a derived dropped count.
///
/// [`SpanEvents`]: crate::trace::SpanEvents
#[derive(Clone, Debug, PartialEq)]
pub struct SpanLinks {
    links: VecDeque<Link>,
    capacity: u32,
    total_recorded: u32,
}

impl SpanLinks {
    /// Create a link list holding at most `capacity` links.
    pub(crate) fn with_capacity(capacity: u32) -> Self {
        SpanLinks {
            links: VecDeque::new(),
            capacity,
            total_recorded: 0,
        }
    }

    /// Add a link, evicting the oldest if at capacity.
    pub(crate) fn add(&mut self, link: Link) {
        if self.capacity > 0 {
            if self.links.len() as u32 == self.capacity {
                self.links.pop_front();
            }
            self.links.push_back(link);
        }
        self.total_recorded += 1;
    }

    /// The number of links currently retained.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if no links are retained.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// The number of links recorded over the span's lifetime, including
    /// evicted ones.
    pub fn total_recorded(&self) -> u32 {
        self.total_recorded
    }

    /// The number of links no longer retained.
    pub fn dropped_count(&self) -> u32 {
        self.total_recorded.saturating_sub(self.links.len() as u32)
    }

    /// An oldest-to-newest iterator over the retained links.
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }
}

impl<'a> IntoIterator for &'a SpanLinks {
    type Item = &'a Link;
    type IntoIter = std::collections::vec_deque::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

impl IntoIterator for SpanLinks {
    type Item = Link;
    type IntoIter = std::collections::vec_deque::IntoIter<Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{SpanId, TraceFlags, TraceId, TraceState};

    fn link(n: u64) -> Link {
        Link::with_context(SpanContext::new(
            TraceId::from(n as u128),
            SpanId::from(n),
            TraceFlags::default(),
            false,
            TraceState::default(),
        ))
    }

    #[test]
    fn holds_the_most_recent_links() {
        let mut links = SpanLinks::with_capacity(2);
        for n in 1..=4 {
            links.add(link(n));
        }
        let ids: Vec<TraceId> = links.iter().map(|l| l.span_context.trace_id()).collect();
        assert_eq!(ids, vec![TraceId::from(3u128), TraceId::from(4u128)]);
        assert_eq!(links.total_recorded(), 4);
        assert_eq!(links.dropped_count(), 2);
    }

    #[test]
    fn total_attribute_count_includes_dropped() {
        let l = Link::new(
            SpanContext::empty_context(),
            vec![KeyValue::new("k", "v")],
            3,
        );
        assert_eq!(l.total_attribute_count(), 4);
    }
}
