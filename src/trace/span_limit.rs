//! Per-span collection limits.

pub(crate) const DEFAULT_MAX_EVENT_PER_SPAN: u32 = 128;
pub(crate) const DEFAULT_MAX_ATTRIBUTES_PER_SPAN: u32 = 128;
pub(crate) const DEFAULT_MAX_LINKS_PER_SPAN: u32 = 128;
pub(crate) const DEFAULT_MAX_ATTRIBUTES_PER_EVENT: u32 = 128;
pub(crate) const DEFAULT_MAX_ATTRIBUTES_PER_LINK: u32 = 128;
// By default values are stored whole; a limit only applies when configured.
pub(crate) const DEFAULT_MAX_ATTRIBUTE_VALUE_LENGTH: u32 = u32::MAX;

/// Bounds on the memory a single span may hold.
///
/// Supplied once at provider construction; every span created by the
/// provider reads the limits active at its creation for its whole lifetime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpanLimits {
    /// The max events that can be added to a `Span`.
    pub max_events_per_span: u32,
    /// The max attributes that can be added to a `Span`.
    pub max_attributes_per_span: u32,
    /// The max links that can be added to a `Span`.
    pub max_links_per_span: u32,
    /// The max attributes that can be added to an `Event`.
    pub max_attributes_per_event: u32,
    /// The max attributes that can be added to a `Link`.
    pub max_attributes_per_link: u32,
    /// The max length, in bytes, of a string or string-array-element
    /// attribute value; longer values are truncated.
    pub max_attribute_value_length: u32,
}

impl Default for SpanLimits {
    fn default() -> Self {
        SpanLimits {
            max_events_per_span: DEFAULT_MAX_EVENT_PER_SPAN,
            max_attributes_per_span: DEFAULT_MAX_ATTRIBUTES_PER_SPAN,
            max_links_per_span: DEFAULT_MAX_LINKS_PER_SPAN,
            max_attributes_per_event: DEFAULT_MAX_ATTRIBUTES_PER_EVENT,
            max_attributes_per_link: DEFAULT_MAX_ATTRIBUTES_PER_LINK,
            max_attribute_value_length: DEFAULT_MAX_ATTRIBUTE_VALUE_LENGTH,
        }
    }
}
