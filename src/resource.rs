//! Immutable descriptions of the entity producing telemetry.
//!
//! A [`Resource`] is attached to every exporter at registration time and
//! travels with exported spans as opaque metadata; the tracing core never
//! inspects it beyond passing it through.

use crate::common::{Key, KeyValue, Value};
use std::borrow::Cow;

/// An immutable set of attributes describing the entity producing telemetry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resource {
    attributes: Vec<KeyValue>,
    schema_url: Option<Cow<'static, str>>,
}

impl Resource {
    /// A resource with no attributes.
    pub fn empty() -> Self {
        Resource::default()
    }

    /// Create a resource from the given attributes.
    ///
    /// Later values win when the same key appears more than once.
    pub fn new<T: IntoIterator<Item = KeyValue>>(attributes: T) -> Self {
        let mut deduped: Vec<KeyValue> = Vec::new();
        for kv in attributes {
            if let Some(existing) = deduped.iter_mut().find(|e| e.key == kv.key) {
                existing.value = kv.value;
            } else {
                deduped.push(kv);
            }
        }
        Resource {
            attributes: deduped,
            schema_url: None,
        }
    }

    /// Create a new builder for a [`Resource`].
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder::default()
    }

    /// Retrieve the value for the given key, if present.
    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|kv| &kv.key == key)
            .map(|kv| &kv.value)
    }

    /// Iterate over the resource attributes.
    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.attributes.iter()
    }

    /// The number of attributes in this resource.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns `true` if the resource has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// The schema url of this resource, if configured.
    pub fn schema_url(&self) -> Option<&str> {
        self.schema_url.as_deref()
    }
}

/// Builder for [`Resource`].
#[derive(Debug, Default)]
pub struct ResourceBuilder {
    attributes: Vec<KeyValue>,
    schema_url: Option<Cow<'static, str>>,
}

impl ResourceBuilder {
    /// Add a single attribute.
    pub fn with_attribute(mut self, kv: KeyValue) -> Self {
        self.attributes.push(kv);
        self
    }

    /// Add multiple attributes.
    pub fn with_attributes<T: IntoIterator<Item = KeyValue>>(mut self, attributes: T) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Set the conventional `service.name` attribute.
    pub fn with_service_name(self, name: impl Into<Value>) -> Self {
        self.with_attribute(KeyValue::new("service.name", name.into()))
    }

    /// Set the schema url.
    pub fn with_schema_url(mut self, schema_url: impl Into<Cow<'static, str>>) -> Self {
        self.schema_url = Some(schema_url.into());
        self
    }

    /// Build the [`Resource`].
    pub fn build(self) -> Resource {
        let mut resource = Resource::new(self.attributes);
        resource.schema_url = self.schema_url;
        resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_attributes_win() {
        let resource = Resource::new(vec![
            KeyValue::new("service.name", "a"),
            KeyValue::new("service.name", "b"),
        ]);
        assert_eq!(resource.len(), 1);
        assert_eq!(
            resource.get(&Key::new("service.name")),
            Some(&Value::from("b"))
        );
    }

    #[test]
    fn builder_sets_service_name() {
        let resource = Resource::builder()
            .with_service_name("checkout")
            .with_attribute(KeyValue::new("host.name", "web-1"))
            .build();
        assert_eq!(resource.len(), 2);
        assert_eq!(
            resource.get(&Key::new("service.name")),
            Some(&Value::from("checkout"))
        );
    }
}
