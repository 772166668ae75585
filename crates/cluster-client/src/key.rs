//! Namespaced object identity

use kube::ResourceExt;
use std::fmt;

/// Namespace and name of an object; the unit of reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Namespace of the object
    pub namespace: String,
    /// Name of the object within its namespace
    pub name: String,
}

impl ObjectKey {
    /// Key for `name` in `namespace`
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a namespaced resource, or `None` if it lacks a name or namespace.
    pub fn for_resource<K: ResourceExt>(resource: &K) -> Option<Self> {
        let name = resource.meta().name.clone()?;
        let namespace = resource.namespace()?;
        Some(Self { namespace, name })
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_display_is_namespace_slash_name() {
        assert_eq!(ObjectKey::new("monitoring", "alpha").to_string(), "monitoring/alpha");
    }

    #[test]
    fn test_for_resource_requires_namespace() {
        let mut cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some("alpha-dashboard".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(ObjectKey::for_resource(&cm), None);

        cm.metadata.namespace = Some("monitoring".to_string());
        assert_eq!(
            ObjectKey::for_resource(&cm),
            Some(ObjectKey::new("monitoring", "alpha-dashboard"))
        );
    }
}
