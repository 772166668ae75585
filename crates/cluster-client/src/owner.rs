//! Controller owner references
//!
//! The API server's garbage collector deletes a dependent once its controlling
//! owner is gone. These helpers attach and inspect that link; deletion itself
//! is never done here.

use crate::error::ClusterError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;

/// Makes `owner` the controlling owner of the object described by `child`.
///
/// Fails if the owner has no name or uid yet (it was never persisted), if the
/// two objects live in different namespaces, or if `child` is already
/// controlled by a different object. Other owner references are left alone.
pub fn set_controller_reference<O>(owner: &O, child: &mut ObjectMeta) -> Result<(), ClusterError>
where
    O: Resource<DynamicType = ()>,
{
    let kind = O::kind(&());
    let owner_name = owner.meta().name.as_deref().unwrap_or("<unnamed>");

    let mut owner_ref = owner.controller_owner_ref(&()).ok_or_else(|| {
        ClusterError::Reference(format!("{} {} has no uid or name", kind, owner_name))
    })?;
    // Foreground deletion of the owner waits for the child to be collected
    owner_ref.block_owner_deletion = Some(true);

    if let (Some(owner_ns), Some(child_ns)) = (owner.meta().namespace.as_deref(), child.namespace.as_deref()) {
        if owner_ns != child_ns {
            return Err(ClusterError::Reference(format!(
                "cross-namespace owner reference from {} to {} {}/{}",
                child_ns, kind, owner_ns, owner_name
            )));
        }
    }

    let refs = child.owner_references.get_or_insert_with(Vec::new);
    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner_ref.uid)
    {
        return Err(ClusterError::Reference(format!(
            "{} is already controlled by {} {}",
            child.name.as_deref().unwrap_or("<unnamed>"),
            other.kind,
            other.name
        )));
    }

    match refs.iter().position(|r| r.uid == owner_ref.uid) {
        Some(pos) => refs[pos] = owner_ref,
        None => refs.push(owner_ref),
    }
    Ok(())
}

/// True if `child` carries a controller reference pointing at `owner`.
pub fn is_controlled_by<O: Resource>(owner: &O, child: &ObjectMeta) -> bool {
    let Some(uid) = owner.meta().uid.as_deref() else {
        return false;
    };
    child
        .owner_references
        .as_ref()
        .is_some_and(|refs| refs.iter().any(|r| r.uid == uid && r.controller == Some(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{DashboardConfig, DashboardConfigSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    fn dashboard(uid: Option<&str>) -> DashboardConfig {
        let mut dc = DashboardConfig::new(
            "alpha",
            DashboardConfigSpec {
                title: "Alpha".to_string(),
                payload: "{}".to_string(),
            },
        );
        dc.metadata.namespace = Some("monitoring".to_string());
        dc.metadata.uid = uid.map(str::to_string);
        dc
    }

    fn child_meta(namespace: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some("alpha-dashboard".to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_sets_controller_reference() {
        let owner = dashboard(Some("uid-1"));
        let mut meta = child_meta("monitoring");

        set_controller_reference(&owner, &mut meta).unwrap();

        let refs = meta.owner_references.as_ref().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].uid, "uid-1");
        assert_eq!(refs[0].kind, "DashboardConfig");
        assert_eq!(refs[0].api_version, "grafana.cyberwizzard.com/v1alpha1");
        assert_eq!(refs[0].name, "alpha");
        assert_eq!(refs[0].controller, Some(true));
        assert_eq!(refs[0].block_owner_deletion, Some(true));
        assert!(is_controlled_by(&owner, &meta));
    }

    #[test]
    fn test_setting_twice_does_not_duplicate() {
        let owner = dashboard(Some("uid-1"));
        let mut meta = child_meta("monitoring");

        set_controller_reference(&owner, &mut meta).unwrap();
        set_controller_reference(&owner, &mut meta).unwrap();

        assert_eq!(meta.owner_references.unwrap().len(), 1);
    }

    #[test]
    fn test_owner_without_uid_is_rejected() {
        let owner = dashboard(None);
        let mut meta = child_meta("monitoring");

        let err = set_controller_reference(&owner, &mut meta).unwrap_err();
        assert!(matches!(err, ClusterError::Reference(_)));
        assert!(meta.owner_references.is_none());
    }

    #[test]
    fn test_cross_namespace_is_rejected() {
        let owner = dashboard(Some("uid-1"));
        let mut meta = child_meta("default");

        let err = set_controller_reference(&owner, &mut meta).unwrap_err();
        assert!(matches!(err, ClusterError::Reference(_)));
    }

    #[test]
    fn test_other_controller_is_rejected_but_plain_owners_are_kept() {
        let owner = dashboard(Some("uid-1"));

        let mut meta = child_meta("monitoring");
        meta.owner_references = Some(vec![OwnerReference {
            api_version: "v1".to_string(),
            kind: "Secret".to_string(),
            name: "unrelated".to_string(),
            uid: "uid-9".to_string(),
            ..Default::default()
        }]);
        set_controller_reference(&owner, &mut meta).unwrap();
        assert_eq!(meta.owner_references.as_ref().unwrap().len(), 2);

        let mut taken = child_meta("monitoring");
        taken.owner_references = Some(vec![OwnerReference {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            name: "grafana".to_string(),
            uid: "uid-7".to_string(),
            controller: Some(true),
            ..Default::default()
        }]);
        let err = set_controller_reference(&owner, &mut taken).unwrap_err();
        assert!(matches!(err, ClusterError::Reference(_)));
        assert!(!is_controlled_by(&owner, &taken));
    }
}
