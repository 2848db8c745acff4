use std::collections::BTreeMap;

use crate::CONTROLLER_NAME;

/// Create labels that can be used as a unique selector for a given app name.
pub fn selector_labels(app: &str) -> Option<BTreeMap<String, String>> {
    Some(BTreeMap::from_iter(vec![(
        "app".to_owned(),
        app.to_owned(),
    )]))
}

/// Manage by label
pub const MANAGED_BY_LABEL_SELECTOR: &str = "managed-by=vegeta-operator";

/// Labels that indicate the resource is managed by the vegeta operator.
pub fn managed_labels() -> Option<BTreeMap<String, String>> {
    Some(BTreeMap::from_iter(vec![(
        "managed-by".to_owned(),
        CONTROLLER_NAME.to_owned(),
    )]))
}

/// Managed labels extended with extra labels.
pub fn managed_labels_extend(
    labels: Option<BTreeMap<String, String>>,
) -> Option<BTreeMap<String, String>> {
    let mut managed = managed_labels().unwrap_or_default();
    managed.extend(labels.unwrap_or_default());
    Some(managed)
}
