use std::collections::BTreeMap;

use crate::provision::ProvisionError;

/// Field values of a single secret item, keyed by exact field name (e.g. `password`, `token`).
pub type ItemFields = BTreeMap<String, String>;

/// Look up a field that must be present on the item.
pub fn require_field<'a>(fields: &'a ItemFields, name: &str) -> Result<&'a str, ProvisionError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| ProvisionError::MissingField {
            field: name.to_string(),
        })
}
