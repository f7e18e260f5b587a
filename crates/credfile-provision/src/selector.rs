use std::sync::Arc;

use credfile_core::{
    item::{require_field, ItemFields},
    provision::ProvisionError,
};

/// Maps an item's fields to the raw bytes of the provisioned file.
pub type ContentSelector =
    Arc<dyn Fn(&ItemFields) -> Result<Vec<u8>, ProvisionError> + Send + Sync>;

/// Wrap any closure as a selector, e.g. one that renders an INI or JSON credentials file.
pub fn from_fn<F>(f: F) -> ContentSelector
where
    F: Fn(&ItemFields) -> Result<Vec<u8>, ProvisionError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Store the value of a single field as the file contents.
pub fn field_as_file(field: impl Into<String>) -> ContentSelector {
    let field: String = field.into();
    from_fn(move |fields| Ok(require_field(fields, &field)?.as_bytes().to_vec()))
}

/// Store several fields in one file, in the given order, joined by `separator`.
/// Fails on the first field the item lacks.
pub fn fields_as_file<I, S>(names: I, separator: impl Into<String>) -> ContentSelector
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    let separator: String = separator.into();
    from_fn(move |fields| {
        let values = names
            .iter()
            .map(|name| require_field(fields, name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values.join(separator.as_str()).into_bytes())
    })
}
