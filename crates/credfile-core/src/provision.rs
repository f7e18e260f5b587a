use std::{
    collections::BTreeMap,
    ffi::OsString,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use thiserror::Error;

use crate::item::ItemFields;

/// Errors a provisioner can record on its output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProvisionError {
    /// The item has no value for a field the provisioner requires.
    #[error("no value present in the item for field '{field}'")]
    MissingField { field: String },
    /// A content selector could not render the file contents.
    #[error("could not derive file contents: {reason}")]
    Content { reason: String },
}

/// Read-only view handed to `Provisioner::provision`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionInput {
    /// Field values of the item being provisioned.
    pub item_fields: ItemFields,
    /// Host-managed temp dir, cleaned up after the process exits.
    pub temp_dir: PathBuf,
}

impl ProvisionInput {
    pub fn new(item_fields: ItemFields, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            item_fields,
            temp_dir: temp_dir.into(),
        }
    }

    /// Path for `name` inside the managed temp dir.
    ///
    /// Root, prefix, `.` and `..` components of `name` are dropped, so the result
    /// never leaves the temp dir (`/etc/cred` becomes `<temp_dir>/etc/cred`).
    pub fn from_temp_dir(&self, name: impl AsRef<Path>) -> PathBuf {
        let mut path = self.temp_dir.clone();
        path.extend(name.as_ref().components().filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        }));
        path
    }
}

/// A file the host must write before the process starts and remove afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputFile {
    pub contents: Vec<u8>,
}

/// Everything a provisioner asks the host to set up for the process.
///
/// Env values and args are `OsString`s so a path lands in them byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionOutput {
    pub environment: BTreeMap<String, OsString>,
    pub args: Vec<OsString>,
    pub files: BTreeMap<PathBuf, OutputFile>,
    pub errors: Vec<ProvisionError>,
}

impl ProvisionOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, err: ProvisionError) {
        self.errors.push(err);
    }

    /// Register a file; a second registration at the same path replaces the first.
    pub fn add_secret_file(&mut self, path: impl Into<PathBuf>, contents: Vec<u8>) {
        self.files.insert(path.into(), OutputFile { contents });
    }

    pub fn add_env_var(&mut self, name: impl Into<String>, value: impl Into<OsString>) {
        self.environment.insert(name.into(), value.into());
    }

    /// Append tokens, in order, to the process argument list.
    pub fn add_args<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(tokens.into_iter().map(Into::into));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Read-only view handed to `Provisioner::deprovision`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeprovisionInput {
    pub item_fields: ItemFields,
    pub temp_dir: PathBuf,
}

impl From<&ProvisionInput> for DeprovisionInput {
    fn from(input: &ProvisionInput) -> Self {
        Self {
            item_fields: input.item_fields.clone(),
            temp_dir: input.temp_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeprovisionOutput {
    pub errors: Vec<ProvisionError>,
}

impl DeprovisionOutput {
    pub fn add_error(&mut self, err: ProvisionError) {
        self.errors.push(err);
    }
}

/// Contract between a host that launches processes and something that makes
/// an item's secrets available to them (files, env vars, args).
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Short human-readable label used for logging and UI.
    fn description(&self) -> &'static str;

    /// Register whatever the process needs on `output`. Failures go to `output.errors`.
    async fn provision(&self, input: &ProvisionInput, output: &mut ProvisionOutput);

    /// Undo anything `provision` set up that the host does not clean up itself.
    async fn deprovision(&self, input: &DeprovisionInput, output: &mut DeprovisionOutput);
}
