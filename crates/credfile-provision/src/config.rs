use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    file_provisioner::{FileProvisioner, FileProvisionerBuilder},
    selector::ContentSelector,
};

/// Declarative form of the file provisioner options, e.g. a `[provision]` TOML table.
///
/// ```toml
/// filename = "kubeconfig"
/// env_var = "KUBECONFIG"
///
/// [arg]
/// prefix = ["--kubeconfig"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileProvisionerConfig {
    /// Write here instead of the temp dir. Takes precedence over `filename`.
    pub fixed_path: Option<PathBuf>,
    /// Filename inside the temp dir; a random name is used when absent.
    pub filename: Option<String>,
    /// Environment variable that receives the resolved path.
    pub env_var: Option<String>,
    /// Present when the resolved path should be appended to the command line.
    pub arg: Option<ArgExposure>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ArgExposure {
    /// Tokens placed right before the path, e.g. `["--config"]`.
    pub prefix: Vec<String>,
}

impl FileProvisionerConfig {
    /// Field-by-field overlay: every option set in `overrides` replaces the one here.
    pub fn merged_with(self, overrides: FileProvisionerConfig) -> Self {
        Self {
            fixed_path: overrides.fixed_path.or(self.fixed_path),
            filename: overrides.filename.or(self.filename),
            env_var: overrides.env_var.or(self.env_var),
            arg: overrides.arg.or(self.arg),
        }
    }

    pub fn apply(self, mut builder: FileProvisionerBuilder) -> FileProvisionerBuilder {
        if let Some(path) = self.fixed_path {
            builder = builder.at_fixed_path(path);
        }
        if let Some(name) = self.filename {
            builder = builder.filename(name);
        }
        if let Some(name) = self.env_var {
            builder = builder.path_as_env_var(name);
        }
        if let Some(arg) = self.arg {
            builder = builder.path_as_arg(arg.prefix);
        }
        builder
    }

    pub fn into_provisioner(self, contents: ContentSelector) -> FileProvisioner {
        self.apply(FileProvisioner::builder(contents)).build()
    }
}
