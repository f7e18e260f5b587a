use std::{collections::BTreeMap, fs, path::Path};

use color_eyre::{eyre::eyre, Result};
use credfile_core::{
    item::ItemFields,
    provision::{ProvisionInput, ProvisionOutput, Provisioner},
};
use credfile_provision::{
    field_as_file, fields_as_file, ArgExposure, ContentSelector, FileProvisionerConfig,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{cli::PlanArgs, config::Config, paths};

const REDACTED: &str = "<redacted>";

/// What the host would set up for the process, as printed by `credfile plan`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Plan {
    pub files: Vec<PlannedFile>,
    pub env: BTreeMap<String, String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlannedFile {
    pub path: String,
    pub bytes: usize,
    pub contents: String,
}

impl Plan {
    pub fn from_output(output: &ProvisionOutput, show_contents: bool) -> Self {
        let files = output
            .files
            .iter()
            .map(|(path, file)| PlannedFile {
                path: path.to_string_lossy().into_owned(),
                bytes: file.contents.len(),
                contents: if show_contents {
                    String::from_utf8_lossy(&file.contents).into_owned()
                } else {
                    REDACTED.to_string()
                },
            })
            .collect();
        // Printed as JSON, so non-UTF-8 bytes are shown lossily; the output itself keeps them.
        let env = output
            .environment
            .iter()
            .map(|(name, value)| (name.clone(), value.to_string_lossy().into_owned()))
            .collect();
        let args = output
            .args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        Self { files, env, args }
    }
}

/// Provision the item described by `args` and report what a process would receive.
#[instrument(skip_all, fields(item = %args.item.display()))]
pub async fn run(args: PlanArgs, config: &Config) -> Result<Plan> {
    let item = read_item(&args.item)?;
    let selector = selector_for(&args, config)?;
    let provisioner = config
        .provision
        .clone()
        .merged_with(overrides_from(&args))
        .into_provisioner(selector);

    let temp_dir = paths::resolve_temp_dir(args.temp_dir.clone(), config);
    let input = ProvisionInput::new(item, temp_dir);
    let mut output = ProvisionOutput::new();
    provisioner.provision(&input, &mut output).await;

    if output.has_errors() {
        let reasons: Vec<String> = output.errors.iter().map(ToString::to_string).collect();
        return Err(eyre!("{} failed: {}", provisioner.description(), reasons.join("; ")));
    }

    info!(files = output.files.len(), "item provisioned");
    Ok(Plan::from_output(&output, args.show_contents))
}

/// Read an item from a JSON object of string fields.
pub fn read_item(path: &Path) -> Result<ItemFields> {
    let raw = fs::read_to_string(path)
        .map_err(|e| eyre!("failed to read item {}: {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| eyre!("invalid item {}: {e}", path.display()))
}

fn selector_for(args: &PlanArgs, config: &Config) -> Result<ContentSelector> {
    if !args.fields.is_empty() {
        return Ok(fields_as_file(args.fields.clone(), args.separator.clone()));
    }
    let field = args
        .field
        .clone()
        .or_else(|| config.field.clone())
        .ok_or_else(|| eyre!("no field selected; pass --field/--fields or set `field` in config"))?;
    Ok(field_as_file(field))
}

fn overrides_from(args: &PlanArgs) -> FileProvisionerConfig {
    let expose = args.path_as_arg || !args.arg_prefix.is_empty();
    FileProvisionerConfig {
        fixed_path: args.fixed_path.clone(),
        filename: args.filename.clone(),
        env_var: args.env_var.clone(),
        arg: expose.then(|| ArgExposure {
            prefix: args.arg_prefix.clone(),
        }),
    }
}
