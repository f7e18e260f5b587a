use std::{ffi::OsString, fmt, iter, path::PathBuf};

use async_trait::async_trait;
use credfile_core::provision::{
    DeprovisionInput, DeprovisionOutput, ProvisionInput, ProvisionOutput, Provisioner,
};
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, instrument, warn};

use crate::selector::ContentSelector;

/// Length of autogenerated filenames, in lowercase hex characters.
const RANDOM_NAME_LEN: usize = 16;

/// Where the file lands and how its path reaches the process. Built once, read-only after.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FileOptions {
    fixed_path: Option<PathBuf>,
    filename: Option<String>,
    env_var: Option<String>,
    /// `Some(prefix)` when the path is exposed as an arg, preceded by `prefix`.
    path_as_arg: Option<Vec<String>>,
}

/// Provisions an item's secret as a single file.
///
/// The path is, in order of precedence: the fixed path, the configured filename inside
/// the managed temp dir, or a random hex name inside the managed temp dir.
#[derive(Clone)]
pub struct FileProvisioner {
    contents: ContentSelector,
    options: FileOptions,
}

impl fmt::Debug for FileProvisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileProvisioner")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl FileProvisioner {
    /// Provisioner with a random filename in the temp dir and no env var or arg exposure.
    pub fn new(contents: ContentSelector) -> Self {
        Self::builder(contents).build()
    }

    pub fn builder(contents: ContentSelector) -> FileProvisionerBuilder {
        FileProvisionerBuilder {
            contents,
            options: FileOptions::default(),
        }
    }

    fn output_path(&self, input: &ProvisionInput) -> PathBuf {
        if let Some(fixed) = &self.options.fixed_path {
            return fixed.clone();
        }
        match &self.options.filename {
            Some(name) => input.from_temp_dir(name),
            None => input.from_temp_dir(random_filename()),
        }
    }
}

/// Collects options for a `FileProvisioner`. Setting an option twice keeps the last value.
pub struct FileProvisionerBuilder {
    contents: ContentSelector,
    options: FileOptions,
}

impl FileProvisionerBuilder {
    /// Write to this exact path instead of the temp dir, for executables that only
    /// read credentials from one location. Collisions and permissions are the host's concern.
    pub fn at_fixed_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.options.fixed_path = (!path.as_os_str().is_empty()).then_some(path);
        self
    }

    /// Name the file inside the temp dir. Ignored when a fixed path is set.
    pub fn filename(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.options.filename = (!name.is_empty()).then_some(name);
        self
    }

    /// Bind the resolved path to this environment variable.
    pub fn path_as_env_var(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.options.env_var = (!name.is_empty()).then_some(name);
        self
    }

    /// Append the resolved path to the command line, preceded by `prefix`
    /// (e.g. `["--config-file"]` yields `--config-file /path/to/file`).
    pub fn path_as_arg<I, S>(mut self, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.path_as_arg = Some(prefix.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> FileProvisioner {
        if let (Some(fixed), Some(name)) = (&self.options.fixed_path, &self.options.filename) {
            debug!(fixed_path = %fixed.display(), filename = %name, "fixed path set, filename ignored");
        }
        FileProvisioner {
            contents: self.contents,
            options: self.options,
        }
    }
}

#[async_trait]
impl Provisioner for FileProvisioner {
    fn description(&self) -> &'static str {
        "Provision secret file"
    }

    #[instrument(skip_all, fields(temp_dir = %input.temp_dir.display()))]
    async fn provision(&self, input: &ProvisionInput, output: &mut ProvisionOutput) {
        let contents = match (self.contents)(&input.item_fields) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(error = %err, "could not derive file contents");
                output.add_error(err);
                return;
            }
        };

        let path = self.output_path(input);
        debug!(path = %path.display(), bytes = contents.len(), "registering secret file");
        output.add_secret_file(path.clone(), contents);

        if let Some(name) = &self.options.env_var {
            output.add_env_var(name.clone(), path.as_os_str());
        }

        if let Some(prefix) = &self.options.path_as_arg {
            let prefix = prefix.iter().map(OsString::from);
            output.add_args(prefix.chain(iter::once(path.into_os_string())));
        }
    }

    async fn deprovision(&self, _input: &DeprovisionInput, _output: &mut DeprovisionOutput) {
        // The host removes everything in its temp dir once the process exits.
    }
}

fn random_filename() -> String {
    let mut bytes = [0u8; RANDOM_NAME_LEN / 2];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use credfile_core::{item::ItemFields, provision::ProvisionError};

    use super::*;
    use crate::selector::{field_as_file, from_fn};

    const TEMP_DIR: &str = "/run/credfile/session";

    fn input(pairs: &[(&str, &str)]) -> ProvisionInput {
        let fields: ItemFields = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProvisionInput::new(fields, TEMP_DIR)
    }

    async fn run(provisioner: &FileProvisioner, input: &ProvisionInput) -> ProvisionOutput {
        let mut out = ProvisionOutput::new();
        provisioner.provision(input, &mut out).await;
        out
    }

    fn only_path(out: &ProvisionOutput) -> &Path {
        assert_eq!(out.files.len(), 1, "expected exactly one file");
        out.files.keys().next().expect("one file")
    }

    fn is_random_name(name: &str) -> bool {
        name.len() == RANDOM_NAME_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    #[tokio::test]
    async fn filename_and_env_var_scenario() {
        let provisioner = FileProvisioner::builder(field_as_file("password"))
            .filename("cred.txt")
            .path_as_env_var("CRED_PATH")
            .build();

        let out = run(&provisioner, &input(&[("password", "hunter2")])).await;

        let expected = Path::new(TEMP_DIR).join("cred.txt");
        assert!(out.errors.is_empty());
        assert_eq!(only_path(&out), expected);
        assert_eq!(out.files[&expected].contents, b"hunter2");
        assert_eq!(Path::new(&out.environment["CRED_PATH"]), expected);
        assert_eq!(out.environment.len(), 1);
        assert!(out.args.is_empty());
    }

    #[tokio::test]
    async fn missing_field_registers_only_an_error() {
        let provisioner = FileProvisioner::builder(field_as_file("password"))
            .filename("cred.txt")
            .path_as_env_var("CRED_PATH")
            .path_as_arg(["--config"])
            .build();

        let out = run(&provisioner, &input(&[])).await;

        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].to_string().contains("password"));
        assert!(out.files.is_empty());
        assert!(out.environment.is_empty());
        assert!(out.args.is_empty());
    }

    #[tokio::test]
    async fn selector_failure_is_recorded_verbatim() {
        let provisioner = FileProvisioner::new(from_fn(|_| {
            Err(ProvisionError::Content {
                reason: "bad pem".into(),
            })
        }));
        let out = run(&provisioner, &input(&[("password", "x")])).await;
        assert_eq!(
            out.errors,
            vec![ProvisionError::Content {
                reason: "bad pem".into()
            }]
        );
        assert!(out.files.is_empty());
    }

    #[tokio::test]
    async fn fixed_path_wins_over_filename() {
        let provisioner = FileProvisioner::builder(field_as_file("password"))
            .filename("cred.txt")
            .at_fixed_path("/etc/tool/credentials")
            .build();

        let out = run(&provisioner, &input(&[("password", "hunter2")])).await;
        assert_eq!(only_path(&out), Path::new("/etc/tool/credentials"));
    }

    #[tokio::test]
    async fn absolute_filename_is_kept_inside_temp_dir() {
        let provisioner = FileProvisioner::builder(field_as_file("password"))
            .filename("/etc/cred.txt")
            .path_as_env_var("CRED_PATH")
            .build();

        let out = run(&provisioner, &input(&[("password", "hunter2")])).await;
        let path = only_path(&out);
        assert!(path.starts_with(TEMP_DIR), "escaped temp dir: {}", path.display());
        assert_eq!(path, Path::new(TEMP_DIR).join("etc/cred.txt"));
        assert_eq!(Path::new(&out.environment["CRED_PATH"]), path);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_utf8_fixed_path_reaches_env_and_args_unchanged() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let fixed = Path::new(OsStr::from_bytes(b"/tmp/cred-\xff"));
        let provisioner = FileProvisioner::builder(field_as_file("password"))
            .at_fixed_path(fixed)
            .path_as_env_var("E")
            .path_as_arg(["--config"])
            .build();

        let out = run(&provisioner, &input(&[("password", "hunter2")])).await;
        assert_eq!(only_path(&out), fixed);
        assert_eq!(out.environment["E"].as_os_str(), fixed.as_os_str());
        assert_eq!(out.args[1].as_os_str(), fixed.as_os_str());
    }

    #[tokio::test]
    async fn random_name_is_sixteen_lowercase_hex_in_temp_dir() {
        let provisioner = FileProvisioner::new(field_as_file("password"));
        let out = run(&provisioner, &input(&[("password", "hunter2")])).await;

        let path = only_path(&out);
        assert_eq!(path.parent(), Some(Path::new(TEMP_DIR)));
        let name = path.file_name().and_then(|n| n.to_str()).expect("utf-8 name");
        assert!(is_random_name(name), "unexpected name {name}");
    }

    #[tokio::test]
    async fn random_names_differ_between_calls() {
        let provisioner = FileProvisioner::new(field_as_file("password"));
        let item = input(&[("password", "hunter2")]);

        let first = run(&provisioner, &item).await;
        let second = run(&provisioner, &item).await;
        assert_ne!(only_path(&first), only_path(&second));
    }

    #[tokio::test]
    async fn arg_exposure_appends_prefix_then_path() {
        let provisioner = FileProvisioner::builder(field_as_file("password"))
            .filename("cred.txt")
            .path_as_arg(["--config"])
            .build();

        let out = run(&provisioner, &input(&[("password", "hunter2")])).await;
        let path = Path::new(TEMP_DIR).join("cred.txt");
        assert_eq!(
            out.args,
            vec![OsString::from("--config"), path.into_os_string()]
        );
        assert!(out.environment.is_empty());
    }

    #[tokio::test]
    async fn arg_exposure_without_prefix_appends_only_path() {
        let provisioner = FileProvisioner::builder(field_as_file("password"))
            .at_fixed_path("/tmp/fixed")
            .path_as_arg(Vec::<String>::new())
            .build();

        let out = run(&provisioner, &input(&[("password", "hunter2")])).await;
        assert_eq!(out.args, vec!["/tmp/fixed"]);
    }

    #[tokio::test]
    async fn fixed_path_results_are_identical_across_calls() {
        let provisioner = FileProvisioner::builder(field_as_file("password"))
            .at_fixed_path("/tmp/fixed")
            .path_as_env_var("E")
            .build();
        let item = input(&[("password", "hunter2")]);

        let first = run(&provisioner, &item).await;
        let second = run(&provisioner, &item).await;
        assert_eq!(first, second);
        assert_eq!(first.environment["E"], "/tmp/fixed");
    }

    #[test]
    fn last_option_of_a_kind_wins() {
        let provisioner = FileProvisioner::builder(field_as_file("password"))
            .filename("a.txt")
            .filename("b.txt")
            .path_as_env_var("FIRST")
            .path_as_env_var("SECOND")
            .path_as_arg(["--one"])
            .path_as_arg(["--two", "-f"])
            .build();

        assert_eq!(provisioner.options.filename.as_deref(), Some("b.txt"));
        assert_eq!(provisioner.options.env_var.as_deref(), Some("SECOND"));
        assert_eq!(
            provisioner.options.path_as_arg,
            Some(vec!["--two".to_string(), "-f".to_string()])
        );
    }

    #[test]
    fn empty_values_leave_options_unset() {
        let provisioner = FileProvisioner::builder(field_as_file("password"))
            .at_fixed_path("")
            .filename("")
            .path_as_env_var("")
            .build();
        assert_eq!(provisioner.options, FileOptions::default());
    }

    #[tokio::test]
    async fn deprovision_is_a_no_op() {
        let provisioner = FileProvisioner::new(field_as_file("password"));
        let mut out = DeprovisionOutput::default();
        provisioner
            .deprovision(&DeprovisionInput::from(&input(&[])), &mut out)
            .await;
        assert!(out.errors.is_empty());
        assert_eq!(provisioner.description(), "Provision secret file");
    }

    #[test]
    fn random_filenames_are_well_formed() {
        for _ in 0..64 {
            assert!(is_random_name(&random_filename()));
        }
    }
}
