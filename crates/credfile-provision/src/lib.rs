//! Provisions an item's secret as a temp file and points the process at it
//! through an env var and/or command-line args.

pub mod config;
pub mod file_provisioner;
pub mod selector;

pub use config::{ArgExposure, FileProvisionerConfig};
pub use file_provisioner::{FileProvisioner, FileProvisionerBuilder};
pub use selector::{field_as_file, fields_as_file, from_fn, ContentSelector};
