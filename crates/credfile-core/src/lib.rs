//! Host contract for credential provisioners: item fields, the provision/deprovision
//! accumulators handed to each call, and the `Provisioner` trait itself.
//! Kept free of I/O; the host that owns the temp dir materializes whatever gets registered.

pub mod item;
pub mod provision;
