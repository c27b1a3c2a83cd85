//! Create an environment file from cloud instance metadata.
//!
//! This crate retrieves instance metadata from an EC2-style or
//! OpenStack-style source (the link-local metadata service or a local
//! config drive) and flattens it into `KEY=VALUE` lines suitable for
//! sourcing into a shell environment.
//!
//! # Example
//!
//! ```ignore
//! use openstack_environment::{MetadataFormat, MetadataSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), openstack_environment::MetadataError> {
//!     // Fetch from the metadata service
//!     let source = MetadataSource::new(MetadataFormat::Ec2);
//!
//!     // Or read from a mounted config drive
//!     let source = source.with_config_drive("/media/configdrive");
//!
//!     let metadata = source.fetch().await?;
//!     print!("{}", metadata.flatten());
//!     Ok(())
//! }
//! ```
//!
//! # Format-Specific Behavior
//!
//! | Format | Network retrieval | Config-drive document |
//! |--------|-------------------|-----------------------|
//! | EC2 | field-by-field walk of `ec2/2009-04-04/meta-data`, with sub-key discovery | `ec2/2009-04-04/meta-data.json` |
//! | OpenStack | single document fetch | `openstack/2012-08-10/meta_data.json` |
//!
//! Retrieval is all-or-nothing: the first failed request or decode aborts
//! the run with no partial record.

mod client;
mod error;
mod format;
mod metadata;
mod providers;

pub use client::MetadataClient;
pub use error::MetadataError;
pub use format::MetadataFormat;
pub use metadata::{Metadata, MetadataSource};
pub use providers::ec2::{Ec2Metadata, Ec2PublicKey};
pub use providers::openstack::{OpenStackFile, OpenStackMetadata};
