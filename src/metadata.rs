//! Metadata sum type and retrieval dispatcher.

use std::path::PathBuf;

use crate::client::MetadataClient;
use crate::error::MetadataError;
use crate::format::MetadataFormat;
use crate::providers::ec2::{self, Ec2Metadata};
use crate::providers::openstack::{self, OpenStackMetadata};

/// Environment-variable prefix shared by both formats.
pub(crate) const ENV_PREFIX: &str = "OPENSTACK";

/// Canonical mapping-key normalization: upper-case, `-` becomes `_`.
pub(crate) fn env_key(key: &str) -> String {
    key.to_uppercase().replace('-', "_")
}

/// A fully populated metadata record, one variant per format.
///
/// Records are created once per run by [`MetadataSource::fetch`] and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub enum Metadata {
    Ec2(Ec2Metadata),
    OpenStack(OpenStackMetadata),
}

impl Metadata {
    /// Serialize the record into flat `KEY=VALUE` environment text.
    pub fn flatten(&self) -> String {
        match self {
            Metadata::Ec2(md) => md.flatten(),
            Metadata::OpenStack(md) => md.flatten(),
        }
    }
}

/// Where and how to retrieve metadata: the format, the endpoint, and an
/// optional config-drive root that replaces the network entirely.
///
/// # Example
///
/// ```ignore
/// use openstack_environment::{MetadataFormat, MetadataSource};
///
/// #[tokio::main]
/// async fn main() -> Result<(), openstack_environment::MetadataError> {
///     let source = MetadataSource::new(MetadataFormat::OpenStack);
///     let metadata = source.fetch().await?;
///     print!("{}", metadata.flatten());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MetadataSource {
    format: MetadataFormat,
    client: MetadataClient,
    config_drive: Option<PathBuf>,
}

impl MetadataSource {
    /// Create a source for the given format, using the link-local
    /// metadata endpoint.
    pub fn new(format: MetadataFormat) -> Self {
        Self {
            format,
            client: MetadataClient::default(),
            config_drive: None,
        }
    }

    /// Create a source with a custom endpoint base URL (for testing).
    pub fn with_base_url(format: MetadataFormat, base_url: &str) -> Self {
        Self {
            format,
            client: MetadataClient::with_base_url(base_url).expect("failed to create HTTP client"),
            config_drive: None,
        }
    }

    /// Read from a config drive mounted at `root` instead of the network.
    pub fn with_config_drive(mut self, root: impl Into<PathBuf>) -> Self {
        self.config_drive = Some(root.into());
        self
    }

    /// Get the selected metadata format.
    pub fn format(&self) -> MetadataFormat {
        self.format
    }

    /// Retrieve a fresh, fully populated metadata record.
    ///
    /// With a config drive set, the record is decoded from the JSON
    /// document below the drive root; otherwise it is fetched from the
    /// metadata endpoint. Any failure aborts the whole retrieval.
    pub async fn fetch(&self) -> Result<Metadata, MetadataError> {
        match (self.format, &self.config_drive) {
            (MetadataFormat::Ec2, Some(root)) => Ok(Metadata::Ec2(ec2::load(root)?)),
            (MetadataFormat::Ec2, None) => Ok(Metadata::Ec2(ec2::fetch(&self.client).await?)),
            (MetadataFormat::OpenStack, Some(root)) => {
                Ok(Metadata::OpenStack(openstack::load(root)?))
            }
            (MetadataFormat::OpenStack, None) => {
                Ok(Metadata::OpenStack(openstack::fetch(&self.client).await?))
            }
        }
    }
}
