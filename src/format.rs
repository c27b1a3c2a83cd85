//! Metadata format enumeration.

use std::fmt;
use std::str::FromStr;

use crate::error::MetadataError;

/// Supported metadata formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataFormat {
    /// EC2-style metadata (field-by-field tree)
    Ec2,
    /// OpenStack-style metadata (single JSON document)
    OpenStack,
}

impl fmt::Display for MetadataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataFormat::Ec2 => write!(f, "ec2"),
            MetadataFormat::OpenStack => write!(f, "openstack"),
        }
    }
}

impl FromStr for MetadataFormat {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ec2" => Ok(MetadataFormat::Ec2),
            "openstack" => Ok(MetadataFormat::OpenStack),
            _ => Err(MetadataError::UnknownFormat(s.to_string())),
        }
    }
}
