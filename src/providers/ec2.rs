//! EC2-style metadata: field-by-field retrieval with sub-key discovery.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::client::MetadataClient;
use crate::error::MetadataError;
use crate::metadata::{env_key, ENV_PREFIX};

/// Network base path of the EC2 metadata tree.
const META_DATA_PATH: &str = "ec2/2009-04-04/meta-data";

/// Config-drive document path below the drive root.
const CONFIG_DRIVE_PATH: &str = "ec2/2009-04-04/meta-data.json";

/// An entry under `public-keys/<index>`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Ec2PublicKey {
    pub openssh_key: String,
}

/// A fully populated EC2 metadata record.
///
/// JSON field names are the kebab-case metadata keys; fields absent from a
/// config-drive document decode to empty values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Ec2Metadata {
    pub ami_id: String,
    pub ami_launch_index: i64,
    pub ami_manifest_path: String,
    pub block_device_mapping: HashMap<String, String>,
    pub hostname: String,
    pub instance_action: String,
    pub instance_id: String,
    pub instance_type: String,
    pub kernel_id: String,
    pub local_hostname: String,
    pub local_ipv4: String,
    pub placement: HashMap<String, String>,
    pub public_hostname: String,
    pub public_ipv4: String,
    pub public_keys: HashMap<String, Ec2PublicKey>,
    pub ramdisk_id: String,
    pub reservation_id: String,
    pub security_groups: Vec<String>,
}

/// Load the record from a config-drive JSON document.
pub fn load(root: &Path) -> Result<Ec2Metadata, MetadataError> {
    let buf = std::fs::read(root.join(CONFIG_DRIVE_PATH))?;
    Ok(serde_json::from_slice(&buf)?)
}

/// Fetch the record from the metadata service, one field per request.
///
/// Any single failed request aborts the whole retrieval; no partial record
/// is ever returned.
pub async fn fetch(client: &MetadataClient) -> Result<Ec2Metadata, MetadataError> {
    let ami_id = fetch_field(client, "ami-id").await?;
    let ami_launch_index = fetch_field(client, "ami-launch-index").await?.parse()?;
    let ami_manifest_path = fetch_field(client, "ami-manifest-path").await?;
    let block_device_mapping = fetch_mapping(client, "block-device-mapping").await?;
    let hostname = fetch_field(client, "hostname").await?;
    let instance_action = fetch_field(client, "instance-action").await?;
    let instance_id = fetch_field(client, "instance-id").await?;
    let instance_type = fetch_field(client, "instance-type").await?;
    let kernel_id = fetch_field(client, "kernel-id").await?;
    let local_hostname = fetch_field(client, "local-hostname").await?;
    let local_ipv4 = fetch_field(client, "local-ipv4").await?;
    let placement = fetch_mapping(client, "placement").await?;
    let public_hostname = fetch_field(client, "public-hostname").await?;
    let public_ipv4 = fetch_field(client, "public-ipv4").await?;
    let public_keys = fetch_public_keys(client).await?;
    let ramdisk_id = fetch_field(client, "ramdisk-id").await?;
    let reservation_id = fetch_field(client, "reservation-id").await?;
    let security_groups = fetch_field(client, "security-groups")
        .await?
        .split(',')
        .map(str::to_string)
        .collect();

    Ok(Ec2Metadata {
        ami_id,
        ami_launch_index,
        ami_manifest_path,
        block_device_mapping,
        hostname,
        instance_action,
        instance_id,
        instance_type,
        kernel_id,
        local_hostname,
        local_ipv4,
        placement,
        public_hostname,
        public_ipv4,
        public_keys,
        ramdisk_id,
        reservation_id,
        security_groups,
    })
}

async fn fetch_field(client: &MetadataClient, field: &str) -> Result<String, MetadataError> {
    client.get_text(&format!("{}/{}", META_DATA_PATH, field)).await
}

/// Two-pass discovery: list the sub-keys under `field`, then resolve each
/// one into the returned map. Blank listing lines are skipped.
async fn fetch_mapping(
    client: &MetadataClient,
    field: &str,
) -> Result<HashMap<String, String>, MetadataError> {
    let listing = fetch_field(client, field).await?;
    let keys: Vec<&str> = listing.lines().filter(|line| !line.is_empty()).collect();

    let mut map = HashMap::with_capacity(keys.len());
    for key in keys {
        let val = fetch_field(client, &format!("{}/{}", field, key)).await?;
        map.insert(key.to_string(), val);
    }

    Ok(map)
}

/// Three-level discovery for public keys. Listing lines have the form
/// `<index>=<label>`; the key material lives at
/// `public-keys/<index>/openssh-key`.
async fn fetch_public_keys(
    client: &MetadataClient,
) -> Result<HashMap<String, Ec2PublicKey>, MetadataError> {
    let listing = fetch_field(client, "public-keys").await?;

    let mut indices = Vec::new();
    for line in listing.lines().filter(|line| !line.is_empty()) {
        let (index, _label) = line
            .split_once('=')
            .ok_or_else(|| MetadataError::InvalidPublicKey(line.to_string()))?;
        indices.push(index.to_string());
    }

    let mut keys = HashMap::with_capacity(indices.len());
    for index in indices {
        let openssh_key =
            fetch_field(client, &format!("public-keys/{}/openssh-key", index)).await?;
        keys.insert(index, Ec2PublicKey { openssh_key });
    }

    Ok(keys)
}

impl Ec2Metadata {
    /// Serialize the record into `OPENSTACK_*` environment lines.
    ///
    /// Scalar and list lines keep the record's field order; map-derived
    /// lines come out in map iteration order, which is unspecified.
    pub fn flatten(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("{}_AMI_ID={}\n", ENV_PREFIX, self.ami_id));
        out.push_str(&format!(
            "{}_AMI_LAUNCH_INDEX={}\n",
            ENV_PREFIX, self.ami_launch_index
        ));
        out.push_str(&format!(
            "{}_AMI_MANIFEST_PATH={}\n",
            ENV_PREFIX, self.ami_manifest_path
        ));
        for (key, val) in &self.block_device_mapping {
            out.push_str(&format!(
                "{}_BLOCK_DEVICE_MAPPING_{}={}\n",
                ENV_PREFIX,
                env_key(key),
                val.trim_end()
            ));
        }
        out.push_str(&format!("{}_HOSTNAME={}\n", ENV_PREFIX, self.hostname));
        out.push_str(&format!(
            "{}_INSTANCE_ACTION={}\n",
            ENV_PREFIX, self.instance_action
        ));
        out.push_str(&format!("{}_INSTANCE_ID={}\n", ENV_PREFIX, self.instance_id));
        out.push_str(&format!(
            "{}_INSTANCE_TYPE={}\n",
            ENV_PREFIX, self.instance_type
        ));
        out.push_str(&format!("{}_KERNEL_ID={}\n", ENV_PREFIX, self.kernel_id));
        out.push_str(&format!(
            "{}_LOCAL_HOSTNAME={}\n",
            ENV_PREFIX, self.local_hostname
        ));
        out.push_str(&format!("{}_LOCAL_IPV4={}\n", ENV_PREFIX, self.local_ipv4));
        for (key, val) in &self.placement {
            out.push_str(&format!(
                "{}_PLACEMENT_{}={}\n",
                ENV_PREFIX,
                env_key(key),
                val.trim_end()
            ));
        }
        out.push_str(&format!(
            "{}_PUBLIC_HOSTNAME={}\n",
            ENV_PREFIX, self.public_hostname
        ));
        out.push_str(&format!("{}_PUBLIC_IPV4={}\n", ENV_PREFIX, self.public_ipv4));
        for (key, val) in &self.public_keys {
            out.push_str(&format!(
                "{}_PUBLIC_KEYS_{}_OPENSSH_KEY={}\n",
                ENV_PREFIX,
                env_key(key),
                val.openssh_key.trim_end()
            ));
        }
        out.push_str(&format!("{}_RAM_DISK_ID={}\n", ENV_PREFIX, self.ramdisk_id));
        out.push_str(&format!(
            "{}_RESERVATION_ID={}\n",
            ENV_PREFIX, self.reservation_id
        ));
        for (i, val) in self.security_groups.iter().enumerate() {
            out.push_str(&format!("{}_SECURITY_GROUPS_{}={}\n", ENV_PREFIX, i, val));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert!(CONFIG_DRIVE_PATH.starts_with("ec2/2009-04-04"));
        assert!(META_DATA_PATH.starts_with("ec2/2009-04-04"));
    }

    #[test]
    fn test_decode_partial_document() {
        let md: Ec2Metadata =
            serde_json::from_str(r#"{"ami-id":"ami-123","security-groups":["sg-a","sg-b"]}"#)
                .unwrap();
        assert_eq!(md.ami_id, "ami-123");
        assert_eq!(md.security_groups, vec!["sg-a", "sg-b"]);
        assert_eq!(md.ami_launch_index, 0);
        assert!(md.block_device_mapping.is_empty());
    }

    #[test]
    fn test_flatten_scalar_and_list_lines() {
        let md = Ec2Metadata {
            ami_id: "ami-123".to_string(),
            ami_launch_index: 2,
            ramdisk_id: "ari-456".to_string(),
            security_groups: vec!["sg-a".to_string(), "sg-b".to_string()],
            ..Default::default()
        };

        let flat = md.flatten();
        assert!(flat.contains("OPENSTACK_AMI_ID=ami-123\n"));
        assert!(flat.contains("OPENSTACK_AMI_LAUNCH_INDEX=2\n"));
        assert!(flat.contains("OPENSTACK_RAM_DISK_ID=ari-456\n"));
        assert!(flat.contains("OPENSTACK_SECURITY_GROUPS_0=sg-a\n"));
        assert!(flat.contains("OPENSTACK_SECURITY_GROUPS_1=sg-b\n"));
    }

    #[test]
    fn test_flatten_normalizes_mapping_keys() {
        let md = Ec2Metadata {
            block_device_mapping: HashMap::from([(
                "ebs-0".to_string(),
                "/dev/sdb \n".to_string(),
            )]),
            placement: HashMap::from([("availability-zone".to_string(), "nova".to_string())]),
            public_keys: HashMap::from([(
                "0".to_string(),
                Ec2PublicKey {
                    openssh_key: "ssh-rsa AAAA key\n".to_string(),
                },
            )]),
            ..Default::default()
        };

        let flat = md.flatten();
        assert!(flat.contains("OPENSTACK_BLOCK_DEVICE_MAPPING_EBS_0=/dev/sdb\n"));
        assert!(flat.contains("OPENSTACK_PLACEMENT_AVAILABILITY_ZONE=nova\n"));
        assert!(flat.contains("OPENSTACK_PUBLIC_KEYS_0_OPENSSH_KEY=ssh-rsa AAAA key\n"));
    }
}
