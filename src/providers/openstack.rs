//! OpenStack-style metadata: one JSON document, no discovery.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::client::MetadataClient;
use crate::error::MetadataError;
use crate::metadata::{env_key, ENV_PREFIX};

/// Document path, shared by the network endpoint and the config drive.
const META_DATA_PATH: &str = "openstack/2012-08-10/meta_data.json";

/// A file descriptor entry in the metadata document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpenStackFile {
    pub content_path: String,
    pub path: String,
}

/// A fully populated OpenStack metadata record.
///
/// Some deployments emit the instance name under the legacy `Name` key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpenStackMetadata {
    pub availability_zone: String,
    pub files: Vec<OpenStackFile>,
    pub hostname: String,
    pub launch_index: i64,
    #[serde(alias = "Name")]
    pub name: String,
    pub meta: HashMap<String, String>,
    pub public_keys: HashMap<String, String>,
    pub uuid: String,
}

/// Load the record from a config-drive JSON document.
pub fn load(root: &Path) -> Result<OpenStackMetadata, MetadataError> {
    let buf = std::fs::read(root.join(META_DATA_PATH))?;
    Ok(serde_json::from_slice(&buf)?)
}

/// Fetch the record from the metadata service in a single request.
pub async fn fetch(client: &MetadataClient) -> Result<OpenStackMetadata, MetadataError> {
    let body = client.get_text(META_DATA_PATH).await?;
    Ok(serde_json::from_str(&body)?)
}

impl OpenStackMetadata {
    /// Serialize the record into `OPENSTACK_*` environment lines.
    ///
    /// Scalar and list lines keep the record's field order; map-derived
    /// lines come out in map iteration order, which is unspecified.
    pub fn flatten(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "{}_AVAILABILITY_ZONE={}\n",
            ENV_PREFIX, self.availability_zone
        ));
        for (i, file) in self.files.iter().enumerate() {
            out.push_str(&format!(
                "{}_FILES_{}_CONTENT_PATH={}\n",
                ENV_PREFIX, i, file.content_path
            ));
            out.push_str(&format!("{}_FILES_{}_PATH={}\n", ENV_PREFIX, i, file.path));
        }
        out.push_str(&format!("{}_HOSTNAME={}\n", ENV_PREFIX, self.hostname));
        out.push_str(&format!(
            "{}_LAUNCH_INDEX={}\n",
            ENV_PREFIX, self.launch_index
        ));
        out.push_str(&format!("{}_NAME={}\n", ENV_PREFIX, self.name));
        for (key, val) in &self.meta {
            out.push_str(&format!(
                "{}_META_{}={}\n",
                ENV_PREFIX,
                env_key(key),
                val.trim_end()
            ));
        }
        for (key, val) in &self.public_keys {
            out.push_str(&format!(
                "{}_PUBLIC_KEYS_{}={}\n",
                ENV_PREFIX,
                env_key(key),
                val.trim_end()
            ));
        }
        out.push_str(&format!("{}_UUID={}\n", ENV_PREFIX, self.uuid));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path() {
        assert_eq!(META_DATA_PATH, "openstack/2012-08-10/meta_data.json");
    }

    #[test]
    fn test_decode_document() {
        let doc = r#"{
            "availability_zone": "nova",
            "files": [{"content_path": "/content/0000", "path": "/etc/motd"}],
            "hostname": "test.novalocal",
            "launch_index": 0,
            "name": "test",
            "meta": {"role": "webserver"},
            "public_keys": {"mykey": "ssh-rsa AAAA mykey\n"},
            "uuid": "83679162-1378-4288-a2d4-70e13ec132aa"
        }"#;

        let md: OpenStackMetadata = serde_json::from_str(doc).unwrap();
        assert_eq!(md.availability_zone, "nova");
        assert_eq!(md.files.len(), 1);
        assert_eq!(md.files[0].path, "/etc/motd");
        assert_eq!(md.name, "test");
        assert_eq!(md.meta["role"], "webserver");
    }

    #[test]
    fn test_decode_legacy_name_key() {
        let md: OpenStackMetadata = serde_json::from_str(r#"{"Name": "legacy"}"#).unwrap();
        assert_eq!(md.name, "legacy");
    }

    #[test]
    fn test_flatten_lines() {
        let md = OpenStackMetadata {
            availability_zone: "nova".to_string(),
            files: vec![OpenStackFile {
                content_path: "/content/0000".to_string(),
                path: "/etc/motd".to_string(),
            }],
            hostname: "test.novalocal".to_string(),
            launch_index: 1,
            name: "test".to_string(),
            meta: HashMap::from([("ha-policy".to_string(), "active".to_string())]),
            public_keys: HashMap::from([(
                "mykey".to_string(),
                "ssh-rsa AAAA mykey\n".to_string(),
            )]),
            uuid: "83679162-1378-4288-a2d4-70e13ec132aa".to_string(),
        };

        let flat = md.flatten();
        assert!(flat.contains("OPENSTACK_AVAILABILITY_ZONE=nova\n"));
        assert!(flat.contains("OPENSTACK_FILES_0_CONTENT_PATH=/content/0000\n"));
        assert!(flat.contains("OPENSTACK_FILES_0_PATH=/etc/motd\n"));
        assert!(flat.contains("OPENSTACK_LAUNCH_INDEX=1\n"));
        assert!(flat.contains("OPENSTACK_META_HA_POLICY=active\n"));
        assert!(flat.contains("OPENSTACK_PUBLIC_KEYS_MYKEY=ssh-rsa AAAA mykey\n"));
        assert!(flat.contains("OPENSTACK_UUID=83679162-1378-4288-a2d4-70e13ec132aa\n"));
    }
}
