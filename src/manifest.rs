//! Serde models for the appc pod and image manifests persisted by the runtime.
//!
//! Only the fields read by the introspection API are modelled; unknown fields
//! are ignored so that newer manifests still parse.

use serde::Deserialize;

/// The appc schema version reported for every image.
pub const APPC_VERSION: &str = "0.8.11";

/// Version reported for images without a `version` label.
pub const DEFAULT_IMAGE_VERSION: &str = "latest";

const POD_MANIFEST_KIND: &str = "PodManifest";
const IMAGE_MANIFEST_KIND: &str = "ImageManifest";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to decode manifest: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected manifest kind `{found}`, expected `{expected}`")]
    Kind {
        expected: &'static str,
        found: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A `name`/`value` pair as used for appc labels and annotations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PodManifest {
    #[serde(rename = "acKind")]
    pub ac_kind: String,
    #[serde(rename = "acVersion", default)]
    pub ac_version: String,
    #[serde(default)]
    pub apps: Vec<RuntimeApp>,
    #[serde(default)]
    pub annotations: Vec<NameValue>,
}

impl PodManifest {
    /// Decodes a pod manifest and checks its `acKind`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let manifest: Self = serde_json::from_slice(data)?;
        check_kind(POD_MANIFEST_KIND, &manifest.ac_kind)?;
        Ok(manifest)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeApp {
    pub name: String,
    pub image: RuntimeImage,
    #[serde(default)]
    pub annotations: Vec<NameValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeImage {
    #[serde(default)]
    pub name: Option<String>,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageManifest {
    #[serde(rename = "acKind")]
    pub ac_kind: String,
    #[serde(rename = "acVersion", default)]
    pub ac_version: String,
    pub name: String,
    #[serde(default)]
    pub labels: Vec<NameValue>,
    #[serde(default)]
    pub annotations: Vec<NameValue>,
}

impl ImageManifest {
    /// Decodes an image manifest and checks its `acKind`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let manifest: Self = serde_json::from_slice(data)?;
        check_kind(IMAGE_MANIFEST_KIND, &manifest.ac_kind)?;
        Ok(manifest)
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.value.as_str())
    }

    /// The `version` label, or [`DEFAULT_IMAGE_VERSION`] if unset.
    pub fn version(&self) -> &str {
        self.label("version").unwrap_or(DEFAULT_IMAGE_VERSION)
    }
}

fn check_kind(expected: &'static str, found: &str) -> Result<()> {
    if found != expected {
        return Err(Error::Kind {
            expected,
            found: found.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POD: &str = r#"{
        "acKind": "PodManifest",
        "acVersion": "0.8.11",
        "apps": [
            {
                "name": "redis",
                "image": {"name": "coreos.com/redis", "id": "sha512-aaaa"},
                "annotations": [{"name": "role", "value": "cache"}]
            },
            {"name": "etcd", "image": {"id": "sha512-bbbb"}}
        ],
        "annotations": [{"name": "owner", "value": "ops"}],
        "volumes": []
    }"#;

    #[test]
    fn test_parse_pod_manifest() {
        let manifest = PodManifest::parse(POD.as_bytes()).unwrap();
        assert_eq!(manifest.apps.len(), 2);
        assert_eq!(manifest.apps[0].name, "redis");
        assert_eq!(manifest.apps[0].image.id, "sha512-aaaa");
        assert_eq!(manifest.apps[1].image.name, None);
        assert!(manifest.apps[1].annotations.is_empty());
        assert_eq!(manifest.annotations[0].value, "ops");
    }

    #[test]
    fn test_parse_pod_manifest_wrong_kind() {
        let err = PodManifest::parse(br#"{"acKind": "ImageManifest", "name": "x"}"#).unwrap_err();
        match err {
            Error::Kind { expected, found } => {
                assert_eq!(expected, "PodManifest");
                assert_eq!(found, "ImageManifest");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            PodManifest::parse(b"{not json"),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_image_version_label() {
        let manifest = ImageManifest::parse(
            br#"{"acKind": "ImageManifest", "name": "coreos.com/etcd",
                 "labels": [{"name": "os", "value": "linux"}, {"name": "version", "value": "v3.1"}]}"#,
        )
        .unwrap();
        assert_eq!(manifest.version(), "v3.1");
        assert_eq!(manifest.label("os"), Some("linux"));
    }

    #[test]
    fn test_image_version_defaults_to_latest() {
        let manifest =
            ImageManifest::parse(br#"{"acKind": "ImageManifest", "name": "coreos.com/etcd"}"#)
                .unwrap();
        assert_eq!(manifest.version(), "latest");
        assert_eq!(manifest.label("version"), None);
    }
}
