//! Engine API wire types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use ferry_core::{ContainerRecord, ContainerSpec, ImageSummary};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct VersionResponse {
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default, rename = "MinAPIVersion")]
    pub min_api_version: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ApiPort {
    #[serde(default)]
    pub public_port: Option<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ApiContainer {
    pub id: String,
    #[serde(default)]
    pub names: Option<Vec<String>>,
    #[serde(default)]
    pub ports: Option<Vec<ApiPort>>,
}

impl From<ApiContainer> for ContainerRecord {
    fn from(c: ApiContainer) -> Self {
        let published_ports: BTreeSet<u16> = c
            .ports
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.public_port)
            .filter(|p| *p != 0)
            .collect();
        ContainerRecord {
            id: c.id,
            names: c.names.unwrap_or_default(),
            published_ports,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ApiImage {
    pub id: String,
    #[serde(default)]
    pub repo_tags: Option<Vec<String>>,
}

impl From<ApiImage> for ImageSummary {
    fn from(i: ApiImage) -> Self {
        ImageSummary {
            id: i.id,
            repo_tags: i.repo_tags.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CreateResponse {
    pub id: String,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

/// One message of the image-load progress stream
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoadMessage {
    #[serde(default)]
    pub stream: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_detail: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

impl LoadMessage {
    pub fn failure(&self) -> Option<String> {
        self.error_detail
            .as_ref()
            .and_then(|d| d.message.clone())
            .or_else(|| self.error.clone())
    }
}

/// Scan a load response body for the first reported failure
pub(crate) fn load_failure(body: &[u8]) -> Option<String> {
    serde_json::Deserializer::from_slice(body)
        .into_iter::<LoadMessage>()
        .filter_map(Result::ok)
        .find_map(|message| {
            if let Some(stream) = &message.stream {
                tracing::debug!("load: {}", stream.trim_end());
            }
            message.failure()
        })
}

#[derive(Debug, Serialize)]
pub(crate) struct EmptyObject {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PortBindingBody {
    pub host_ip: String,
    pub host_port: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct HostConfigBody {
    pub port_bindings: BTreeMap<String, Vec<PortBindingBody>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CreateContainerBody {
    pub image: String,
    pub exposed_ports: BTreeMap<String, EmptyObject>,
    pub host_config: HostConfigBody,
}

impl From<&ContainerSpec> for CreateContainerBody {
    fn from(spec: &ContainerSpec) -> Self {
        let mut exposed_ports = BTreeMap::new();
        let mut port_bindings: BTreeMap<String, Vec<PortBindingBody>> = BTreeMap::new();

        for mapping in &spec.ports {
            let key = format!("{}/tcp", mapping.container_port);
            exposed_ports.insert(key.clone(), EmptyObject {});
            port_bindings.entry(key).or_default().push(PortBindingBody {
                host_ip: mapping.host_ip.clone(),
                host_port: mapping.host_port.to_string(),
            });
        }

        Self {
            image: spec.image.clone(),
            exposed_ports,
            host_config: HostConfigBody { port_bindings },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::PortMapping;

    #[test]
    fn test_container_decoding() {
        let body = r#"[
            {"Id":"c123","Names":["/old"],"Image":"app","State":"running",
             "Ports":[{"IP":"0.0.0.0","PrivatePort":80,"PublicPort":8080,"Type":"tcp"},
                      {"PrivatePort":443,"Type":"tcp"}]},
            {"Id":"c456","Names":["/other"],"Ports":null}
        ]"#;
        let containers: Vec<ApiContainer> = serde_json::from_str(body).unwrap();
        let records: Vec<ContainerRecord> = containers.into_iter().map(Into::into).collect();

        assert_eq!(records[0].id, "c123");
        assert_eq!(records[0].names, vec!["/old".to_string()]);
        assert!(records[0].publishes(8080));
        assert!(!records[0].publishes(443));
        assert!(records[1].published_ports.is_empty());
    }

    #[test]
    fn test_create_body() {
        let spec = ContainerSpec {
            image: "app".into(),
            name: "NewContainer".into(),
            ports: vec![PortMapping::all_interfaces(8080, 80)],
        };
        let json = serde_json::to_value(CreateContainerBody::from(&spec)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Image": "app",
                "ExposedPorts": {"80/tcp": {}},
                "HostConfig": {
                    "PortBindings": {
                        "80/tcp": [{"HostIp": "0.0.0.0", "HostPort": "8080"}]
                    }
                }
            })
        );
    }

    #[test]
    fn test_load_failure_detection() {
        let ok = b"{\"stream\":\"Loaded image: app:v2\\n\"}\r\n";
        assert_eq!(load_failure(ok), None);

        let failed = br#"{"stream":"Loading layer"}
{"errorDetail":{"message":"no space left on device"},"error":"no space left on device"}"#;
        assert_eq!(
            load_failure(failed).as_deref(),
            Some("no space left on device")
        );

        let bare = br#"{"error":"unexpected EOF"}"#;
        assert_eq!(load_failure(bare).as_deref(), Some("unexpected EOF"));
    }

    #[test]
    fn test_version_decoding() {
        let v: VersionResponse =
            serde_json::from_str(r#"{"Version":"24.0.7","ApiVersion":"1.43","MinAPIVersion":"1.12"}"#)
                .unwrap();
        assert_eq!(v.api_version.as_deref(), Some("1.43"));
        assert_eq!(v.min_api_version.as_deref(), Some("1.12"));
    }
}
