use k8s_openapi::api::core::v1::{EnvVar, ResourceRequirements};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Primary CRD for describing and running a vegeta load test.
#[derive(CustomResource, Serialize, Deserialize, Debug, Default, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "vegeta.dastergon.io",
    version = "v1alpha1",
    kind = "Vegeta",
    plural = "vegeta",
    status = "VegetaStatus",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct VegetaSpec {
    /// Target endpoint of the load test.
    /// For multiple targets use the targets field of the attack instead.
    pub target: Option<String>,
    /// Attack parameters.
    pub attack: AttackSpec,
    /// Cloud storage the report is exported to once the attack finishes.
    pub blob_storage: Option<BlobStorageSpec>,
    /// Resource requirements applied to every container of the job.
    pub resources: Option<ResourceRequirements>,
    /// Image running the attack.
    pub image: Option<String>,
    /// Pull policy for all images of the job.
    pub image_pull_policy: Option<String>,
    /// Image running the export of the report.
    pub export_image: Option<String>,
}

/// Describes the attack parameters.
///
/// Fields are declared in the order their flags appear on the command line.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttackSpec {
    /// Requests body.
    pub body: Option<String>,
    /// TLS client PEM encoded certificate file.
    pub cert: Option<String>,
    /// Send body with chunked transfer encoding.
    pub chunked: Option<bool>,
    /// Max open idle connections per target host.
    pub connections: Option<i32>,
    /// Duration of the test, 0 runs forever.
    pub duration: Option<String>,
    /// Send HTTP/2 requests without TLS encryption.
    pub h2c: Option<bool>,
    /// Request header.
    pub header: Option<String>,
    /// Send HTTP/2 requests when supported by the server.
    pub http2: Option<bool>,
    /// Ignore invalid server TLS certificates.
    pub insecure: Option<bool>,
    /// Use persistent connections.
    pub keep_alive: Option<bool>,
    /// TLS client PEM encoded private key file.
    pub key: Option<String>,
    /// Local IP address.
    pub laddr: Option<String>,
    /// Read the input targets lazily instead of eagerly.
    pub lazy: Option<bool>,
    /// Maximum number of bytes to capture from response bodies.
    pub max_body: Option<u64>,
    /// Maximum number of workers.
    pub max_workers: Option<u64>,
    /// Attack name.
    pub name: Option<String>,
    /// Output file of the attack results.
    pub output: Option<String>,
    /// Proxy CONNECT header.
    pub proxy_header: Option<String>,
    /// Number of requests per time unit, 0 is infinity.
    pub rate: Option<String>,
    /// Number of redirects to follow, -1 will not follow but marks as success.
    pub redirects: Option<i32>,
    /// Comma separated addresses (ip:port) used for DNS resolution.
    pub resolvers: Option<String>,
    /// Comma separated TLS root certificate files.
    #[serde(rename = "rootcerts")]
    pub root_certs: Option<String>,
    /// Targets file.
    pub targets: Option<String>,
    /// Requests timeout.
    pub timeout: Option<String>,
    /// Unix socket to connect to, overrides the host address in target URLs.
    pub unix_socket: Option<String>,
    /// Initial number of workers.
    pub workers: Option<u64>,
    /// Reporting parameters, only used when the attack output is not a file.
    pub report: Option<ReportSpec>,
}

/// Describes the report parameters.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportSpec {
    /// Histogram buckets, e.g.: "[0,1ms,10ms]".
    pub buckets: Option<String>,
    /// Report interval.
    pub every: Option<String>,
    /// Output file of the report.
    pub output: Option<String>,
    /// Report type to generate [text, json, hist[buckets], hdrplot].
    #[serde(rename = "type")]
    pub report_type: Option<String>,
}

/// Cloud storage provider for storing the report in a bucket.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlobStorageSpec {
    /// Cloud provider hosting the bucket.
    pub provider: BlobStorageProvider,
    /// Name of the bucket.
    pub name: String,
    /// Environment variables used to authenticate with the provider.
    pub env: Option<Vec<EnvVar>>,
}

/// Supported cloud storage providers.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BlobStorageProvider {
    /// Amazon S3, authenticated from the environment.
    Aws,
}

/// Current status of a load test.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VegetaStatus {
    /// Name of the job running the attack.
    pub job_name: Option<String>,
    /// Phase of the job running the attack.
    pub phase: Option<AttackPhase>,
}

/// Lifecycle of the job running an attack.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, JsonSchema)]
pub enum AttackPhase {
    /// The job exists but none of its pods are running.
    Pending,
    /// The attack is in progress.
    Running,
    /// The attack and any export completed.
    Succeeded,
    /// The job failed, it is not retried.
    Failed,
}

impl AttackPhase {
    /// Reports if the phase will not change anymore.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttackPhase::Succeeded | AttackPhase::Failed)
    }
}

#[cfg(test)]
mod tests {
    use kube::CustomResourceExt;

    use super::*;

    #[test]
    fn crd_restricts_providers() {
        let crd = serde_json::to_string(&Vegeta::crd()).expect("crd should serialize");
        assert!(crd.contains(r#""enum":["aws"]"#));
    }

    #[test]
    fn spec_uses_field_names_of_the_api() {
        let spec: VegetaSpec = serde_json::from_value(serde_json::json!({
            "target": "http://x/y",
            "attack": {
                "keepAlive": true,
                "laddr": "10.0.0.1",
                "maxBody": 10,
                "rootcerts": "/certs/ca.pem",
                "unixSocket": "/var/run/app.sock",
                "report": { "type": "json" },
            },
            "blobStorage": { "provider": "aws", "name": "bucket1" },
        }))
        .expect("spec should deserialize");
        assert_eq!(spec.attack.keep_alive, Some(true));
        assert_eq!(spec.attack.laddr.as_deref(), Some("10.0.0.1"));
        assert_eq!(spec.attack.max_body, Some(10));
        assert_eq!(spec.attack.root_certs.as_deref(), Some("/certs/ca.pem"));
        assert_eq!(spec.attack.unix_socket.as_deref(), Some("/var/run/app.sock"));
        assert_eq!(
            spec.attack.report.and_then(|report| report.report_type),
            Some("json".to_owned())
        );
        assert_eq!(
            spec.blob_storage.map(|blob_storage| blob_storage.provider),
            Some(BlobStorageProvider::Aws)
        );
    }

    #[test]
    fn terminal_phases() {
        assert!(AttackPhase::Succeeded.is_terminal());
        assert!(AttackPhase::Failed.is_terminal());
        assert!(!AttackPhase::Pending.is_terminal());
        assert!(!AttackPhase::Running.is_terminal());
    }
}
