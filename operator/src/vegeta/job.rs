use k8s_openapi::api::{
    batch::v1::JobSpec,
    core::v1::{
        Container, EmptyDirVolumeSource, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements,
        Volume, VolumeMount,
    },
};
use kube::api::ObjectMeta;

use crate::labels::selector_labels;
use crate::vegeta::{
    command::{attack_command, export_command, STDOUT_OUTPUT},
    spec::VegetaSpec,
};

/// Name of the container running the attack.
pub const ATTACK_CONTAINER_NAME: &str = "vegeta";
/// Name of the container copying the report to blob storage.
pub const EXPORT_CONTAINER_NAME: &str = "export-vegeta-report-to-cloud";
/// Volume shared by the attack and export containers.
pub const REPORT_VOLUME_NAME: &str = "vegeta-report";
/// Mount path and working directory of the report volume.
pub const REPORT_MOUNT_PATH: &str = "/report";

/// Name of the job running the load test of the named spec.
pub fn job_name(vegeta_name: &str) -> String {
    format!("{vegeta_name}-job")
}

/// Configuration for job images.
#[derive(Clone, Debug, PartialEq)]
pub struct JobImageConfig {
    /// Image running the attack.
    pub image: String,
    /// Image exporting the report.
    pub export_image: String,
    /// Pull policy for all images.
    pub image_pull_policy: String,
}

impl Default for JobImageConfig {
    fn default() -> Self {
        Self {
            image: "peterevans/vegeta".to_owned(),
            export_image: "rclone/rclone".to_owned(),
            image_pull_policy: "IfNotPresent".to_owned(),
        }
    }
}

impl From<&VegetaSpec> for JobImageConfig {
    fn from(value: &VegetaSpec) -> Self {
        let default = Self::default();
        Self {
            image: value.image.to_owned().unwrap_or(default.image),
            export_image: value.export_image.to_owned().unwrap_or(default.export_image),
            image_pull_policy: value
                .image_pull_policy
                .to_owned()
                .unwrap_or(default.image_pull_policy),
        }
    }
}

/// Layout of the containers running a load test.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutionPlan {
    /// One container runs the attack and its report.
    Simple {
        /// Attack command tokens.
        attack: Vec<String>,
    },
    /// An init container runs the attack into a shared volume,
    /// then the main container exports the report from it.
    Export {
        /// Attack command tokens.
        attack: Vec<String>,
        /// Export command tokens.
        export: Vec<String>,
        /// Provider credentials for the export container.
        env: Vec<EnvVar>,
    },
}

impl ExecutionPlan {
    /// Derive the plan for a spec.
    pub fn build(spec: &VegetaSpec) -> Self {
        let attack = attack_command(spec);
        if !has_export(spec) {
            return Self::Simple { attack };
        }
        match export_command(spec) {
            Some(export) => Self::Export {
                attack,
                export,
                env: spec
                    .blob_storage
                    .as_ref()
                    .and_then(|blob_storage| blob_storage.env.clone())
                    .unwrap_or_default(),
            },
            None => Self::Simple { attack },
        }
    }
}

/// Checks if all conditions are met to export the report to blob storage.
pub fn has_export(spec: &VegetaSpec) -> bool {
    spec.blob_storage.is_some()
        && spec
            .attack
            .report
            .as_ref()
            .and_then(|report| report.output.as_deref())
            .map_or(false, |output| !output.is_empty() && output != STDOUT_OUTPUT)
}

/// JobConfig defines which properties of the JobSpec can be customized.
pub struct JobConfig {
    /// Name of the load test, used to label the pods.
    pub name: String,
    /// Containers layout and their commands.
    pub plan: ExecutionPlan,
    /// Resources of every container.
    pub resources: ResourceRequirements,
    /// Images used by the containers.
    pub job_image_config: JobImageConfig,
}

impl JobConfig {
    /// Build the job configuration of the named spec.
    pub fn from_spec(name: &str, spec: &VegetaSpec) -> Self {
        Self {
            name: name.to_owned(),
            plan: ExecutionPlan::build(spec),
            resources: spec.resources.clone().unwrap_or_default(),
            job_image_config: JobImageConfig::from(spec),
        }
    }
}

fn shell_container(name: &str, image: &str, pull_policy: &str, command: &[String]) -> Container {
    Container {
        name: name.to_owned(),
        image: Some(image.to_owned()),
        image_pull_policy: Some(pull_policy.to_owned()),
        command: Some(vec!["/bin/sh".to_owned()]),
        args: Some(vec!["-c".to_owned(), command.join(" ")]),
        ..Default::default()
    }
}

fn report_volume_mounts() -> Option<Vec<VolumeMount>> {
    Some(vec![VolumeMount {
        name: REPORT_VOLUME_NAME.to_owned(),
        mount_path: REPORT_MOUNT_PATH.to_owned(),
        ..Default::default()
    }])
}

/// Create a single shot JobSpec running the plan of the config.
pub fn job_spec(config: JobConfig) -> JobSpec {
    let images = &config.job_image_config;
    let pod_spec = match &config.plan {
        ExecutionPlan::Simple { attack } => PodSpec {
            containers: vec![Container {
                resources: Some(config.resources.clone()),
                ..shell_container(
                    ATTACK_CONTAINER_NAME,
                    &images.image,
                    &images.image_pull_policy,
                    attack,
                )
            }],
            restart_policy: Some("Never".to_owned()),
            ..Default::default()
        },
        ExecutionPlan::Export {
            attack,
            export,
            env,
        } => PodSpec {
            init_containers: Some(vec![Container {
                resources: Some(config.resources.clone()),
                volume_mounts: report_volume_mounts(),
                working_dir: Some(REPORT_MOUNT_PATH.to_owned()),
                ..shell_container(
                    ATTACK_CONTAINER_NAME,
                    &images.image,
                    &images.image_pull_policy,
                    attack,
                )
            }]),
            containers: vec![Container {
                env: Some(env.clone()),
                resources: Some(config.resources.clone()),
                volume_mounts: report_volume_mounts(),
                working_dir: Some(REPORT_MOUNT_PATH.to_owned()),
                ..shell_container(
                    EXPORT_CONTAINER_NAME,
                    &images.export_image,
                    &images.image_pull_policy,
                    export,
                )
            }],
            volumes: Some(vec![Volume {
                name: REPORT_VOLUME_NAME.to_owned(),
                empty_dir: Some(EmptyDirVolumeSource::default()),
                ..Default::default()
            }]),
            restart_policy: Some("Never".to_owned()),
            ..Default::default()
        },
    };

    JobSpec {
        // A failed attack is not retried.
        backoff_limit: Some(0),
        template: PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: selector_labels(&config.name),
                ..Default::default()
            }),
            spec: Some(pod_spec),
        },
        ..Default::default()
    }
}
