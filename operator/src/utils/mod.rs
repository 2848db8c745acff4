//! Utils is shared functions and constants for the controller

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use k8s_openapi::{
    api::batch::v1::{Job, JobSpec},
    apimachinery::pkg::apis::meta::v1::OwnerReference,
};
use kube::{api::PostParams, client::Client, core::ObjectMeta, Api};

use crate::labels::managed_labels_extend;

/// Operator Context
pub struct Context {
    /// Kube client
    pub k_client: Client,
    /// Delay between observations of a running job
    pub poll_interval: Duration,
}

impl Context {
    /// Create new context
    pub fn new(k_client: Client, poll_interval: Duration) -> Self {
        Context {
            k_client,
            poll_interval,
        }
    }
}

/// Get a job in namespace, None if it does not exist.
pub async fn get_job(
    cx: Arc<Context>,
    ns: &str,
    name: &str,
) -> Result<Option<Job>, kube::error::Error> {
    let jobs: Api<Job> = Api::namespaced(cx.k_client.clone(), ns);
    jobs.get_opt(name).await
}

/// Create a job with extra labels.
///
/// Jobs are never updated once created, so an existing job with the same name is not an error
/// and None is returned.
pub async fn create_job(
    cx: Arc<Context>,
    ns: &str,
    orefs: Vec<OwnerReference>,
    name: &str,
    spec: JobSpec,
    labels: Option<BTreeMap<String, String>>,
) -> Result<Option<Job>, kube::error::Error> {
    let jobs: Api<Job> = Api::namespaced(cx.k_client.clone(), ns);

    let job: Job = Job {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            owner_references: Some(orefs),
            labels: managed_labels_extend(labels),
            ..ObjectMeta::default()
        },
        spec: Some(spec),
        ..Default::default()
    };
    match jobs.create(&PostParams::default(), &job).await {
        Ok(job) => Ok(Some(job)),
        Err(kube::Error::Api(err)) if err.reason == "AlreadyExists" => Ok(None),
        Err(e) => Err(e),
    }
}
