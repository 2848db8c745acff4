//! Helper methods only available for tests

use std::collections::BTreeMap;

use k8s_openapi::{
    api::{batch::v1::Job, core::v1::EnvVar},
    apimachinery::pkg::apis::meta::v1::OwnerReference,
};
use kube::{core::ObjectMeta, Resource};
use tokio::task::JoinHandle;

use crate::{
    utils::test::ApiServerVerifier,
    vegeta::{
        job::{job_spec, JobConfig},
        AttackPhase, AttackSpec, BlobStorageProvider, BlobStorageSpec, ReportSpec, Vegeta,
        VegetaSpec, VegetaStatus,
    },
};

/// Path of the job of the test load test.
pub const JOB_PATH: &str = "/apis/batch/v1/namespaces/test/jobs/test-job";
/// Path of the jobs collection of the test namespace.
pub const JOBS_PATH: &str = "/apis/batch/v1/namespaces/test/jobs";
/// Path of the status subresource of the test load test.
pub const STATUS_PATH: &str =
    "/apis/vegeta.dastergon.io/v1alpha1/namespaces/test/vegeta/test/status";

// Add tests specific implementation to the Vegeta
impl Vegeta {
    /// A normal test load test, attacking a single target.
    pub fn test() -> Self {
        let mut vegeta = Vegeta::new(
            "test",
            VegetaSpec {
                target: Some("http://x/y".to_owned()),
                attack: AttackSpec {
                    rate: Some("50/1s".to_owned()),
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        let meta = vegeta.meta_mut();
        meta.namespace = Some("test".to_owned());
        meta.uid = Some("test-uid".to_owned());
        vegeta
    }
    /// Modify a load test to have an expected spec
    pub fn with_spec(self, spec: VegetaSpec) -> Self {
        Self { spec, ..self }
    }
    /// Modify a load test to have an expected status
    pub fn with_status(self, status: VegetaStatus) -> Self {
        Self {
            status: Some(status),
            ..self
        }
    }
}

/// How the API server answers the creation of the job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CreateOutcome {
    /// The job is created.
    Created,
    /// Another pass created the job first.
    AlreadyExists,
}

/// Stub of expected requests during reconciliation.
///
/// The default expects a pass that finds no job, creates it and records it as pending.
#[derive(Debug)]
pub struct Stub {
    vegeta: Vegeta,
    /// Job returned when looking it up, None answers NotFound.
    pub job_lookup: Option<Job>,
    /// Expected creation of the job, None when no create call may happen.
    pub job_create: Option<CreateOutcome>,
    /// Expected status patch, None when the status must be left alone.
    pub status: Option<VegetaStatus>,
}

impl Default for Stub {
    fn default() -> Self {
        Self {
            vegeta: Vegeta::test(),
            job_lookup: None,
            job_create: Some(CreateOutcome::Created),
            status: Some(VegetaStatus {
                job_name: Some("test-job".to_owned()),
                phase: Some(AttackPhase::Pending),
            }),
        }
    }
}

impl Stub {
    /// Expect reconciling the given load test.
    pub fn with_vegeta(self, vegeta: Vegeta) -> Self {
        Self { vegeta, ..self }
    }

    /// Expect reconciling the test load test with the given spec.
    pub fn with_spec(self, spec: VegetaSpec) -> Self {
        let vegeta = self.vegeta.clone().with_spec(spec);
        self.with_vegeta(vegeta)
    }

    /// The load test the stub expects to reconcile.
    pub fn vegeta(&self) -> Vegeta {
        self.vegeta.clone()
    }

    /// Spec whose report is exported to an S3 bucket.
    pub fn exporting_spec() -> VegetaSpec {
        VegetaSpec {
            target: Some("http://x/y".to_owned()),
            attack: AttackSpec {
                report: Some(ReportSpec {
                    output: Some("/report/out.json".to_owned()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            blob_storage: Some(BlobStorageSpec {
                provider: BlobStorageProvider::Aws,
                name: "bucket1".to_owned(),
                env: Some(vec![EnvVar {
                    name: "AWS_ACCESS_KEY_ID".to_owned(),
                    value: Some("key".to_owned()),
                    ..Default::default()
                }]),
            }),
            ..Default::default()
        }
    }

    /// The job a reconcile pass should create for the load test.
    pub fn expected_job(&self) -> Job {
        Job {
            metadata: ObjectMeta {
                name: Some("test-job".to_owned()),
                labels: Some(BTreeMap::from_iter([
                    ("app".to_owned(), "test".to_owned()),
                    ("managed-by".to_owned(), "vegeta-operator".to_owned()),
                ])),
                owner_references: Some(vec![OwnerReference {
                    api_version: "vegeta.dastergon.io/v1alpha1".to_owned(),
                    kind: "Vegeta".to_owned(),
                    name: "test".to_owned(),
                    uid: "test-uid".to_owned(),
                    controller: Some(true),
                    ..Default::default()
                }]),
                ..Default::default()
            },
            spec: Some(job_spec(JobConfig::from_spec("test", &self.vegeta.spec))),
            ..Default::default()
        }
    }

    /// Run a test with against the provided server.
    ///
    /// NB: If the controller is making more calls than we are handling in the stub,
    /// you then typically see a `KubeError(Service(Closed(())))` from the reconciler.
    ///
    /// You should await the `JoinHandle` (with a timeout) from this function to ensure that the
    /// stub runs to completion (i.e. all expected calls were responded to),
    /// using the timeout to catch missing api calls to Kubernetes.
    pub fn run(self, mut fakeserver: ApiServerVerifier) -> JoinHandle<()> {
        let expected_job = self.expected_job();
        tokio::spawn(async move {
            // We need to handle each expected call in sequence
            fakeserver
                .handle_request_response("GET", JOB_PATH, self.job_lookup.as_ref())
                .await
                .expect("job lookup should be answered");

            match self.job_create {
                Some(CreateOutcome::Created) => fakeserver
                    .handle_create(JOBS_PATH, &expected_job)
                    .await
                    .expect("job should be created"),
                Some(CreateOutcome::AlreadyExists) => fakeserver
                    .handle_error("POST", JOBS_PATH, 409, "AlreadyExists")
                    .await
                    .expect("job create should conflict"),
                None => {}
            }

            // Finally we handle the patch status call
            if let Some(status) = self.status {
                let (request, send) = fakeserver.next_request("PATCH", STATUS_PATH).await;
                let actual: VegetaStatus =
                    serde_json::from_value(request.body["status"].clone())
                        .expect("JSON should be a valid status");
                assert_eq!(actual, status);

                let vegeta = self.vegeta.with_status(actual);
                let response = serde_json::to_vec(&vegeta).unwrap();
                send.send_response(
                    http::Response::builder()
                        .body(hyper::Body::from(response))
                        .unwrap(),
                );
            }
        })
    }
}
