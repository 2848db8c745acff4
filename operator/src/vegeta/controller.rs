use std::{sync::Arc, time::Duration};

use futures::stream::StreamExt;
use k8s_openapi::api::batch::v1::{Job, JobStatus};
use kube::{
    api::{Patch, PatchParams},
    client::Client,
    core::object::HasSpec,
    runtime::Controller,
    Api,
};
use kube::{
    runtime::{
        controller::Action,
        watcher::{self, Config},
    },
    Resource, ResourceExt,
};
use opentelemetry::{global, KeyValue};
use tracing::{debug, error, info, warn};

use crate::{
    labels::{selector_labels, MANAGED_BY_LABEL_SELECTOR},
    utils::{create_job, get_job, Context},
    vegeta::{
        job::{job_name, job_spec, JobConfig},
        AttackPhase, Vegeta, VegetaStatus,
    },
};

/// Handle errors during reconciliation.
fn on_error(_vegeta: Arc<Vegeta>, _error: &Error, _context: Arc<Context>) -> Action {
    Action::requeue(Duration::from_secs(5))
}

/// Errors produced by the reconcile function.
#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("App error: {source}")]
    App {
        #[from]
        source: anyhow::Error,
    },
    #[error("Kube error: {source}")]
    Kube {
        #[from]
        source: kube::Error,
    },
}

/// Start a controller for the Vegeta CRD.
///
/// Runs until the process receives SIGTERM or ctrl-c.
pub async fn run(poll_interval: Duration) -> anyhow::Result<()> {
    let k_client = Client::try_default().await?;
    let context = Arc::new(Context::new(k_client.clone(), poll_interval));

    let vegetas: Api<Vegeta> = Api::all(k_client.clone());
    let jobs = Api::<Job>::all(k_client.clone());

    Controller::new(vegetas.clone(), Config::default())
        .owns(
            jobs,
            watcher::Config::default().labels(MANAGED_BY_LABEL_SELECTOR),
        )
        .shutdown_on_signal()
        .run(reconcile, on_error, context)
        .for_each(|rec_res| async move {
            match rec_res {
                Ok((vegeta, _)) => {
                    debug!(vegeta.name, "reconcile success");
                }
                Err(err) => {
                    error!(?err, "reconcile error")
                }
            }
        })
        .await;
    Ok(())
}

/// Perform a reconcile pass for the Vegeta CRD
async fn reconcile(vegeta: Arc<Vegeta>, cx: Arc<Context>) -> Result<Action, Error> {
    let meter = global::meter("vegeta");
    let runs = meter
        .u64_counter("vegeta_reconcile_count")
        .with_description("Number of vegeta reconciles")
        .init();

    let result = reconcile_(vegeta, cx).await;
    let outcome = if result.is_ok() { "ok" } else { "err" };
    runs.add(1, &[KeyValue::new("result", outcome)]);
    result
}

/// Perform a reconcile pass for the Vegeta CRD
///
/// The job is created at most once. Later passes only observe it, requeueing until it
/// reaches a terminal phase so no worker is held while the attack runs.
async fn reconcile_(vegeta: Arc<Vegeta>, cx: Arc<Context>) -> Result<Action, Error> {
    let spec = vegeta.spec();
    debug!(?spec, "reconcile");

    let ns = vegeta
        .namespace()
        .ok_or_else(|| anyhow::anyhow!("vegeta resource should be namespaced"))?;
    let name = vegeta.name_any();
    let job_name = job_name(&name);

    let phase = match get_job(cx.clone(), &ns, &job_name).await? {
        Some(job) => {
            debug!(job = %job_name, "job already exists, skipping create");
            job_phase(job.status.as_ref())
        }
        None => {
            let orefs = vegeta
                .controller_owner_ref(&())
                .map(|oref| vec![oref])
                .unwrap_or_default();
            info!(namespace = %ns, job = %job_name, "creating job");
            match create_job(
                cx.clone(),
                &ns,
                orefs,
                &job_name,
                job_spec(JobConfig::from_spec(&name, spec)),
                selector_labels(&name),
            )
            .await?
            {
                Some(job) => job_phase(job.status.as_ref()),
                // Lost a race with another pass, the job exists all the same.
                None => AttackPhase::Pending,
            }
        }
    };

    match phase {
        AttackPhase::Succeeded => info!(namespace = %ns, job = %job_name, "job completed"),
        AttackPhase::Failed => warn!(namespace = %ns, job = %job_name, "job failed"),
        _ => {}
    }

    let status = VegetaStatus {
        job_name: Some(job_name),
        phase: Some(phase),
    };
    if vegeta.status.as_ref() != Some(&status) {
        let vegetas: Api<Vegeta> = Api::namespaced(cx.k_client.clone(), &ns);
        let _patched = vegetas
            .patch_status(
                &name,
                &PatchParams::default(),
                &Patch::Merge(serde_json::json!({ "status": status })),
            )
            .await?;
    }

    if phase.is_terminal() {
        Ok(Action::await_change())
    } else {
        Ok(Action::requeue(cx.poll_interval))
    }
}

/// Determine the phase of an attack from the status of its job.
fn job_phase(status: Option<&JobStatus>) -> AttackPhase {
    let Some(status) = status else {
        return AttackPhase::Pending;
    };
    let has_condition = |type_: &str| {
        status.conditions.iter().flatten().any(|condition| {
            condition.type_ == type_ && condition.status == "True"
        })
    };
    if status.succeeded.unwrap_or_default() > 0 || has_condition("Complete") {
        AttackPhase::Succeeded
    } else if has_condition("Failed") {
        AttackPhase::Failed
    } else if status.active.unwrap_or_default() > 0 {
        AttackPhase::Running
    } else {
        AttackPhase::Pending
    }
}
