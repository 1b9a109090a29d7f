use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{ContainerStatus, Event, Namespace, Pod, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::api::{DeleteParams, ListParams, LogParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client, Config, ResourceExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::process::Stdio;
use tokio::process::{Child, Command as TokioCommand};
use tracing::{debug, warn};

use crate::logs::contains_error_marker;
use crate::message::LogRequest;
use crate::model::{
    ContainerInfo, ContainerMetrics, DashboardData, EventInfo, LogLine, OwnerRef, PodInfo,
    PodMetrics, RelatedResources, ResourceType, WorkloadInfo,
};

pub const LOG_TAIL_LINES: i64 = 200;

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    explicit_context: Option<String>,
    default_namespace: String,
}

/// Options for a single-container log request.
#[derive(Debug, Clone, Copy)]
pub struct LogOptions<'a> {
    pub container: Option<&'a str>,
    pub tail_lines: i64,
    pub timestamps: bool,
    pub previous: bool,
}

impl Default for LogOptions<'_> {
    fn default() -> Self {
        Self {
            container: None,
            tail_lines: LOG_TAIL_LINES,
            timestamps: true,
            previous: false,
        }
    }
}

impl KubeGateway {
    pub async fn new(context: Option<String>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read().ok();

        let config = if let Some(kubeconfig_value) = kubeconfig.clone() {
            let options = KubeConfigOptions {
                context: context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig_value, &options)
                .await
                .context("failed to infer Kubernetes configuration")?
        } else {
            if context.is_some() {
                anyhow::bail!("kubeconfig not found; --context cannot be used in this environment");
            }
            Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?
        };

        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;

        let active_context = context
            .clone()
            .or_else(|| {
                kubeconfig
                    .as_ref()
                    .and_then(|cfg| cfg.current_context.clone())
            })
            .unwrap_or_else(|| "in-cluster".to_string());
        debug!("connected using context {active_context}");

        Ok(Self {
            client,
            context: active_context,
            explicit_context: context,
            default_namespace,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    pub async fn list_namespaces(&self) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api
            .list(&list_params())
            .await
            .context("failed to list namespaces")?;
        let mut names = list
            .into_iter()
            .map(|namespace| namespace.name_any())
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    pub async fn list_workloads(
        &self,
        namespace: &str,
        resource_type: ResourceType,
    ) -> Result<Vec<WorkloadInfo>> {
        let mut workloads = match resource_type {
            ResourceType::Deployments => self.fetch_deployments(namespace).await,
            ResourceType::StatefulSets => self.fetch_statefulsets(namespace).await,
            ResourceType::DaemonSets => self.fetch_daemonsets(namespace).await,
            ResourceType::ReplicaSets => self.fetch_replicasets(namespace).await,
            ResourceType::Jobs => self.fetch_jobs(namespace).await,
            ResourceType::CronJobs => self.fetch_cronjobs(namespace).await,
        }
        .with_context(|| format!("failed to list {} in '{namespace}'", resource_type.title()))?;

        workloads.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(workloads)
    }

    /// Pods selected by the workload's label selector. CronJobs own no pods
    /// directly, so their pods are found through the Jobs they created.
    pub async fn workload_pods(&self, workload: &WorkloadInfo) -> Result<Vec<PodInfo>> {
        let namespace = workload.namespace.as_str();
        let selector = if workload.resource_type == ResourceType::CronJobs {
            let jobs = self.cronjob_job_names(namespace, &workload.name).await?;
            if jobs.is_empty() {
                return Ok(Vec::new());
            }
            format!("job-name in ({})", jobs.join(","))
        } else {
            if workload.selector.is_empty() {
                warn!("{} {} has no selector", workload.resource_type, workload.name);
                return Ok(Vec::new());
            }
            selector_query(&workload.selector)
        };

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&list_params().labels(&selector))
            .await
            .with_context(|| format!("failed to list pods for {namespace}/{}", workload.name))?;
        let mut pods = list.items.iter().map(pod_info).collect::<Vec<_>>();
        pods.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(pods)
    }

    pub async fn get_pod(&self, namespace: &str, pod_name: &str) -> Result<PodInfo> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = pods
            .get(pod_name)
            .await
            .with_context(|| format!("failed to fetch pod {namespace}/{pod_name}"))?;
        Ok(pod_info(&pod))
    }

    pub async fn pod_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        options: LogOptions<'_>,
    ) -> Result<Vec<LogLine>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: options.container.map(str::to_string),
            previous: options.previous,
            tail_lines: Some(options.tail_lines),
            timestamps: options.timestamps,
            ..LogParams::default()
        };

        let logs = pods
            .logs(pod_name, &params)
            .await
            .with_context(|| format!("failed to load logs for {namespace}/{pod_name}"))?;

        Ok(parse_log_output(&logs, options.container.unwrap_or_default()))
    }

    pub async fn previous_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        container: &str,
        tail_lines: i64,
    ) -> Result<Vec<LogLine>> {
        self.pod_logs(
            namespace,
            pod_name,
            LogOptions {
                container: Some(container),
                tail_lines,
                previous: true,
                ..LogOptions::default()
            },
        )
        .await
    }

    /// Logs of every container merged by timestamp. A container whose logs
    /// cannot be read contributes one error line; the call fails only when
    /// no container could be read.
    pub async fn all_container_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        containers: &[String],
        tail_lines: i64,
        previous: bool,
    ) -> Result<Vec<LogLine>> {
        let mut results = Vec::with_capacity(containers.len());
        for container in containers {
            let lines = self
                .pod_logs(
                    namespace,
                    pod_name,
                    LogOptions {
                        container: Some(container),
                        tail_lines,
                        previous,
                        ..LogOptions::default()
                    },
                )
                .await;
            results.push((container.clone(), lines));
        }
        merge_container_logs(results)
    }

    /// Logs for the dashboard's current selection. A failure becomes a single
    /// error line instead of an error.
    pub async fn fetch_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        request: &LogRequest,
    ) -> Vec<LogLine> {
        let result = match request.container.as_deref() {
            Some(container) if request.previous => {
                self.previous_logs(namespace, pod_name, container, LOG_TAIL_LINES)
                    .await
            }
            Some(container) => {
                self.pod_logs(
                    namespace,
                    pod_name,
                    LogOptions {
                        container: Some(container),
                        ..LogOptions::default()
                    },
                )
                .await
            }
            None => {
                self.all_container_logs(
                    namespace,
                    pod_name,
                    &request.containers,
                    LOG_TAIL_LINES,
                    request.previous,
                )
                .await
            }
        };

        lines_or_fetch_error(result)
    }

    /// Events involving the pod, newest first.
    pub async fn pod_events(&self, namespace: &str, pod_name: &str) -> Result<Vec<EventInfo>> {
        let api: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        let params = list_params().fields(&format!("involvedObject.name={pod_name}"));
        let list = api
            .list(&params)
            .await
            .with_context(|| format!("failed to list events for {namespace}/{pod_name}"))?;

        let mut events = list
            .items
            .iter()
            .filter(|event| {
                event.involved_object.kind.as_deref() == Some("Pod")
                    && event.involved_object.name.as_deref() == Some(pod_name)
            })
            .map(|event| EventInfo {
                event_type: event.type_.clone().unwrap_or_else(|| "Normal".to_string()),
                reason: event.reason.clone().unwrap_or_default(),
                message: event.message.clone().unwrap_or_default(),
                count: event.count.unwrap_or(1),
                last_seen: event_timestamp(event),
            })
            .collect::<Vec<_>>();
        events.sort_by(|left, right| right.last_seen.cmp(&left.last_seen));
        Ok(events)
    }

    pub async fn pod_metrics(&self, namespace: &str, pod_name: &str) -> Result<Option<PodMetrics>> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "PodMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "pods");
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &resource);

        let metrics = api
            .get_opt(pod_name)
            .await
            .with_context(|| format!("failed to fetch metrics for {namespace}/{pod_name}"))?;
        Ok(metrics.map(|object| parse_pod_metrics(&object.data)))
    }

    pub async fn related_resources(&self, pod: &PodInfo) -> Result<RelatedResources> {
        let mut owners = Vec::new();
        for owner in &pod.owners {
            owners.push(format!("{}/{}", owner.kind, owner.name));
            if owner.kind == "ReplicaSet"
                && let Some(parent) = self.replicaset_owner(&pod.namespace, &owner.name).await?
            {
                owners.push(format!("{}/{}", parent.kind, parent.name));
            }
        }

        let services_api: Api<Service> = Api::namespaced(self.client.clone(), &pod.namespace);
        let services = services_api
            .list(&list_params())
            .await
            .with_context(|| format!("failed to list services in '{}'", pod.namespace))?;
        let mut services = services
            .items
            .iter()
            .filter(|service| service_selector_matches_labels(service, &pod.labels))
            .map(|service| service.name_any())
            .collect::<Vec<_>>();
        services.sort();

        Ok(RelatedResources {
            owners,
            services,
            config_maps: pod.config_maps.clone(),
            secrets: pod.secrets.clone(),
            claims: pod.claims.clone(),
        })
    }

    /// One dashboard refresh. Pod, events, metrics and related resources
    /// degrade to absent on failure; logs degrade to an error line.
    pub async fn load_dashboard(&self, pod: &PodInfo, request: &LogRequest) -> DashboardData {
        let namespace = pod.namespace.as_str();
        let (fresh_pod, logs, events, metrics, related) = tokio::join!(
            self.get_pod(namespace, &pod.name),
            self.fetch_logs(namespace, &pod.name, request),
            self.pod_events(namespace, &pod.name),
            self.pod_metrics(namespace, &pod.name),
            self.related_resources(pod),
        );

        DashboardData {
            pod: degrade(fresh_pod, "pod"),
            logs,
            events: degrade(events, "events").unwrap_or_default(),
            metrics: degrade(metrics, "metrics").flatten(),
            related: degrade(related, "related resources"),
        }
    }

    pub async fn delete_pod(&self, namespace: &str, pod_name: &str) -> Result<()> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let _ = pods
            .delete(pod_name, &DeleteParams::default())
            .await
            .with_context(|| format!("failed to delete pod {namespace}/{pod_name}"))?;
        Ok(())
    }

    pub async fn scale_workload(
        &self,
        namespace: &str,
        name: &str,
        resource_type: ResourceType,
        replicas: i32,
    ) -> Result<()> {
        let patch = serde_json::json!({ "spec": { "replicas": replicas } });
        let params = PatchParams::default();

        match resource_type {
            ResourceType::Deployments => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                let _ = api.patch(name, &params, &Patch::Merge(&patch)).await?;
            }
            ResourceType::StatefulSets => {
                let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
                let _ = api.patch(name, &params, &Patch::Merge(&patch)).await?;
            }
            _ => anyhow::bail!("scale is not supported for {}", resource_type.title()),
        }

        Ok(())
    }

    pub async fn restart_workload(
        &self,
        namespace: &str,
        name: &str,
        resource_type: ResourceType,
    ) -> Result<()> {
        let patch = serde_json::json!({
            "spec": {
                "template": {
                    "metadata": {
                        "annotations": {
                            "kubectl.kubernetes.io/restartedAt": Utc::now().to_rfc3339()
                        }
                    }
                }
            }
        });
        let params = PatchParams::default();

        match resource_type {
            ResourceType::Deployments => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                let _ = api.patch(name, &params, &Patch::Merge(&patch)).await?;
            }
            ResourceType::StatefulSets => {
                let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
                let _ = api.patch(name, &params, &Patch::Merge(&patch)).await?;
            }
            ResourceType::DaemonSets => {
                let api: Api<DaemonSet> = Api::namespaced(self.client.clone(), namespace);
                let _ = api.patch(name, &params, &Patch::Merge(&patch)).await?;
            }
            _ => anyhow::bail!("restart is not supported for {}", resource_type.title()),
        }

        Ok(())
    }

    pub async fn describe_pod(&self, namespace: &str, pod_name: &str) -> Result<String> {
        let mut cmd = self.kubectl();
        cmd.arg("describe")
            .arg("pod")
            .arg("-n")
            .arg(namespace)
            .arg(pod_name);
        run_captured(cmd, "describe")
            .await
            .with_context(|| format!("failed to describe pod {namespace}/{pod_name}"))
    }

    pub async fn exec_in_pod(
        &self,
        namespace: &str,
        pod_name: &str,
        container: Option<&str>,
        command: &[String],
    ) -> Result<String> {
        let mut cmd = self.kubectl();
        cmd.arg("exec").arg("-n").arg(namespace).arg(pod_name);
        if let Some(container) = container {
            cmd.arg("-c").arg(container);
        }
        cmd.arg("--").args(command);
        run_captured(cmd, "exec")
            .await
            .with_context(|| format!("failed to execute in {namespace}/{pod_name}"))
    }

    pub fn spawn_port_forward(
        &self,
        namespace: &str,
        pod_name: &str,
        local_port: u16,
        remote_port: u16,
    ) -> Result<(u32, Child)> {
        let child = self
            .kubectl()
            .arg("port-forward")
            .arg("-n")
            .arg(namespace)
            .arg(format!("pod/{pod_name}"))
            .arg(format!("{local_port}:{remote_port}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn port-forward for {namespace}/{pod_name}"))?;

        let pid = child
            .id()
            .context("failed to determine process id for kubectl port-forward")?;

        Ok((pid, child))
    }

    fn kubectl(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new("kubectl");
        if let Some(context) = &self.explicit_context {
            cmd.arg("--context").arg(context);
        }
        cmd
    }

    async fn replicaset_owner(&self, namespace: &str, name: &str) -> Result<Option<OwnerRef>> {
        let api: Api<ReplicaSet> = Api::namespaced(self.client.clone(), namespace);
        let Some(replicaset) = api
            .get_opt(name)
            .await
            .with_context(|| format!("failed to fetch replicaset {namespace}/{name}"))?
        else {
            return Ok(None);
        };
        Ok(owner_refs(&replicaset.metadata).into_iter().next())
    }

    async fn cronjob_job_names(&self, namespace: &str, cronjob: &str) -> Result<Vec<String>> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        let jobs = api
            .list(&list_params())
            .await
            .with_context(|| format!("failed to list jobs in '{namespace}'"))?;
        Ok(jobs
            .items
            .iter()
            .filter(|job| {
                owner_refs(&job.metadata)
                    .iter()
                    .any(|owner| owner.kind == "CronJob" && owner.name == cronjob)
            })
            .map(|job| job.name_any())
            .collect())
    }

    async fn fetch_deployments(&self, namespace: &str) -> Result<Vec<WorkloadInfo>> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&list_params()).await?;
        Ok(list
            .items
            .iter()
            .map(|deployment| {
                let spec = deployment.spec.as_ref();
                workload_info(
                    &deployment.metadata,
                    ResourceType::Deployments,
                    spec.and_then(|spec| spec.replicas).unwrap_or(1),
                    deployment
                        .status
                        .as_ref()
                        .and_then(|status| status.ready_replicas)
                        .unwrap_or(0),
                    spec.map(|spec| &spec.selector),
                )
            })
            .collect())
    }

    async fn fetch_statefulsets(&self, namespace: &str) -> Result<Vec<WorkloadInfo>> {
        let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&list_params()).await?;
        Ok(list
            .items
            .iter()
            .map(|statefulset| {
                let spec = statefulset.spec.as_ref();
                workload_info(
                    &statefulset.metadata,
                    ResourceType::StatefulSets,
                    spec.and_then(|spec| spec.replicas).unwrap_or(1),
                    statefulset
                        .status
                        .as_ref()
                        .and_then(|status| status.ready_replicas)
                        .unwrap_or(0),
                    spec.map(|spec| &spec.selector),
                )
            })
            .collect())
    }

    async fn fetch_daemonsets(&self, namespace: &str) -> Result<Vec<WorkloadInfo>> {
        let api: Api<DaemonSet> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&list_params()).await?;
        Ok(list
            .items
            .iter()
            .map(|daemonset| {
                let status = daemonset.status.as_ref();
                workload_info(
                    &daemonset.metadata,
                    ResourceType::DaemonSets,
                    status.map(|status| status.desired_number_scheduled).unwrap_or(0),
                    status.map(|status| status.number_ready).unwrap_or(0),
                    daemonset.spec.as_ref().map(|spec| &spec.selector),
                )
            })
            .collect())
    }

    async fn fetch_replicasets(&self, namespace: &str) -> Result<Vec<WorkloadInfo>> {
        let api: Api<ReplicaSet> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&list_params()).await?;
        Ok(list
            .items
            .iter()
            .map(|replicaset| {
                let spec = replicaset.spec.as_ref();
                workload_info(
                    &replicaset.metadata,
                    ResourceType::ReplicaSets,
                    spec.and_then(|spec| spec.replicas).unwrap_or(1),
                    replicaset
                        .status
                        .as_ref()
                        .and_then(|status| status.ready_replicas)
                        .unwrap_or(0),
                    spec.map(|spec| &spec.selector),
                )
            })
            .collect())
    }

    async fn fetch_jobs(&self, namespace: &str) -> Result<Vec<WorkloadInfo>> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&list_params()).await?;
        Ok(list
            .items
            .iter()
            .map(|job| {
                let spec = job.spec.as_ref();
                let mut info = workload_info(
                    &job.metadata,
                    ResourceType::Jobs,
                    spec.and_then(|spec| spec.completions).unwrap_or(1),
                    job.status
                        .as_ref()
                        .and_then(|status| status.succeeded)
                        .unwrap_or(0),
                    spec.and_then(|spec| spec.selector.as_ref()),
                );
                if info.selector.is_empty() {
                    info.selector
                        .insert("job-name".to_string(), info.name.clone());
                }
                info
            })
            .collect())
    }

    async fn fetch_cronjobs(&self, namespace: &str) -> Result<Vec<WorkloadInfo>> {
        let api: Api<CronJob> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&list_params()).await?;
        Ok(list
            .items
            .iter()
            .map(|cronjob| {
                let active = cronjob
                    .status
                    .as_ref()
                    .and_then(|status| status.active.as_ref())
                    .map(Vec::len)
                    .unwrap_or(0);
                let active = i32::try_from(active).unwrap_or(i32::MAX);
                workload_info(&cronjob.metadata, ResourceType::CronJobs, active, active, None)
            })
            .collect())
    }
}

fn workload_info(
    metadata: &ObjectMeta,
    resource_type: ResourceType,
    replicas: i32,
    ready: i32,
    selector: Option<&LabelSelector>,
) -> WorkloadInfo {
    WorkloadInfo {
        name: metadata.name.clone().unwrap_or_default(),
        namespace: metadata.namespace.clone().unwrap_or_default(),
        resource_type,
        replicas,
        ready,
        created: metadata
            .creation_timestamp
            .as_ref()
            .and_then(|time| chrono_time(time.0)),
        selector: selector
            .and_then(|selector| selector.match_labels.clone())
            .unwrap_or_default(),
    }
}

fn pod_info(pod: &Pod) -> PodInfo {
    let spec = pod.spec.as_ref();
    let statuses = pod
        .status
        .as_ref()
        .and_then(|status| status.container_statuses.as_deref())
        .unwrap_or(&[]);

    let containers = spec
        .map(|spec| spec.containers.as_slice())
        .unwrap_or(&[])
        .iter()
        .map(|container| {
            let status = statuses.iter().find(|status| status.name == container.name);
            let (state, reason) = status.map(container_state).unwrap_or_else(|| {
                ("Waiting".to_string(), None)
            });
            ContainerInfo {
                name: container.name.clone(),
                image: status
                    .map(|status| status.image.clone())
                    .or_else(|| container.image.clone())
                    .unwrap_or_default(),
                ready: status.is_some_and(|status| status.ready),
                restarts: status.map(|status| status.restart_count).unwrap_or(0),
                state,
                reason,
                last_terminated_reason: status.and_then(last_terminated_reason),
            }
        })
        .collect();

    let mut config_maps = Vec::new();
    let mut secrets = Vec::new();
    let mut claims = Vec::new();
    if let Some(spec) = spec {
        for volume in spec.volumes.as_deref().unwrap_or(&[]) {
            if let Some(source) = volume.config_map.as_ref() {
                push_ref(&mut config_maps, source.name.clone());
            }
            if let Some(source) = volume.secret.as_ref() {
                push_ref(&mut secrets, source.secret_name.clone());
            }
            if let Some(source) = volume.persistent_volume_claim.as_ref() {
                push_ref(&mut claims, source.claim_name.clone());
            }
        }
        for container in &spec.containers {
            for source in container.env_from.as_deref().unwrap_or(&[]) {
                if let Some(reference) = source.config_map_ref.as_ref() {
                    push_ref(&mut config_maps, reference.name.clone());
                }
                if let Some(reference) = source.secret_ref.as_ref() {
                    push_ref(&mut secrets, reference.name.clone());
                }
            }
        }
    }
    for names in [&mut config_maps, &mut secrets, &mut claims] {
        names.sort();
        names.dedup();
    }

    PodInfo {
        name: pod.name_any(),
        namespace: pod.namespace().unwrap_or_default(),
        phase: pod
            .status
            .as_ref()
            .and_then(|status| status.phase.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        node: spec.and_then(|spec| spec.node_name.clone()),
        created: pod
            .metadata
            .creation_timestamp
            .as_ref()
            .and_then(|time| chrono_time(time.0)),
        containers,
        labels: pod.metadata.labels.clone().unwrap_or_default(),
        owners: owner_refs(&pod.metadata),
        config_maps,
        secrets,
        claims,
    }
}

fn push_ref(names: &mut Vec<String>, name: impl Into<Option<String>>) {
    if let Some(name) = name.into().filter(|name| !name.is_empty()) {
        names.push(name);
    }
}

fn owner_refs(metadata: &ObjectMeta) -> Vec<OwnerRef> {
    metadata
        .owner_references
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .map(|owner| OwnerRef {
            kind: owner.kind.clone(),
            name: owner.name.clone(),
        })
        .collect()
}

fn container_state(container: &ContainerStatus) -> (String, Option<String>) {
    let non_empty = |reason: &Option<String>| reason.clone().filter(|value| !value.is_empty());

    if let Some(state) = container.state.as_ref() {
        if state.running.is_some() {
            return ("Running".to_string(), None);
        }
        if let Some(waiting) = state.waiting.as_ref() {
            return ("Waiting".to_string(), non_empty(&waiting.reason));
        }
        if let Some(terminated) = state.terminated.as_ref() {
            let reason =
                non_empty(&terminated.reason).or_else(|| Some(format!("Exit({})", terminated.exit_code)));
            return ("Terminated".to_string(), reason);
        }
    }

    ("Unknown".to_string(), None)
}

fn last_terminated_reason(container: &ContainerStatus) -> Option<String> {
    let terminated = container.last_state.as_ref()?.terminated.as_ref()?;
    terminated
        .reason
        .clone()
        .filter(|value| !value.is_empty())
        .or_else(|| Some(format!("Exit({})", terminated.exit_code)))
}

fn degrade<T>(result: Result<T>, what: &str) -> Option<T> {
    result
        .map_err(|error| warn!("dashboard {what} unavailable: {error:#}"))
        .ok()
}

async fn run_captured(mut cmd: TokioCommand, verb: &str) -> Result<String> {
    let output = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("failed to run kubectl {verb}"))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let rendered = if stderr.trim().is_empty() {
        stdout.to_string()
    } else if stdout.trim().is_empty() {
        format!("stderr:\n{stderr}")
    } else {
        format!("stdout:\n{stdout}\n\nstderr:\n{stderr}")
    };

    if output.status.success() {
        Ok(rendered)
    } else {
        Err(anyhow::anyhow!(
            "kubectl {verb} exited with {}\n{}",
            output.status,
            rendered.trim_end()
        ))
    }
}

/// Splits a `--timestamps` log line into its RFC 3339 prefix and content.
pub fn parse_log_line(raw: &str, container: &str) -> LogLine {
    let (timestamp, content) = match raw.split_once(' ') {
        Some((prefix, rest)) => match DateTime::parse_from_rfc3339(prefix) {
            Ok(timestamp) => (Some(timestamp.with_timezone(&Utc)), rest),
            Err(_) => (None, raw),
        },
        None => (None, raw),
    };

    LogLine {
        content: content.to_string(),
        timestamp,
        container: container.to_string(),
        is_error: contains_error_marker(content),
    }
}

fn merge_container_logs(results: Vec<(String, Result<Vec<LogLine>>)>) -> Result<Vec<LogLine>> {
    let total = results.len();
    let mut merged = Vec::new();
    let mut failures = Vec::new();
    for (container, result) in results {
        match result {
            Ok(lines) => merged.extend(lines),
            Err(error) => {
                debug!("logs unavailable for container {container}: {error:#}");
                failures.push((container, error));
            }
        }
    }

    if total > 0 && failures.len() == total {
        let (_, error) = failures.swap_remove(0);
        return Err(error);
    }
    for (container, error) in failures {
        let mut line = LogLine::fetch_error(&format!("{container}: {error:#}"));
        line.container = container;
        merged.push(line);
    }
    merged.sort_by(|left, right| left.timestamp.cmp(&right.timestamp));
    Ok(merged)
}

fn lines_or_fetch_error(result: Result<Vec<LogLine>>) -> Vec<LogLine> {
    result.unwrap_or_else(|error| vec![LogLine::fetch_error(&format!("{error:#}"))])
}

fn parse_log_output(text: &str, container: &str) -> Vec<LogLine> {
    text.lines()
        .filter(|line| !line.is_empty())
        .map(|line| parse_log_line(line, container))
        .collect()
}

fn parse_pod_metrics(data: &Value) -> PodMetrics {
    let containers = data
        .get("containers")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
        .iter()
        .map(|container| {
            let (cpu_millicores, memory_bytes) = container
                .get("usage")
                .map(parse_usage_from_value)
                .unwrap_or((0, 0));
            ContainerMetrics {
                name: container
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                cpu_millicores,
                memory_bytes,
            }
        })
        .collect();

    PodMetrics { containers }
}

fn parse_usage_from_value(value: &Value) -> (u64, u64) {
    let cpu = value
        .get("cpu")
        .and_then(Value::as_str)
        .and_then(parse_cpu_millicores)
        .unwrap_or(0);
    let memory = value
        .get("memory")
        .and_then(Value::as_str)
        .and_then(parse_memory_bytes)
        .unwrap_or(0);
    (cpu, memory)
}

fn parse_cpu_millicores(value: &str) -> Option<u64> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    let (number, multiplier) = if let Some(number) = raw.strip_suffix('m') {
        (number, 1.0)
    } else if let Some(number) = raw.strip_suffix('u') {
        (number, 0.001)
    } else if let Some(number) = raw.strip_suffix('n') {
        (number, 0.000001)
    } else {
        (raw, 1000.0)
    };

    let numeric = number.parse::<f64>().ok()?;
    let millicores = (numeric * multiplier).round();
    if !millicores.is_finite() || millicores < 0.0 {
        return None;
    }
    Some(millicores as u64)
}

fn parse_memory_bytes(value: &str) -> Option<u64> {
    const UNITS: [(&str, f64); 10] = [
        ("Ti", 1_099_511_627_776.0),
        ("Gi", 1_073_741_824.0),
        ("Mi", 1_048_576.0),
        ("Ki", 1_024.0),
        ("T", 1_000_000_000_000.0),
        ("G", 1_000_000_000.0),
        ("M", 1_000_000.0),
        ("K", 1_000.0),
        ("k", 1_000.0),
        ("", 1.0),
    ];

    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, multiplier)| {
            raw.strip_suffix(suffix)
                .filter(|number| number.parse::<f64>().is_ok())
                .map(|number| (number, *multiplier))
        })?;
    let bytes = (number.parse::<f64>().ok()? * multiplier).round();
    if !bytes.is_finite() || bytes < 0.0 {
        return None;
    }
    Some(bytes as u64)
}

fn list_params() -> ListParams {
    ListParams::default().limit(500)
}

fn selector_query(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn service_selector_matches_labels(service: &Service, labels: &BTreeMap<String, String>) -> bool {
    let Some(selector) = service
        .spec
        .as_ref()
        .and_then(|spec| spec.selector.as_ref())
    else {
        return false;
    };
    !selector.is_empty()
        && selector
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
}

fn event_timestamp(event: &Event) -> Option<DateTime<Utc>> {
    event
        .last_timestamp
        .as_ref()
        .map(|time| time.0)
        .or_else(|| event.event_time.as_ref().map(|time| time.0))
        .or_else(|| event.first_timestamp.as_ref().map(|time| time.0))
        .or_else(|| {
            event
                .metadata
                .creation_timestamp
                .as_ref()
                .map(|time| time.0)
        })
        .and_then(chrono_time)
}

fn chrono_time(timestamp: k8s_openapi::jiff::Timestamp) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(timestamp.subsec_nanosecond()).unwrap_or(0);
    DateTime::<Utc>::from_timestamp(timestamp.as_second(), nanos)
}

#[cfg(test)]
mod tests {
    use super::{
        lines_or_fetch_error, merge_container_logs, parse_cpu_millicores, parse_log_line,
        parse_log_output, parse_memory_bytes, parse_pod_metrics, selector_query,
        service_selector_matches_labels,
    };
    use chrono::{TimeZone, Utc};
    use k8s_openapi::api::core::v1::{Service, ServiceSpec};
    use std::collections::BTreeMap;

    #[test]
    fn log_line_splits_rfc3339_prefix() {
        let line = parse_log_line(
            "2024-05-01T12:30:45.123456789Z GET /healthz 200",
            "app",
        );
        assert_eq!(line.content, "GET /healthz 200");
        assert_eq!(line.container, "app");
        assert!(!line.is_error);
        let expected = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 45)
            .single()
            .map(|time| time + chrono::Duration::nanoseconds(123_456_789));
        assert_eq!(line.timestamp, expected);
    }

    #[test]
    fn log_line_without_timestamp_keeps_raw_text() {
        let line = parse_log_line("panic: runtime error", "app");
        assert_eq!(line.timestamp, None);
        assert_eq!(line.content, "panic: runtime error");
        assert!(line.is_error);
    }

    #[test]
    fn log_output_skips_blank_lines() {
        let text = "2024-05-01T12:00:00Z one\n\n2024-05-01T12:00:01Z FATAL two\n";
        let lines = parse_log_output(text, "");
        assert_eq!(lines.len(), 2);
        assert!(lines[1].is_error);
    }

    #[test]
    fn parses_cpu_units() {
        assert_eq!(parse_cpu_millicores("250m"), Some(250));
        assert_eq!(parse_cpu_millicores("2"), Some(2000));
        assert_eq!(parse_cpu_millicores("1500000n"), Some(2));
        assert_eq!(parse_cpu_millicores(""), None);
    }

    #[test]
    fn parses_memory_units() {
        assert_eq!(parse_memory_bytes("128Mi"), Some(134_217_728));
        assert_eq!(parse_memory_bytes("1G"), Some(1_000_000_000));
        assert_eq!(parse_memory_bytes("2048"), Some(2048));
        assert_eq!(parse_memory_bytes("lots"), None);
    }

    #[test]
    fn pod_metrics_keep_per_container_usage() {
        let data = serde_json::json!({
            "containers": [
                { "name": "app", "usage": { "cpu": "120m", "memory": "64Mi" } },
                { "name": "sidecar", "usage": { "cpu": "5m", "memory": "8Mi" } }
            ]
        });
        let metrics = parse_pod_metrics(&data);
        assert_eq!(metrics.containers.len(), 2);
        assert_eq!(metrics.cpu_millicores(), 125);
        assert_eq!(metrics.memory_bytes(), 72 * 1_048_576);
    }

    #[test]
    fn selector_query_joins_sorted_pairs() {
        let selector = BTreeMap::from([
            ("tier".to_string(), "web".to_string()),
            ("app".to_string(), "api".to_string()),
        ]);
        assert_eq!(selector_query(&selector), "app=api,tier=web");
    }

    #[test]
    fn service_selector_must_be_subset_of_labels() {
        let service = Service {
            spec: Some(ServiceSpec {
                selector: Some(BTreeMap::from([("app".to_string(), "api".to_string())])),
                ..ServiceSpec::default()
            }),
            ..Service::default()
        };
        let labels = BTreeMap::from([
            ("app".to_string(), "api".to_string()),
            ("pod-template-hash".to_string(), "abc".to_string()),
        ]);
        assert!(service_selector_matches_labels(&service, &labels));
        assert!(!service_selector_matches_labels(&service, &BTreeMap::new()));
        assert!(!service_selector_matches_labels(&Service::default(), &labels));
    }

    #[test]
    fn merged_logs_keep_healthy_containers_when_one_fails() {
        let app = parse_log_output(
            "2024-05-01T12:00:02Z second\n2024-05-01T12:00:00Z first\n",
            "app",
        );
        let merged = merge_container_logs(vec![
            ("app".to_string(), Ok(app)),
            (
                "sidecar".to_string(),
                Err(anyhow::anyhow!("previous terminated container not found")),
            ),
        ])
        .unwrap();

        let app_lines = merged
            .iter()
            .filter(|line| !line.is_error)
            .map(|line| line.content.as_str())
            .collect::<Vec<_>>();
        assert_eq!(app_lines, vec!["first", "second"]);

        let errors = merged.iter().filter(|line| line.is_error).collect::<Vec<_>>();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].container, "sidecar");
        assert!(errors[0].content.contains("previous terminated container not found"));
    }

    #[test]
    fn merged_logs_fail_only_when_every_container_fails() {
        let result = merge_container_logs(vec![
            ("app".to_string(), Err(anyhow::anyhow!("waiting to start"))),
            ("sidecar".to_string(), Err(anyhow::anyhow!("waiting to start"))),
        ]);
        assert!(result.is_err());
        assert!(merge_container_logs(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn failed_fetch_becomes_one_error_line() {
        let lines = lines_or_fetch_error(Err(anyhow::anyhow!("pods \"api-0\" not found")));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_error);
        assert_eq!(lines[0].content, "Error fetching logs: pods \"api-0\" not found");

        let ok = parse_log_output("2024-05-01T12:00:00Z ready\n", "app");
        assert_eq!(lines_or_fetch_error(Ok(ok.clone())), ok);
    }
}
