use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Persisted as its short token; any alias accepted by
/// [`ResourceType::from_token`] reads back.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum ResourceType {
    #[default]
    Deployments,
    StatefulSets,
    DaemonSets,
    ReplicaSets,
    Jobs,
    CronJobs,
}

impl ResourceType {
    pub const ALL: [Self; 6] = [
        Self::Deployments,
        Self::StatefulSets,
        Self::DaemonSets,
        Self::ReplicaSets,
        Self::Jobs,
        Self::CronJobs,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Deployments => "Deployments",
            Self::StatefulSets => "StatefulSets",
            Self::DaemonSets => "DaemonSets",
            Self::ReplicaSets => "ReplicaSets",
            Self::Jobs => "Jobs",
            Self::CronJobs => "CronJobs",
        }
    }

    /// Singular resource name as accepted by kubectl.
    pub fn kubectl_kind(self) -> &'static str {
        match self {
            Self::Deployments => "deployment",
            Self::StatefulSets => "statefulset",
            Self::DaemonSets => "daemonset",
            Self::ReplicaSets => "replicaset",
            Self::Jobs => "job",
            Self::CronJobs => "cronjob",
        }
    }

    pub fn short_token(self) -> &'static str {
        match self {
            Self::Deployments => "deploy",
            Self::StatefulSets => "sts",
            Self::DaemonSets => "ds",
            Self::ReplicaSets => "rs",
            Self::Jobs => "job",
            Self::CronJobs => "cj",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "deploy" | "deployment" | "deployments" | "dp" => Some(Self::Deployments),
            "sts" | "statefulset" | "statefulsets" | "stateful-set" | "stateful-sets" => {
                Some(Self::StatefulSets)
            }
            "ds" | "daemonset" | "daemonsets" | "daemon-set" | "daemon-sets" => {
                Some(Self::DaemonSets)
            }
            "rs" | "replicaset" | "replicasets" | "replica-set" | "replica-sets" => {
                Some(Self::ReplicaSets)
            }
            "job" | "jobs" => Some(Self::Jobs),
            "cj" | "cronjob" | "cronjobs" | "cron-job" | "cron-jobs" => Some(Self::CronJobs),
            _ => None,
        }
    }

    pub fn supports_scale(self) -> bool {
        matches!(self, Self::Deployments | Self::StatefulSets)
    }

    pub fn supports_restart(self) -> bool {
        matches!(
            self,
            Self::Deployments | Self::StatefulSets | Self::DaemonSets
        )
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.short_token())
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Self::from_token(&token)
            .ok_or_else(|| de::Error::custom(format!("unknown resource type '{token}'")))
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct WorkloadInfo {
    pub name: String,
    pub namespace: String,
    pub resource_type: ResourceType,
    pub replicas: i32,
    pub ready: i32,
    pub created: Option<DateTime<Utc>>,
    pub selector: BTreeMap<String, String>,
}

impl WorkloadInfo {
    pub fn ready_label(&self) -> String {
        format!("{}/{}", self.ready, self.replicas)
    }

    pub fn matches_query(&self, query_lower: &str) -> bool {
        self.name.to_ascii_lowercase().contains(query_lower)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ContainerInfo {
    pub name: String,
    pub image: String,
    pub ready: bool,
    pub restarts: i32,
    pub state: String,
    pub reason: Option<String>,
    pub last_terminated_reason: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub node: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub containers: Vec<ContainerInfo>,
    pub labels: BTreeMap<String, String>,
    pub owners: Vec<OwnerRef>,
    pub config_maps: Vec<String>,
    pub secrets: Vec<String>,
    pub claims: Vec<String>,
}

impl PodInfo {
    pub fn container_names(&self) -> Vec<String> {
        self.containers
            .iter()
            .map(|container| container.name.clone())
            .collect()
    }

    pub fn first_container(&self) -> Option<&str> {
        self.containers
            .first()
            .map(|container| container.name.as_str())
    }

    pub fn restarts(&self) -> i32 {
        self.containers
            .iter()
            .map(|container| container.restarts)
            .sum()
    }

    pub fn ready_label(&self) -> String {
        let ready = self
            .containers
            .iter()
            .filter(|container| container.ready)
            .count();
        format!("{ready}/{}", self.containers.len())
    }

    pub fn matches_query(&self, query_lower: &str) -> bool {
        self.name.to_ascii_lowercase().contains(query_lower)
            || self.phase.to_ascii_lowercase().contains(query_lower)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct LogLine {
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub container: String,
    pub is_error: bool,
}

impl LogLine {
    /// A synthetic line standing in for a failed log fetch.
    pub fn fetch_error(error: &str) -> Self {
        Self {
            content: format!("Error fetching logs: {error}"),
            timestamp: Some(Utc::now()),
            container: String::new(),
            is_error: true,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct EventInfo {
    pub event_type: String,
    pub reason: String,
    pub message: String,
    pub count: i32,
    pub last_seen: Option<DateTime<Utc>>,
}

impl EventInfo {
    pub fn is_warning(&self) -> bool {
        self.event_type.eq_ignore_ascii_case("warning")
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ContainerMetrics {
    pub name: String,
    pub cpu_millicores: u64,
    pub memory_bytes: u64,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct PodMetrics {
    pub containers: Vec<ContainerMetrics>,
}

impl PodMetrics {
    pub fn cpu_millicores(&self) -> u64 {
        self.containers
            .iter()
            .fold(0u64, |total, container| {
                total.saturating_add(container.cpu_millicores)
            })
    }

    pub fn memory_bytes(&self) -> u64 {
        self.containers
            .iter()
            .fold(0u64, |total, container| {
                total.saturating_add(container.memory_bytes)
            })
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct RelatedResources {
    pub owners: Vec<String>,
    pub services: Vec<String>,
    pub config_maps: Vec<String>,
    pub secrets: Vec<String>,
    pub claims: Vec<String>,
}

impl RelatedResources {
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
            && self.services.is_empty()
            && self.config_maps.is_empty()
            && self.secrets.is_empty()
            && self.claims.is_empty()
    }

    /// Flattened `Kind/name` rows in display order.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = self.owners.clone();
        lines.extend(self.services.iter().map(|name| format!("Service/{name}")));
        lines.extend(
            self.config_maps
                .iter()
                .map(|name| format!("ConfigMap/{name}")),
        );
        lines.extend(self.secrets.iter().map(|name| format!("Secret/{name}")));
        lines.extend(
            self.claims
                .iter()
                .map(|name| format!("PersistentVolumeClaim/{name}")),
        );
        lines
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DebugHelper {
    pub severity: Severity,
    pub title: String,
    pub detail: String,
    pub hint: Option<String>,
}

/// Everything the dashboard refreshes in one round trip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardData {
    pub pod: Option<PodInfo>,
    pub logs: Vec<LogLine>,
    pub events: Vec<EventInfo>,
    pub metrics: Option<PodMetrics>,
    pub related: Option<RelatedResources>,
}

pub fn human_age(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(timestamp) = timestamp else {
        return "-".to_string();
    };

    format_elapsed_seconds((now - timestamp).num_seconds().max(0))
}

pub fn format_elapsed_seconds(seconds: i64) -> String {
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }

    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }

    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }

    format!("{seconds}s")
}

pub fn format_cpu_millicores(value: u64) -> String {
    if value >= 1_000 {
        let cores = value as f64 / 1_000.0;
        format!("{cores:.2}c")
    } else {
        format!("{value}m")
    }
}

pub fn format_bytes(value: u64) -> String {
    const UNITS: [(&str, f64); 4] = [
        ("Ti", 1_099_511_627_776.0),
        ("Gi", 1_073_741_824.0),
        ("Mi", 1_048_576.0),
        ("Ki", 1_024.0),
    ];
    if value == 0 {
        return "0B".to_string();
    }

    let value_f64 = value as f64;
    for (suffix, unit_size) in UNITS {
        if value_f64 >= unit_size {
            return format!("{:.1}{suffix}", value_f64 / unit_size);
        }
    }
    format!("{value}B")
}
