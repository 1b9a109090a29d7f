use crate::config::AppConfig;
use crate::model::{DashboardData, LogLine, PodInfo, ResourceType, WorkloadInfo};
use crate::overlay::MenuItem;
use crossterm::event::KeyEvent;
use std::time::Duration;

/// Every input the application reacts to: terminal events, the refresh
/// timer, and the result of each background task.
#[derive(Debug, Clone, PartialEq)]
pub enum AppMessage {
    Key(KeyEvent),
    Resize {
        width: u16,
        height: u16,
    },
    Tick,
    WorkloadsLoaded {
        namespaces: Option<Vec<String>>,
        result: Result<Vec<WorkloadInfo>, String>,
    },
    PodsLoaded {
        workload: String,
        result: Result<Vec<PodInfo>, String>,
    },
    DashboardLoaded {
        generation: u64,
        data: DashboardData,
    },
    LogsRefreshed {
        generation: u64,
        logs: Vec<LogLine>,
    },
    DeletePodRequest {
        namespace: String,
        pod: String,
    },
    PodDeleted {
        pod: String,
        result: Result<(), String>,
    },
    ActionCompleted {
        action: WorkloadAction,
        workload: String,
        result: Result<(), String>,
    },
    ConfirmResult {
        confirmed: bool,
        action: ConfirmAction,
    },
    ActionMenuResult(MenuItem),
    ExecFinished {
        title: String,
        result: Result<String, String>,
    },
    DescribeOutput {
        title: String,
        result: Result<String, String>,
    },
    PortForwardStarted {
        target: String,
        result: Result<u32, String>,
    },
    PortForwardExited {
        target: String,
        result: Result<String, String>,
    },
    ClipboardCopied {
        label: String,
        result: Result<(), String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadAction {
    Scale { replicas: i32 },
    Restart,
}

/// What a confirmation dialog is asking about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    Restart(WorkloadInfo),
    DeletePod {
        namespace: String,
        pod: String,
    },
    Exec {
        namespace: String,
        pod: String,
        container: Option<String>,
        command: Vec<String>,
    },
    PortForward {
        namespace: String,
        pod: String,
        local_port: u16,
        remote_port: u16,
    },
}

impl ConfirmAction {
    pub fn prompt(&self) -> String {
        match self {
            Self::Restart(workload) => format!(
                "Restart {} {}/{}?",
                workload.resource_type.kubectl_kind(),
                workload.namespace,
                workload.name
            ),
            Self::DeletePod { namespace, pod } => format!("Delete pod {namespace}/{pod}?"),
            Self::Exec {
                pod, command, ..
            } => format!("Run `{}` in {pod}?", command.join(" ")),
            Self::PortForward {
                pod,
                local_port,
                remote_port,
                ..
            } => format!("Forward localhost:{local_port} to {pod}:{remote_port}?"),
        }
    }
}

/// Which log stream a fetch should read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogRequest {
    pub containers: Vec<String>,
    pub container: Option<String>,
    pub previous: bool,
}

/// Side effects requested by the state machine. Each one runs as a single
/// background task that answers with exactly one [`AppMessage`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadInitial {
        namespace: String,
        resource_type: ResourceType,
    },
    LoadWorkloads {
        namespace: String,
        resource_type: ResourceType,
    },
    LoadPods {
        workload: WorkloadInfo,
    },
    LoadDashboard {
        generation: u64,
        pod: PodInfo,
        logs: LogRequest,
    },
    LoadLogs {
        generation: u64,
        namespace: String,
        pod: String,
        logs: LogRequest,
    },
    DeletePod {
        namespace: String,
        pod: String,
    },
    ScaleWorkload {
        workload: WorkloadInfo,
        replicas: i32,
    },
    RestartWorkload {
        workload: WorkloadInfo,
    },
    ExecInPod {
        namespace: String,
        pod: String,
        container: Option<String>,
        command: Vec<String>,
    },
    DescribePod {
        namespace: String,
        pod: String,
    },
    StartPortForward {
        namespace: String,
        pod: String,
        local_port: u16,
        remote_port: u16,
    },
    CopyToClipboard {
        text: String,
        label: String,
    },
    ScheduleTick(Duration),
    SaveConfig(AppConfig),
    Dispatch(Box<AppMessage>),
}

impl Command {
    pub fn dispatch(message: AppMessage) -> Self {
        Self::Dispatch(Box::new(message))
    }
}

#[cfg(test)]
mod tests {
    use super::ConfirmAction;
    use crate::model::{ResourceType, WorkloadInfo};

    #[test]
    fn prompts_name_the_target() {
        let restart = ConfirmAction::Restart(WorkloadInfo {
            name: "api".to_string(),
            namespace: "prod".to_string(),
            resource_type: ResourceType::StatefulSets,
            ..WorkloadInfo::default()
        });
        assert_eq!(restart.prompt(), "Restart statefulset prod/api?");

        let exec = ConfirmAction::Exec {
            namespace: "prod".to_string(),
            pod: "api-0".to_string(),
            container: None,
            command: vec!["ls".to_string(), "-la".to_string()],
        };
        assert_eq!(exec.prompt(), "Run `ls -la` in api-0?");
    }
}
