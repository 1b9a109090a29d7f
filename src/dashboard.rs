use crate::analysis::analyze_pod_issues;
use crate::logs::LogsPanel;
use crate::message::{AppMessage, Command, ConfirmAction, LogRequest};
use crate::model::{
    DashboardData, DebugHelper, EventInfo, LogLine, PodInfo, PodMetrics, RelatedResources,
};
use crate::overlay::{
    ConfirmDialog, KeyRoute, ResultViewer, TextPrompt, active_overlay, dispatch_key,
};
use crossterm::event::{KeyCode, KeyEvent};

/// Rows taken by the header, footer and the pod summary strip.
const CHROME_ROWS: u16 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardFocus {
    Logs,
    Events,
    Related,
    Hints,
}

impl DashboardFocus {
    const ORDER: [Self; 4] = [Self::Logs, Self::Events, Self::Related, Self::Hints];

    fn step(self, forward: bool) -> Self {
        let index = Self::ORDER
            .iter()
            .position(|focus| *focus == self)
            .unwrap_or(0);
        let len = Self::ORDER.len();
        let next = if forward {
            (index + 1) % len
        } else {
            (index + len - 1) % len
        };
        Self::ORDER[next]
    }
}

/// Height of the log viewport for a terminal of the given height. The log
/// panel takes 60% of the body minus its border.
pub fn log_viewport_height(terminal_height: u16) -> usize {
    let body = u32::from(terminal_height.saturating_sub(CHROME_ROWS));
    ((body * 3 / 5).saturating_sub(2) as usize).max(1)
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pod: PodInfo,
    breadcrumb: String,
    context: String,
    logs: LogsPanel,
    events: Vec<EventInfo>,
    metrics: Option<PodMetrics>,
    related: Option<RelatedResources>,
    helpers: Vec<DebugHelper>,
    focus: DashboardFocus,
    panel_scroll: usize,
    confirm: ConfirmDialog,
    exec_prompt: TextPrompt,
    port_forward_prompt: TextPrompt,
    viewer: ResultViewer,
    status: Option<String>,
}

impl Dashboard {
    pub fn new(pod: PodInfo, breadcrumb: String, context: String, height: u16) -> Self {
        let mut logs = LogsPanel::default();
        logs.set_containers(pod.container_names());
        logs.set_height(log_viewport_height(height));
        let mut viewer = ResultViewer::default();
        viewer.set_height(usize::from(height.saturating_sub(8)));
        let helpers = analyze_pod_issues(&pod, &[]);

        Self {
            pod,
            breadcrumb,
            context,
            logs,
            events: Vec::new(),
            metrics: None,
            related: None,
            helpers,
            focus: DashboardFocus::Logs,
            panel_scroll: 0,
            confirm: ConfirmDialog::default(),
            exec_prompt: TextPrompt::default(),
            port_forward_prompt: TextPrompt::default(),
            viewer,
            status: None,
        }
    }

    pub fn set_size(&mut self, _width: u16, height: u16) {
        self.logs.set_height(log_viewport_height(height));
        self.viewer.set_height(usize::from(height.saturating_sub(8)));
    }

    pub fn log_request(&self) -> LogRequest {
        LogRequest {
            containers: self.pod.container_names(),
            container: self.logs.selected_container().map(str::to_string),
            previous: self.logs.show_previous(),
        }
    }

    pub fn apply_data(&mut self, data: DashboardData) {
        if let Some(pod) = data.pod {
            if pod.container_names() != self.pod.container_names() {
                self.logs.set_containers(pod.container_names());
            }
            self.pod = pod;
        }
        self.logs.set_logs(data.logs);
        self.events = data.events;
        self.metrics = data.metrics;
        self.related = data.related;
        self.helpers = analyze_pod_issues(&self.pod, &self.events);
    }

    pub fn set_logs(&mut self, logs: Vec<LogLine>) {
        self.logs.set_logs(logs);
    }

    pub fn has_active_overlay(&self) -> bool {
        active_overlay(&[
            &self.confirm,
            &self.exec_prompt,
            &self.port_forward_prompt,
            &self.viewer,
        ])
        .is_some()
    }

    /// True while keys must reach the dashboard before global bindings.
    pub fn is_capturing_input(&self) -> bool {
        self.has_active_overlay() || self.logs.is_searching()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Command> {
        let route = dispatch_key(
            &mut [
                &mut self.confirm,
                &mut self.exec_prompt,
                &mut self.port_forward_prompt,
                &mut self.viewer,
            ],
            key,
        );
        if let KeyRoute::Consumed(message) = route {
            self.collect_prompts();
            return message.map(Command::dispatch).into_iter().collect();
        }

        if self.logs.is_searching() {
            self.logs.handle_key(key);
            return Vec::new();
        }

        match key.code {
            KeyCode::Tab => {
                self.focus = self.focus.step(true);
                self.panel_scroll = 0;
                return Vec::new();
            }
            KeyCode::BackTab => {
                self.focus = self.focus.step(false);
                self.panel_scroll = 0;
                return Vec::new();
            }
            KeyCode::Char('x') => {
                self.exec_prompt.show(
                    format!("Exec in {}", self.pod.name),
                    "command to run, e.g. ls -la /",
                );
                return Vec::new();
            }
            KeyCode::Char('p') => {
                self.port_forward_prompt.show(
                    format!("Port forward {}", self.pod.name),
                    "local:remote, e.g. 8080:80",
                );
                return Vec::new();
            }
            KeyCode::Char('d') => {
                self.status = Some(format!("Describing {}…", self.pod.name));
                return vec![Command::DescribePod {
                    namespace: self.pod.namespace.clone(),
                    pod: self.pod.name.clone(),
                }];
            }
            KeyCode::Char('D') => {
                self.confirm.show(
                    "Delete Pod",
                    ConfirmAction::DeletePod {
                        namespace: self.pod.namespace.clone(),
                        pod: self.pod.name.clone(),
                    },
                );
                return Vec::new();
            }
            _ => {}
        }

        if self.focus == DashboardFocus::Logs {
            self.logs.handle_key(key);
        } else {
            match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    self.panel_scroll =
                        (self.panel_scroll + 1).min(self.panel_len().saturating_sub(1));
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    self.panel_scroll = self.panel_scroll.saturating_sub(1);
                }
                KeyCode::Char('g') => self.panel_scroll = 0,
                KeyCode::Char('G') => self.panel_scroll = self.panel_len().saturating_sub(1),
                _ => {}
            }
        }
        Vec::new()
    }

    pub fn handle_confirm(&mut self, confirmed: bool, action: ConfirmAction) -> Vec<Command> {
        if !confirmed {
            self.status = Some("Cancelled".to_string());
            return Vec::new();
        }

        match action {
            ConfirmAction::DeletePod { namespace, pod } => {
                self.status = Some(format!("Deleting {pod}…"));
                vec![Command::dispatch(AppMessage::DeletePodRequest {
                    namespace,
                    pod,
                })]
            }
            ConfirmAction::Exec {
                namespace,
                pod,
                container,
                command,
            } => {
                self.status = Some(format!("Running {}…", command.join(" ")));
                vec![Command::ExecInPod {
                    namespace,
                    pod,
                    container,
                    command,
                }]
            }
            ConfirmAction::PortForward {
                namespace,
                pod,
                local_port,
                remote_port,
            } => {
                self.status = Some(format!("Starting port-forward {local_port}:{remote_port}…"));
                vec![Command::StartPortForward {
                    namespace,
                    pod,
                    local_port,
                    remote_port,
                }]
            }
            ConfirmAction::Restart(_) => Vec::new(),
        }
    }

    pub fn show_output(&mut self, title: String, result: Result<String, String>) {
        self.status = None;
        match result {
            Ok(output) if output.trim().is_empty() => self.viewer.show(title, "(no output)"),
            Ok(output) => self.viewer.show(title, &output),
            Err(error) => self.viewer.show(title, &format!("Error: {error}")),
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    fn collect_prompts(&mut self) {
        if let Some(input) = self.exec_prompt.take_submitted() {
            let command = input
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>();
            let container = self
                .logs
                .selected_container()
                .or_else(|| self.pod.first_container())
                .map(str::to_string);
            self.confirm.show(
                "Exec",
                ConfirmAction::Exec {
                    namespace: self.pod.namespace.clone(),
                    pod: self.pod.name.clone(),
                    container,
                    command,
                },
            );
        }

        if let Some(input) = self.port_forward_prompt.take_submitted() {
            match parse_port_mapping(&input) {
                Some((local_port, remote_port)) => self.confirm.show(
                    "Port Forward",
                    ConfirmAction::PortForward {
                        namespace: self.pod.namespace.clone(),
                        pod: self.pod.name.clone(),
                        local_port,
                        remote_port,
                    },
                ),
                None => {
                    self.status = Some(format!("Invalid port mapping: {input}"));
                }
            }
        }
    }

    fn panel_len(&self) -> usize {
        match self.focus {
            DashboardFocus::Logs => self.logs.rendered().len(),
            DashboardFocus::Events => self.events.len(),
            DashboardFocus::Related => self
                .related
                .as_ref()
                .map(|related| related.lines().len())
                .unwrap_or(0),
            DashboardFocus::Hints => self.helpers.len(),
        }
    }

    pub fn pod(&self) -> &PodInfo {
        &self.pod
    }

    pub fn breadcrumb(&self) -> &str {
        &self.breadcrumb
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn logs(&self) -> &LogsPanel {
        &self.logs
    }

    pub fn logs_show_previous(&self) -> bool {
        self.logs.show_previous()
    }

    pub fn logs_selected_container(&self) -> Option<String> {
        self.logs.selected_container().map(str::to_string)
    }

    pub fn events(&self) -> &[EventInfo] {
        &self.events
    }

    pub fn metrics(&self) -> Option<&PodMetrics> {
        self.metrics.as_ref()
    }

    pub fn related(&self) -> Option<&RelatedResources> {
        self.related.as_ref()
    }

    pub fn helpers(&self) -> &[DebugHelper] {
        &self.helpers
    }

    pub fn focus(&self) -> DashboardFocus {
        self.focus
    }

    pub fn panel_scroll(&self) -> usize {
        self.panel_scroll
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn confirm(&self) -> &ConfirmDialog {
        &self.confirm
    }

    pub fn exec_prompt(&self) -> &TextPrompt {
        &self.exec_prompt
    }

    pub fn port_forward_prompt(&self) -> &TextPrompt {
        &self.port_forward_prompt
    }

    pub fn viewer(&self) -> &ResultViewer {
        &self.viewer
    }
}

/// Accepts `local:remote` or a single port used on both sides.
fn parse_port_mapping(input: &str) -> Option<(u16, u16)> {
    let input = input.trim();
    match input.split_once(':') {
        Some((local, remote)) => {
            let local = local.trim().parse::<u16>().ok()?;
            let remote = remote.trim().parse::<u16>().ok()?;
            (local > 0 && remote > 0).then_some((local, remote))
        }
        None => {
            let port = input.parse::<u16>().ok()?;
            (port > 0).then_some((port, port))
        }
    }
}
