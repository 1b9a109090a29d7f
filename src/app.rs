use crate::config::AppConfig;
use crate::dashboard::Dashboard;
use crate::input::{GlobalAction, is_ctrl_c, map_global_key};
use crate::message::{AppMessage, Command, ConfirmAction, WorkloadAction};
use crate::model::{PodInfo, ResourceType, WorkloadInfo};
use crate::navigator::{Navigator, NavigatorMode};
use crate::overlay::{
    ActionMenu, ConfirmDialog, HelpPanel, KeyRoute, MenuAction, OverlayKind, active_overlay,
    dispatch_key, scale_actions,
};
use crossterm::event::{KeyCode, KeyEvent};
use tracing::{debug, info, warn};

/// Rows the navigator loses to the header, table header and footer.
const NAVIGATOR_CHROME_ROWS: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Navigator,
    Dashboard,
}

/// The dashboard variant owns the selected pod, so a dashboard without a
/// pod cannot be represented.
#[derive(Debug)]
enum Screen {
    Navigator,
    Dashboard(Box<Dashboard>),
}

#[derive(Debug)]
pub struct App {
    running: bool,
    config: AppConfig,
    context: String,
    screen: Screen,
    navigator: Navigator,
    confirm: ConfirmDialog,
    action_menu: ActionMenu,
    help: HelpPanel,
    selected_workload: Option<WorkloadInfo>,
    fatal_error: Option<String>,
    status: Option<String>,
    loading: bool,
    width: u16,
    height: u16,
    dashboard_generation: u64,
    last_show_previous: bool,
    last_log_container: Option<String>,
    tick_pending: bool,
}

impl App {
    pub fn new(config: AppConfig, context: String) -> Self {
        let navigator = Navigator::new(config.last_namespace.clone(), config.last_resource_type);
        Self {
            running: true,
            config,
            context,
            screen: Screen::Navigator,
            navigator,
            confirm: ConfirmDialog::default(),
            action_menu: ActionMenu::default(),
            help: HelpPanel::default(),
            selected_workload: None,
            fatal_error: None,
            status: None,
            loading: false,
            width: 80,
            height: 24,
            dashboard_generation: 0,
            last_show_previous: false,
            last_log_container: None,
            tick_pending: false,
        }
    }

    /// Startup commands: the first list load and the refresh timer.
    pub fn init(&mut self) -> Vec<Command> {
        self.loading = true;
        vec![
            Command::LoadInitial {
                namespace: self.navigator.namespace().to_string(),
                resource_type: self.navigator.resource_type(),
            },
            self.schedule_tick(),
        ]
    }

    pub fn handle(&mut self, message: AppMessage) -> Vec<Command> {
        let mut commands = self.dispatch(message);
        commands.extend(self.sync_log_selection());
        commands
    }

    fn dispatch(&mut self, message: AppMessage) -> Vec<Command> {
        match message {
            AppMessage::Key(key) => self.handle_key(key),
            AppMessage::Resize { width, height } => {
                self.width = width;
                self.height = height;
                self.navigator
                    .set_height(usize::from(height.saturating_sub(NAVIGATOR_CHROME_ROWS)));
                if let Screen::Dashboard(dashboard) = &mut self.screen {
                    dashboard.set_size(width, height);
                }
                Vec::new()
            }
            AppMessage::Tick => {
                self.tick_pending = false;
                let mut commands = Vec::new();
                if let Screen::Dashboard(dashboard) = &self.screen {
                    commands.push(Command::LoadDashboard {
                        generation: self.dashboard_generation,
                        pod: dashboard.pod().clone(),
                        logs: dashboard.log_request(),
                    });
                }
                commands.push(self.schedule_tick());
                commands
            }
            AppMessage::WorkloadsLoaded { namespaces, result } => {
                self.loading = false;
                if let Some(namespaces) = namespaces {
                    self.navigator.set_namespaces(namespaces);
                }
                match result {
                    Ok(workloads) => {
                        debug!("loaded {} workloads", workloads.len());
                        self.fatal_error = None;
                        self.navigator.set_workloads(workloads);
                    }
                    Err(error) => {
                        warn!("workload load failed: {error}");
                        self.fatal_error = Some(error);
                    }
                }
                Vec::new()
            }
            AppMessage::PodsLoaded { workload, result } => {
                self.loading = false;
                let still_selected = self
                    .selected_workload
                    .as_ref()
                    .is_some_and(|selected| selected.name == workload);
                if !still_selected {
                    debug!("dropping pod list for {workload}; selection moved on");
                    return Vec::new();
                }
                match result {
                    Ok(pods) => {
                        self.fatal_error = None;
                        self.navigator.set_pods(pods);
                        if matches!(self.screen, Screen::Navigator) {
                            self.navigator.set_mode(NavigatorMode::Pods);
                        }
                    }
                    Err(error) => {
                        warn!("pod load failed for {workload}: {error}");
                        self.fatal_error = Some(error);
                    }
                }
                Vec::new()
            }
            AppMessage::DashboardLoaded { generation, data } => {
                self.loading = false;
                match &mut self.screen {
                    Screen::Dashboard(dashboard) if generation == self.dashboard_generation => {
                        dashboard.apply_data(data);
                    }
                    _ => debug!("dropping stale dashboard data (generation {generation})"),
                }
                Vec::new()
            }
            AppMessage::LogsRefreshed { generation, logs } => {
                self.loading = false;
                match &mut self.screen {
                    Screen::Dashboard(dashboard) if generation == self.dashboard_generation => {
                        dashboard.set_logs(logs);
                    }
                    _ => debug!("dropping stale logs (generation {generation})"),
                }
                Vec::new()
            }
            AppMessage::DeletePodRequest { namespace, pod } => {
                info!("deleting pod {namespace}/{pod}");
                self.loading = true;
                vec![Command::DeletePod { namespace, pod }]
            }
            AppMessage::PodDeleted { pod, result } => {
                self.loading = false;
                if let Err(error) = result {
                    self.notify(format!("Error: {error}"));
                    return Vec::new();
                }
                self.status = Some(format!("Deleted pod {pod}"));
                if matches!(self.screen, Screen::Dashboard(_)) {
                    self.leave_dashboard();
                }
                self.reload_navigator_list()
            }
            AppMessage::ActionCompleted {
                action,
                workload,
                result,
            } => {
                self.loading = false;
                if let Err(error) = result {
                    self.status = Some(format!("Error: {error}"));
                    return Vec::new();
                }
                self.status = Some(match action {
                    WorkloadAction::Scale { replicas } => {
                        format!("Scaled {workload} to {replicas} replicas")
                    }
                    WorkloadAction::Restart => format!("Restart initiated for {workload}"),
                });
                self.loading = true;
                vec![self.load_workloads()]
            }
            AppMessage::ConfirmResult { confirmed, action } => match action {
                ConfirmAction::Restart(workload) if confirmed => {
                    self.loading = true;
                    self.status = Some("Restarting...".to_string());
                    vec![Command::RestartWorkload { workload }]
                }
                action => match &mut self.screen {
                    Screen::Dashboard(dashboard) => dashboard.handle_confirm(confirmed, action),
                    Screen::Navigator => Vec::new(),
                },
            },
            AppMessage::ActionMenuResult(item) => match item.action {
                MenuAction::Scale { workload, replicas } => {
                    self.loading = true;
                    vec![Command::ScaleWorkload { workload, replicas }]
                }
                MenuAction::Copy { command } => vec![Command::CopyToClipboard {
                    text: command,
                    label: item.label,
                }],
            },
            AppMessage::ClipboardCopied { label, result } => {
                match result {
                    Ok(()) => self.notify(format!("Copied: {label}")),
                    Err(error) => self.notify(format!("Copy failed: {error}")),
                }
                Vec::new()
            }
            AppMessage::ExecFinished { title, result }
            | AppMessage::DescribeOutput { title, result } => {
                if let Screen::Dashboard(dashboard) = &mut self.screen {
                    dashboard.show_output(title, result);
                }
                Vec::new()
            }
            AppMessage::PortForwardStarted { target, result } => {
                match result {
                    Ok(pid) => self.notify(format!("Port-forward started {target} pid={pid}")),
                    Err(error) => self.notify(format!("Port-forward failed for {target}: {error}")),
                }
                Vec::new()
            }
            AppMessage::PortForwardExited { target, result } => {
                match result {
                    Ok(_) => self.notify(format!("Port-forward closed: {target}")),
                    Err(detail) => {
                        self.notify(format!("Port-forward exited ({detail}) for {target}"))
                    }
                }
                Vec::new()
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Command> {
        let route = dispatch_key(
            &mut [&mut self.confirm, &mut self.action_menu, &mut self.help],
            key,
        );
        if let KeyRoute::Consumed(message) = route {
            return message
                .map(|message| self.dispatch(message))
                .unwrap_or_default();
        }

        if matches!(self.screen, Screen::Navigator) {
            self.status = None;
            if self.navigator.is_searching() {
                if is_ctrl_c(key) {
                    self.running = false;
                } else if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                    self.navigator.close_search();
                } else {
                    self.navigator.handle_key(key);
                }
                return Vec::new();
            }
        }

        if let Screen::Dashboard(dashboard) = &mut self.screen
            && dashboard.is_capturing_input()
        {
            if is_ctrl_c(key) {
                self.running = false;
                return Vec::new();
            }
            return dashboard.handle_key(key);
        }

        match map_global_key(key) {
            Some(GlobalAction::Quit) => {
                self.running = false;
                Vec::new()
            }
            Some(GlobalAction::Help) => {
                self.help.toggle();
                Vec::new()
            }
            Some(GlobalAction::Refresh) => self.refresh(),
            Some(GlobalAction::Namespace) if matches!(self.screen, Screen::Navigator) => {
                self.navigator.set_mode(NavigatorMode::Namespace);
                Vec::new()
            }
            Some(GlobalAction::Back) => self.go_back(),
            Some(GlobalAction::Enter) if matches!(self.screen, Screen::Navigator) => {
                self.enter_selection()
            }
            Some(GlobalAction::ResourceType) if matches!(self.screen, Screen::Navigator) => {
                self.navigator.set_mode(NavigatorMode::ResourceType);
                Vec::new()
            }
            Some(GlobalAction::Scale) if self.workload_action_target(true).is_some() => {
                if let Some(workload) = self.workload_action_target(true) {
                    self.action_menu
                        .show(format!("Scale {}", workload.name), scale_actions(&workload));
                }
                Vec::new()
            }
            Some(GlobalAction::Restart) if self.workload_action_target(false).is_some() => {
                if let Some(workload) = self.workload_action_target(false) {
                    self.confirm.show(
                        format!("Restart {}", workload.resource_type.title()),
                        ConfirmAction::Restart(workload),
                    );
                }
                Vec::new()
            }
            _ => self.forward_key(key),
        }
    }

    fn forward_key(&mut self, key: KeyEvent) -> Vec<Command> {
        match &mut self.screen {
            Screen::Navigator => {
                self.navigator.handle_key(key);
                Vec::new()
            }
            Screen::Dashboard(dashboard) => dashboard.handle_key(key),
        }
    }

    /// The selected workload when a scale (or restart) action applies to it.
    fn workload_action_target(&self, scale: bool) -> Option<WorkloadInfo> {
        if !matches!(self.screen, Screen::Navigator)
            || self.navigator.mode() != NavigatorMode::Workloads
        {
            return None;
        }
        let resource_type = self.navigator.resource_type();
        let supported = if scale {
            resource_type.supports_scale()
        } else {
            resource_type.supports_restart()
        };
        if !supported {
            return None;
        }
        self.navigator.selected_workload().cloned()
    }

    fn refresh(&mut self) -> Vec<Command> {
        self.loading = true;
        match &self.screen {
            Screen::Dashboard(dashboard) => vec![Command::LoadDashboard {
                generation: self.dashboard_generation,
                pod: dashboard.pod().clone(),
                logs: dashboard.log_request(),
            }],
            Screen::Navigator => match (&self.selected_workload, self.navigator.list_mode()) {
                (Some(workload), NavigatorMode::Pods) => vec![Command::LoadPods {
                    workload: workload.clone(),
                }],
                _ => vec![self.load_workloads()],
            },
        }
    }

    fn go_back(&mut self) -> Vec<Command> {
        if matches!(self.screen, Screen::Dashboard(_)) {
            self.leave_dashboard();
            return Vec::new();
        }

        match self.navigator.mode() {
            NavigatorMode::Pods => {
                self.selected_workload = None;
                self.navigator.set_mode(NavigatorMode::Workloads);
                self.loading = true;
                vec![self.load_workloads()]
            }
            NavigatorMode::Namespace | NavigatorMode::ResourceType => {
                self.navigator.set_mode(NavigatorMode::Workloads);
                Vec::new()
            }
            NavigatorMode::Workloads | NavigatorMode::Search => Vec::new(),
        }
    }

    fn enter_selection(&mut self) -> Vec<Command> {
        match self.navigator.mode() {
            NavigatorMode::Workloads => {
                let Some(workload) = self.navigator.selected_workload().cloned() else {
                    return Vec::new();
                };
                debug!("loading pods for {}", workload.name);
                self.selected_workload = Some(workload.clone());
                self.loading = true;
                vec![Command::LoadPods { workload }]
            }
            NavigatorMode::Pods => match self.navigator.selected_pod().cloned() {
                Some(pod) => self.enter_dashboard(pod),
                None => Vec::new(),
            },
            NavigatorMode::Namespace => {
                let Some(namespace) = self.navigator.selected_namespace().map(str::to_string)
                else {
                    return Vec::new();
                };
                info!("switching namespace to {namespace}");
                self.navigator.set_namespace(namespace.clone());
                self.config.last_namespace = namespace;
                self.commit_list_change()
            }
            NavigatorMode::ResourceType => {
                let resource_type = self.navigator.selected_resource_type();
                self.navigator.set_resource_type(resource_type);
                self.config.last_resource_type = resource_type;
                self.commit_list_change()
            }
            NavigatorMode::Search => Vec::new(),
        }
    }

    fn commit_list_change(&mut self) -> Vec<Command> {
        self.selected_workload = None;
        self.navigator.set_mode(NavigatorMode::Workloads);
        self.loading = true;
        vec![
            Command::SaveConfig(self.config.clone()),
            self.load_workloads(),
        ]
    }

    fn enter_dashboard(&mut self, pod: PodInfo) -> Vec<Command> {
        self.dashboard_generation += 1;
        let workload = self
            .selected_workload
            .as_ref()
            .map(|workload| workload.name.as_str())
            .unwrap_or("-");
        let breadcrumb = format!(
            "{} > {} > {workload} > {}",
            pod.namespace,
            self.navigator.resource_type().title(),
            pod.name
        );
        let mut dashboard = Dashboard::new(pod, breadcrumb, self.context.clone(), self.height);
        dashboard.set_size(self.width, self.height);
        self.last_show_previous = dashboard.logs_show_previous();
        self.last_log_container = dashboard.logs_selected_container();

        let mut commands = vec![Command::LoadDashboard {
            generation: self.dashboard_generation,
            pod: dashboard.pod().clone(),
            logs: dashboard.log_request(),
        }];
        if !self.tick_pending {
            commands.push(self.schedule_tick());
        }
        self.screen = Screen::Dashboard(Box::new(dashboard));
        self.loading = true;
        commands
    }

    fn leave_dashboard(&mut self) {
        self.dashboard_generation += 1;
        self.screen = Screen::Navigator;
        let mode = if self.selected_workload.is_some() {
            NavigatorMode::Pods
        } else {
            NavigatorMode::Workloads
        };
        self.navigator.set_mode(mode);
    }

    fn reload_navigator_list(&mut self) -> Vec<Command> {
        self.loading = true;
        match self.selected_workload.clone() {
            Some(workload) => vec![Command::LoadPods { workload }],
            None => {
                self.navigator.set_mode(NavigatorMode::Workloads);
                vec![self.load_workloads()]
            }
        }
    }

    fn load_workloads(&self) -> Command {
        Command::LoadWorkloads {
            namespace: self.navigator.namespace().to_string(),
            resource_type: self.navigator.resource_type(),
        }
    }

    fn schedule_tick(&mut self) -> Command {
        self.tick_pending = true;
        Command::ScheduleTick(self.config.refresh_period())
    }

    /// Issues a log fetch when the previous-logs toggle or the container
    /// selection changed since the last look.
    fn sync_log_selection(&mut self) -> Vec<Command> {
        let Screen::Dashboard(dashboard) = &self.screen else {
            return Vec::new();
        };
        let show_previous = dashboard.logs_show_previous();
        let container = dashboard.logs_selected_container();
        if show_previous == self.last_show_previous && container == self.last_log_container {
            return Vec::new();
        }

        let command = Command::LoadLogs {
            generation: self.dashboard_generation,
            namespace: dashboard.pod().namespace.clone(),
            pod: dashboard.pod().name.clone(),
            logs: dashboard.log_request(),
        };
        self.last_show_previous = show_previous;
        self.last_log_container = container;
        vec![command]
    }

    fn notify(&mut self, text: String) {
        match &mut self.screen {
            Screen::Dashboard(dashboard) => dashboard.set_status(text),
            Screen::Navigator => self.status = Some(text),
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn view(&self) -> ViewState {
        match self.screen {
            Screen::Navigator => ViewState::Navigator,
            Screen::Dashboard(_) => ViewState::Dashboard,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn dashboard(&self) -> Option<&Dashboard> {
        match &self.screen {
            Screen::Dashboard(dashboard) => Some(dashboard),
            Screen::Navigator => None,
        }
    }

    pub fn selected_workload(&self) -> Option<&WorkloadInfo> {
        self.selected_workload.as_ref()
    }

    pub fn resource_type(&self) -> ResourceType {
        self.navigator.resource_type()
    }

    pub fn confirm(&self) -> &ConfirmDialog {
        &self.confirm
    }

    pub fn action_menu(&self) -> &ActionMenu {
        &self.action_menu
    }

    pub fn active_overlay(&self) -> Option<OverlayKind> {
        active_overlay(&[&self.confirm, &self.action_menu, &self.help])
    }

    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal_error.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }
}

#[cfg(test)]
mod tests {
    use super::{App, ViewState};
    use crate::config::AppConfig;
    use crate::dashboard::log_viewport_height;
    use crate::message::{AppMessage, Command, ConfirmAction, WorkloadAction};
    use crate::model::{ContainerInfo, DashboardData, LogLine, PodInfo, ResourceType, WorkloadInfo};
    use crate::navigator::NavigatorMode;
    use crate::overlay::{MenuAction, MenuItem, OverlayKind};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::time::Duration;

    fn app() -> App {
        let mut app = App::new(AppConfig::default(), "kind-dev".to_string());
        let _ = app.init();
        app
    }

    fn key(code: KeyCode) -> AppMessage {
        let modifiers = match code {
            KeyCode::Char(c) if c.is_ascii_uppercase() => KeyModifiers::SHIFT,
            _ => KeyModifiers::NONE,
        };
        AppMessage::Key(KeyEvent::new(code, modifiers))
    }

    fn char_key(c: char) -> AppMessage {
        key(KeyCode::Char(c))
    }

    fn workload(name: &str, replicas: i32) -> WorkloadInfo {
        WorkloadInfo {
            name: name.to_string(),
            namespace: "default".to_string(),
            resource_type: ResourceType::Deployments,
            replicas,
            ready: replicas,
            ..WorkloadInfo::default()
        }
    }

    fn pod(name: &str) -> PodInfo {
        PodInfo {
            name: name.to_string(),
            namespace: "default".to_string(),
            phase: "Running".to_string(),
            containers: vec![
                ContainerInfo {
                    name: "app".to_string(),
                    ready: true,
                    ..ContainerInfo::default()
                },
                ContainerInfo {
                    name: "sidecar".to_string(),
                    ready: true,
                    ..ContainerInfo::default()
                },
            ],
            ..PodInfo::default()
        }
    }

    fn with_workloads(app: &mut App, workloads: Vec<WorkloadInfo>) {
        app.handle(AppMessage::WorkloadsLoaded {
            namespaces: Some(vec!["default".to_string(), "prod".to_string()]),
            result: Ok(workloads),
        });
    }

    fn into_dashboard(app: &mut App) {
        with_workloads(app, vec![workload("api", 2)]);
        app.handle(key(KeyCode::Enter));
        app.handle(AppMessage::PodsLoaded {
            workload: "api".to_string(),
            result: Ok(vec![pod("api-abc")]),
        });
        app.handle(key(KeyCode::Enter));
        assert_eq!(app.view(), ViewState::Dashboard);
    }

    #[test]
    fn init_loads_saved_namespace_and_starts_tick() {
        let mut app = App::new(
            AppConfig {
                last_namespace: "prod".to_string(),
                last_resource_type: ResourceType::StatefulSets,
                refresh_interval: 7,
            },
            "kind-dev".to_string(),
        );
        assert_eq!(
            app.init(),
            vec![
                Command::LoadInitial {
                    namespace: "prod".to_string(),
                    resource_type: ResourceType::StatefulSets,
                },
                Command::ScheduleTick(Duration::from_secs(7)),
            ]
        );
        assert!(app.loading());
    }

    #[test]
    fn enter_on_workload_loads_its_pods() {
        let mut app = app();
        with_workloads(&mut app, vec![workload("api", 2)]);
        let commands = app.handle(key(KeyCode::Enter));
        assert_eq!(
            commands,
            vec![Command::LoadPods {
                workload: workload("api", 2)
            }]
        );

        app.handle(AppMessage::PodsLoaded {
            workload: "api".to_string(),
            result: Ok(vec![pod("api-abc")]),
        });
        assert_eq!(app.navigator().mode(), NavigatorMode::Pods);
        let names = app
            .navigator()
            .visible_pods()
            .into_iter()
            .map(|pod| pod.name.clone())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["api-abc"]);
        assert!(!app.loading());
    }

    #[test]
    fn entering_pod_opens_dashboard_with_fetch() {
        let mut app = app();
        with_workloads(&mut app, vec![workload("api", 2)]);
        app.handle(key(KeyCode::Enter));
        app.handle(AppMessage::PodsLoaded {
            workload: "api".to_string(),
            result: Ok(vec![pod("api-abc")]),
        });
        let commands = app.handle(key(KeyCode::Enter));
        assert_eq!(commands.len(), 1);
        assert!(matches!(
            &commands[0],
            Command::LoadDashboard { generation: 1, pod, logs }
                if pod.name == "api-abc" && logs.container.is_none() && !logs.previous
        ));
        let dashboard = app.dashboard().expect("dashboard");
        assert_eq!(dashboard.breadcrumb(), "default > Deployments > api > api-abc");
    }

    #[test]
    fn previous_toggle_triggers_single_log_fetch() {
        let mut app = app();
        into_dashboard(&mut app);
        let commands = app.handle(char_key('P'));
        assert_eq!(commands.len(), 1);
        assert!(matches!(
            &commands[0],
            Command::LoadLogs { logs, pod, .. } if logs.previous && pod == "api-abc"
        ));
        assert!(app.handle(AppMessage::Tick).iter().all(|command| !matches!(command, Command::LoadLogs { .. })));
    }

    #[test]
    fn container_cycle_triggers_log_fetch() {
        let mut app = app();
        into_dashboard(&mut app);
        let commands = app.handle(char_key(']'));
        assert!(matches!(
            commands.as_slice(),
            [Command::LoadLogs { logs, .. }] if logs.container.as_deref() == Some("app")
        ));
        assert!(app.handle(char_key('j')).is_empty());
    }

    #[test]
    fn tick_refreshes_only_the_dashboard() {
        let mut app = app();
        assert_eq!(
            app.handle(AppMessage::Tick),
            vec![Command::ScheduleTick(Duration::from_secs(5))]
        );
        into_dashboard(&mut app);
        let commands = app.handle(AppMessage::Tick);
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], Command::LoadDashboard { .. }));
        assert!(matches!(commands[1], Command::ScheduleTick(_)));
    }

    #[test]
    fn stale_dashboard_results_are_dropped() {
        let mut app = app();
        into_dashboard(&mut app);
        app.handle(key(KeyCode::Esc));
        assert_eq!(app.view(), ViewState::Navigator);
        assert_eq!(app.navigator().mode(), NavigatorMode::Pods);

        app.handle(key(KeyCode::Enter));
        let data = DashboardData {
            logs: vec![LogLine {
                content: "stale".to_string(),
                ..LogLine::default()
            }],
            ..DashboardData::default()
        };
        app.handle(AppMessage::DashboardLoaded {
            generation: 1,
            data: data.clone(),
        });
        assert_eq!(app.dashboard().map(|d| d.logs().log_count()), Some(0));
        assert!(!app.loading());

        app.handle(AppMessage::DashboardLoaded {
            generation: 3,
            data,
        });
        assert_eq!(app.dashboard().map(|d| d.logs().log_count()), Some(1));
    }

    #[test]
    fn back_from_pods_reloads_workloads() {
        let mut app = app();
        with_workloads(&mut app, vec![workload("api", 2)]);
        app.handle(key(KeyCode::Enter));
        app.handle(AppMessage::PodsLoaded {
            workload: "api".to_string(),
            result: Ok(vec![pod("api-abc")]),
        });
        let commands = app.handle(key(KeyCode::Esc));
        assert_eq!(
            commands,
            vec![Command::LoadWorkloads {
                namespace: "default".to_string(),
                resource_type: ResourceType::Deployments,
            }]
        );
        assert!(app.selected_workload().is_none());
        assert_eq!(app.navigator().mode(), NavigatorMode::Workloads);
    }

    #[test]
    fn namespace_pick_persists_and_reloads() {
        let mut app = app();
        with_workloads(&mut app, vec![workload("api", 2)]);
        app.handle(char_key('n'));
        assert_eq!(app.navigator().mode(), NavigatorMode::Namespace);
        app.handle(char_key('j'));
        let commands = app.handle(key(KeyCode::Enter));
        assert_eq!(commands.len(), 2);
        assert!(matches!(
            &commands[0],
            Command::SaveConfig(config) if config.last_namespace == "prod"
        ));
        assert_eq!(
            commands[1],
            Command::LoadWorkloads {
                namespace: "prod".to_string(),
                resource_type: ResourceType::Deployments,
            }
        );
        assert_eq!(app.navigator().mode(), NavigatorMode::Workloads);
    }

    #[test]
    fn picker_back_does_not_reload() {
        let mut app = app();
        app.handle(char_key('t'));
        assert_eq!(app.navigator().mode(), NavigatorMode::ResourceType);
        assert!(app.handle(key(KeyCode::Esc)).is_empty());
        assert_eq!(app.navigator().mode(), NavigatorMode::Workloads);
    }

    #[test]
    fn scale_opens_menu_only_for_scalable_types() {
        let mut app = app();
        with_workloads(&mut app, vec![workload("api", 2)]);
        app.handle(char_key('s'));
        assert_eq!(app.active_overlay(), Some(OverlayKind::ActionMenu));

        let mut app = App::new(
            AppConfig {
                last_resource_type: ResourceType::DaemonSets,
                ..AppConfig::default()
            },
            "kind-dev".to_string(),
        );
        with_workloads(&mut app, vec![workload("agent", 1)]);
        app.handle(char_key('s'));
        assert_eq!(app.active_overlay(), None);
        app.handle(char_key('R'));
        assert_eq!(app.active_overlay(), Some(OverlayKind::Confirm));
    }

    #[test]
    fn confirmed_restart_issues_restart_then_reloads() {
        let mut app = app();
        with_workloads(&mut app, vec![workload("api", 2)]);
        app.handle(char_key('R'));
        let commands = app.handle(char_key('y'));
        assert_eq!(
            commands,
            vec![Command::RestartWorkload {
                workload: workload("api", 2)
            }]
        );
        assert_eq!(app.status(), Some("Restarting..."));

        let commands = app.handle(AppMessage::ActionCompleted {
            action: WorkloadAction::Restart,
            workload: "api".to_string(),
            result: Ok(()),
        });
        assert_eq!(app.status(), Some("Restart initiated for api"));
        assert!(matches!(commands.as_slice(), [Command::LoadWorkloads { .. }]));
    }

    #[test]
    fn failed_action_reports_status_not_fatal() {
        let mut app = app();
        app.handle(AppMessage::ActionCompleted {
            action: WorkloadAction::Scale { replicas: 3 },
            workload: "api".to_string(),
            result: Err("forbidden".to_string()),
        });
        assert_eq!(app.status(), Some("Error: forbidden"));
        assert!(app.fatal_error().is_none());

        app.handle(char_key('j'));
        assert_eq!(app.status(), None);
    }

    #[test]
    fn overlay_swallows_keys_before_globals() {
        let mut app = app();
        with_workloads(&mut app, vec![workload("api", 2)]);
        app.handle(char_key('?'));
        assert_eq!(app.active_overlay(), Some(OverlayKind::Help));
        app.handle(char_key('q'));
        assert!(app.running());
        app.handle(char_key('?'));
        assert_eq!(app.active_overlay(), None);
        app.handle(char_key('q'));
        assert!(!app.running());
    }

    #[test]
    fn search_keeps_global_keys_as_text() {
        let mut app = app();
        with_workloads(&mut app, vec![workload("api", 2), workload("queue", 1)]);
        app.handle(char_key('/'));
        app.handle(char_key('q'));
        assert!(app.running());
        assert_eq!(app.navigator().query(), "q");
        app.handle(key(KeyCode::Enter));
        assert!(!app.navigator().is_searching());
        assert_eq!(app.navigator().visible_workloads().len(), 1);
    }

    #[test]
    fn ctrl_c_quits_while_searching() {
        let mut app = app();
        with_workloads(&mut app, vec![workload("api", 2)]);
        app.handle(char_key('/'));
        assert!(app.navigator().is_searching());
        app.handle(AppMessage::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )));
        assert!(!app.running());
    }

    #[test]
    fn resize_sets_navigator_page_size() {
        let mut app = app();
        let workloads = (0..30)
            .map(|index| workload(&format!("w{index:02}"), 1))
            .collect::<Vec<_>>();
        with_workloads(&mut app, workloads);

        assert!(app.handle(AppMessage::Resize { width: 80, height: 15 }).is_empty());
        app.handle(key(KeyCode::PageDown));
        assert_eq!(
            app.navigator().selected_workload().map(|w| w.name.as_str()),
            Some("w10")
        );

        app.handle(AppMessage::Resize { width: 80, height: 25 });
        app.handle(key(KeyCode::PageDown));
        assert_eq!(
            app.navigator().selected_workload().map(|w| w.name.as_str()),
            Some("w29")
        );
    }

    #[test]
    fn resize_sets_dashboard_log_viewport() {
        let mut app = app();
        into_dashboard(&mut app);
        app.handle(AppMessage::Resize { width: 120, height: 40 });
        let logs = (0..200)
            .map(|index| LogLine {
                content: format!("line {index}"),
                timestamp: None,
                container: "app".to_string(),
                is_error: false,
            })
            .collect::<Vec<_>>();
        app.handle(AppMessage::LogsRefreshed { generation: 1, logs });
        let visible = |app: &App| app.dashboard().map(|d| d.logs().visible_lines().len());
        assert_eq!(visible(&app), Some(log_viewport_height(40)));

        app.handle(AppMessage::Resize { width: 120, height: 20 });
        assert_eq!(visible(&app), Some(log_viewport_height(20)));
        assert_ne!(log_viewport_height(40), log_viewport_height(20));
    }

    #[test]
    fn namespace_key_is_ignored_on_dashboard() {
        let mut app = app();
        into_dashboard(&mut app);
        app.handle(char_key('n'));
        assert_eq!(app.view(), ViewState::Dashboard);
        assert_ne!(app.navigator().mode(), NavigatorMode::Namespace);
    }

    #[test]
    fn menu_copy_goes_to_clipboard() {
        let mut app = app();
        let commands = app.handle(AppMessage::ActionMenuResult(MenuItem {
            label: "Copy scale command (3 replicas)".to_string(),
            action: MenuAction::Copy {
                command: "kubectl scale deployment/api -n default --replicas=3".to_string(),
            },
        }));
        assert_eq!(
            commands,
            vec![Command::CopyToClipboard {
                text: "kubectl scale deployment/api -n default --replicas=3".to_string(),
                label: "Copy scale command (3 replicas)".to_string(),
            }]
        );
        app.handle(AppMessage::ClipboardCopied {
            label: "scale".to_string(),
            result: Ok(()),
        });
        assert_eq!(app.status(), Some("Copied: scale"));
    }

    #[test]
    fn list_errors_are_fatal_until_next_success() {
        let mut app = app();
        app.handle(AppMessage::WorkloadsLoaded {
            namespaces: None,
            result: Err("connection refused".to_string()),
        });
        assert_eq!(app.fatal_error(), Some("connection refused"));
        let commands = app.handle(char_key('r'));
        assert!(matches!(commands.as_slice(), [Command::LoadWorkloads { .. }]));
        with_workloads(&mut app, Vec::new());
        assert!(app.fatal_error().is_none());
    }

    #[test]
    fn dashboard_delete_returns_to_pods() {
        let mut app = app();
        into_dashboard(&mut app);
        app.handle(char_key('D'));
        let commands = app.handle(char_key('y'));
        let Some(Command::Dispatch(confirm)) = commands.into_iter().next() else {
            panic!("expected confirm result");
        };
        let commands = app.handle(*confirm);
        let Some(Command::Dispatch(request)) = commands.into_iter().next() else {
            panic!("expected delete request");
        };
        assert_eq!(
            app.handle(*request),
            vec![Command::DeletePod {
                namespace: "default".to_string(),
                pod: "api-abc".to_string(),
            }]
        );

        let commands = app.handle(AppMessage::PodDeleted {
            pod: "api-abc".to_string(),
            result: Ok(()),
        });
        assert_eq!(app.view(), ViewState::Navigator);
        assert_eq!(
            commands,
            vec![Command::LoadPods {
                workload: workload("api", 2)
            }]
        );
    }

    #[test]
    fn declined_restart_is_ignored_in_navigator() {
        let mut app = app();
        let commands = app.handle(AppMessage::ConfirmResult {
            confirmed: false,
            action: ConfirmAction::Restart(workload("api", 2)),
        });
        assert!(commands.is_empty());
    }

    #[test]
    fn dashboard_search_captures_quit_key() {
        let mut app = app();
        into_dashboard(&mut app);
        app.handle(char_key('/'));
        app.handle(char_key('q'));
        assert!(app.running());
        assert_eq!(app.dashboard().map(|d| d.logs().filter().to_string()), Some("q".to_string()));
        app.handle(AppMessage::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )));
        assert!(!app.running());
    }
}
