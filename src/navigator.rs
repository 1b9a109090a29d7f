use crate::input::text_input_char;
use crate::model::{PodInfo, ResourceType, WorkloadInfo};
use crossterm::event::{KeyCode, KeyEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigatorMode {
    Workloads,
    Pods,
    Namespace,
    ResourceType,
    Search,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    mode: NavigatorMode,
    search_origin: NavigatorMode,
    query: String,
    namespace: String,
    resource_type: ResourceType,
    workloads: Vec<WorkloadInfo>,
    pods: Vec<PodInfo>,
    namespaces: Vec<String>,
    workload_cursor: usize,
    pod_cursor: usize,
    namespace_cursor: usize,
    type_cursor: usize,
    height: usize,
}

impl Navigator {
    pub fn new(namespace: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            mode: NavigatorMode::Workloads,
            search_origin: NavigatorMode::Workloads,
            query: String::new(),
            namespace: namespace.into(),
            resource_type,
            workloads: Vec::new(),
            pods: Vec::new(),
            namespaces: Vec::new(),
            workload_cursor: 0,
            pod_cursor: 0,
            namespace_cursor: 0,
            type_cursor: 0,
            height: 10,
        }
    }

    pub fn mode(&self) -> NavigatorMode {
        self.mode
    }

    /// The list on screen; during search this is the list being searched.
    pub fn list_mode(&self) -> NavigatorMode {
        if self.mode == NavigatorMode::Search {
            self.search_origin
        } else {
            self.mode
        }
    }

    pub fn set_mode(&mut self, mode: NavigatorMode) {
        if mode == NavigatorMode::Search {
            self.start_search();
            return;
        }

        if mode != self.list_mode() {
            self.query.clear();
        }
        self.mode = mode;
        match mode {
            NavigatorMode::Namespace => {
                self.namespace_cursor = self
                    .namespaces
                    .iter()
                    .position(|namespace| *namespace == self.namespace)
                    .unwrap_or(0);
            }
            NavigatorMode::ResourceType => {
                self.type_cursor = ResourceType::ALL
                    .iter()
                    .position(|kind| *kind == self.resource_type)
                    .unwrap_or(0);
            }
            _ => {}
        }
    }

    pub fn is_searching(&self) -> bool {
        self.mode == NavigatorMode::Search
    }

    pub fn start_search(&mut self) {
        if matches!(self.mode, NavigatorMode::Workloads | NavigatorMode::Pods) {
            self.search_origin = self.mode;
            self.mode = NavigatorMode::Search;
        }
    }

    /// Leaves search input; the query and its filtering stay in place.
    pub fn close_search(&mut self) {
        if self.mode == NavigatorMode::Search {
            self.mode = self.search_origin;
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
        self.reset_list_cursor();
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.namespace = namespace.into();
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn set_resource_type(&mut self, resource_type: ResourceType) {
        self.resource_type = resource_type;
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
    }

    pub fn set_workloads(&mut self, workloads: Vec<WorkloadInfo>) {
        self.workloads = workloads;
        self.workload_cursor = clamp_cursor(self.workload_cursor, self.visible_workloads().len());
    }

    pub fn set_pods(&mut self, pods: Vec<PodInfo>) {
        self.pods = pods;
        self.pod_cursor = clamp_cursor(self.pod_cursor, self.visible_pods().len());
    }

    pub fn set_namespaces(&mut self, namespaces: Vec<String>) {
        self.namespaces = namespaces;
        self.namespace_cursor = clamp_cursor(self.namespace_cursor, self.namespaces.len());
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn visible_workloads(&self) -> Vec<&WorkloadInfo> {
        let query = self.active_query(NavigatorMode::Workloads);
        self.workloads
            .iter()
            .filter(|workload| query.is_empty() || workload.matches_query(&query))
            .collect()
    }

    pub fn visible_pods(&self) -> Vec<&PodInfo> {
        let query = self.active_query(NavigatorMode::Pods);
        self.pods
            .iter()
            .filter(|pod| query.is_empty() || pod.matches_query(&query))
            .collect()
    }

    pub fn selected_workload(&self) -> Option<&WorkloadInfo> {
        self.visible_workloads().get(self.workload_cursor).copied()
    }

    pub fn selected_pod(&self) -> Option<&PodInfo> {
        self.visible_pods().get(self.pod_cursor).copied()
    }

    pub fn selected_namespace(&self) -> Option<&str> {
        self.namespaces
            .get(self.namespace_cursor)
            .map(String::as_str)
    }

    pub fn selected_resource_type(&self) -> ResourceType {
        ResourceType::ALL
            .get(self.type_cursor)
            .copied()
            .unwrap_or_default()
    }

    /// Cursor within the list currently on screen.
    pub fn cursor(&self) -> usize {
        match self.list_mode() {
            NavigatorMode::Workloads | NavigatorMode::Search => self.workload_cursor,
            NavigatorMode::Pods => self.pod_cursor,
            NavigatorMode::Namespace => self.namespace_cursor,
            NavigatorMode::ResourceType => self.type_cursor,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.is_searching() {
            match key.code {
                KeyCode::Backspace => {
                    self.query.pop();
                    self.reset_list_cursor();
                }
                _ => {
                    if let Some(c) = text_input_char(key) {
                        self.query.push(c);
                        self.reset_list_cursor();
                    }
                }
            }
            return;
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1),
            KeyCode::PageDown => self.move_cursor(self.height as isize),
            KeyCode::PageUp => self.move_cursor(-(self.height as isize)),
            KeyCode::Char('g') | KeyCode::Home => self.move_cursor(isize::MIN / 2),
            KeyCode::Char('G') | KeyCode::End => self.move_cursor(isize::MAX / 2),
            KeyCode::Char('/') => self.start_search(),
            KeyCode::Char('c') => self.clear_query(),
            _ => {}
        }
    }

    fn active_query(&self, list: NavigatorMode) -> String {
        if self.list_mode() == list {
            self.query.to_ascii_lowercase()
        } else {
            String::new()
        }
    }

    fn list_len(&self) -> usize {
        match self.list_mode() {
            NavigatorMode::Workloads | NavigatorMode::Search => self.visible_workloads().len(),
            NavigatorMode::Pods => self.visible_pods().len(),
            NavigatorMode::Namespace => self.namespaces.len(),
            NavigatorMode::ResourceType => ResourceType::ALL.len(),
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.list_len();
        let cursor = self.cursor();
        let next = if len == 0 {
            0
        } else {
            (cursor as isize)
                .saturating_add(delta)
                .clamp(0, len as isize - 1) as usize
        };
        match self.list_mode() {
            NavigatorMode::Workloads | NavigatorMode::Search => self.workload_cursor = next,
            NavigatorMode::Pods => self.pod_cursor = next,
            NavigatorMode::Namespace => self.namespace_cursor = next,
            NavigatorMode::ResourceType => self.type_cursor = next,
        }
    }

    fn reset_list_cursor(&mut self) {
        match self.list_mode() {
            NavigatorMode::Pods => self.pod_cursor = 0,
            _ => self.workload_cursor = 0,
        }
    }
}

fn clamp_cursor(cursor: usize, len: usize) -> usize {
    cursor.min(len.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::{Navigator, NavigatorMode};
    use crate::model::{PodInfo, ResourceType, WorkloadInfo};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn press(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn workloads(names: &[&str]) -> Vec<WorkloadInfo> {
        names
            .iter()
            .map(|name| WorkloadInfo {
                name: name.to_string(),
                namespace: "default".to_string(),
                ..WorkloadInfo::default()
            })
            .collect()
    }

    fn pods(names: &[&str]) -> Vec<PodInfo> {
        names
            .iter()
            .map(|name| PodInfo {
                name: name.to_string(),
                phase: "Running".to_string(),
                ..PodInfo::default()
            })
            .collect()
    }

    #[test]
    fn search_filters_live_and_survives_close() {
        let mut nav = Navigator::new("default", ResourceType::Deployments);
        nav.set_workloads(workloads(&["api", "worker", "api-gateway"]));
        nav.handle_key(press('/'));
        assert!(nav.is_searching());
        for c in "api".chars() {
            nav.handle_key(press(c));
        }
        assert_eq!(nav.visible_workloads().len(), 2);
        nav.close_search();
        assert_eq!(nav.mode(), NavigatorMode::Workloads);
        assert_eq!(nav.query(), "api");
        assert_eq!(nav.visible_workloads().len(), 2);

        nav.handle_key(press('c'));
        assert_eq!(nav.visible_workloads().len(), 3);
    }

    #[test]
    fn search_query_only_applies_to_its_list() {
        let mut nav = Navigator::new("default", ResourceType::Deployments);
        nav.set_workloads(workloads(&["api", "worker"]));
        nav.set_pods(pods(&["api-abc", "api-def"]));
        nav.set_mode(NavigatorMode::Pods);
        nav.set_mode(NavigatorMode::Search);
        nav.handle_key(press('d'));
        nav.handle_key(press('e'));
        assert_eq!(nav.visible_pods().len(), 1);
        assert_eq!(nav.visible_workloads().len(), 2);
    }

    #[test]
    fn switching_lists_clears_query() {
        let mut nav = Navigator::new("default", ResourceType::Deployments);
        nav.set_workloads(workloads(&["api", "worker"]));
        nav.set_mode(NavigatorMode::Search);
        nav.handle_key(press('w'));
        nav.close_search();
        nav.set_mode(NavigatorMode::Workloads);
        assert_eq!(nav.query(), "w");
        nav.set_mode(NavigatorMode::Pods);
        assert_eq!(nav.query(), "");
    }

    #[test]
    fn search_cannot_start_from_pickers() {
        let mut nav = Navigator::new("default", ResourceType::Deployments);
        nav.set_mode(NavigatorMode::Namespace);
        nav.handle_key(press('/'));
        assert_eq!(nav.mode(), NavigatorMode::Namespace);
    }

    #[test]
    fn pickers_open_on_current_value() {
        let mut nav = Navigator::new("kube-system", ResourceType::DaemonSets);
        nav.set_namespaces(vec![
            "default".to_string(),
            "kube-system".to_string(),
            "prod".to_string(),
        ]);
        nav.set_mode(NavigatorMode::Namespace);
        assert_eq!(nav.selected_namespace(), Some("kube-system"));
        nav.handle_key(press('j'));
        assert_eq!(nav.selected_namespace(), Some("prod"));
        nav.handle_key(press('j'));
        assert_eq!(nav.selected_namespace(), Some("prod"));

        nav.set_mode(NavigatorMode::ResourceType);
        assert_eq!(nav.selected_resource_type(), ResourceType::DaemonSets);
        nav.handle_key(press('g'));
        assert_eq!(nav.selected_resource_type(), ResourceType::Deployments);
    }

    #[test]
    fn replacing_list_clamps_cursor() {
        let mut nav = Navigator::new("default", ResourceType::Deployments);
        nav.set_workloads(workloads(&["a", "b", "c"]));
        nav.handle_key(press('G'));
        assert_eq!(nav.selected_workload().map(|w| w.name.as_str()), Some("c"));
        nav.set_workloads(workloads(&["a"]));
        assert_eq!(nav.selected_workload().map(|w| w.name.as_str()), Some("a"));
        nav.set_workloads(Vec::new());
        assert!(nav.selected_workload().is_none());
    }
}
