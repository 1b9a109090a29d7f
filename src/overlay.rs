use crate::input::text_input_char;
use crate::message::{AppMessage, ConfirmAction};
use crate::model::WorkloadInfo;
use crossterm::event::{KeyCode, KeyEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Confirm,
    ActionMenu,
    Help,
    Prompt,
    ResultViewer,
}

impl OverlayKind {
    /// Lower slots win when several overlays are visible at once.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Confirm => 0,
            Self::ActionMenu => 1,
            Self::Help => 2,
            Self::Prompt => 3,
            Self::ResultViewer => 4,
        }
    }
}

/// A modal surface that owns keyboard input while visible.
pub trait Overlay {
    fn kind(&self) -> OverlayKind;
    fn is_visible(&self) -> bool;
    fn handle_key(&mut self, key: KeyEvent) -> Option<AppMessage>;
}

#[derive(Debug, PartialEq)]
pub enum KeyRoute {
    Consumed(Option<AppMessage>),
    PassThrough,
}

/// Hands the key to the highest-precedence visible overlay, if any.
pub fn dispatch_key(overlays: &mut [&mut dyn Overlay], key: KeyEvent) -> KeyRoute {
    overlays.sort_by_key(|overlay| overlay.kind().precedence());
    match overlays.iter_mut().find(|overlay| overlay.is_visible()) {
        Some(overlay) => KeyRoute::Consumed(overlay.handle_key(key)),
        None => KeyRoute::PassThrough,
    }
}

pub fn active_overlay(overlays: &[&dyn Overlay]) -> Option<OverlayKind> {
    overlays
        .iter()
        .filter(|overlay| overlay.is_visible())
        .map(|overlay| overlay.kind())
        .min_by_key(|kind| kind.precedence())
}

#[derive(Debug, Clone, Default)]
pub struct ConfirmDialog {
    visible: bool,
    title: String,
    action: Option<ConfirmAction>,
    yes_selected: bool,
}

impl ConfirmDialog {
    pub fn show(&mut self, title: impl Into<String>, action: ConfirmAction) {
        self.title = title.into();
        self.action = Some(action);
        self.yes_selected = false;
        self.visible = true;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn prompt(&self) -> String {
        self.action
            .as_ref()
            .map(ConfirmAction::prompt)
            .unwrap_or_default()
    }

    pub fn yes_selected(&self) -> bool {
        self.yes_selected
    }

    fn resolve(&mut self, confirmed: bool) -> Option<AppMessage> {
        self.visible = false;
        self.action
            .take()
            .map(|action| AppMessage::ConfirmResult { confirmed, action })
    }
}

impl Overlay for ConfirmDialog {
    fn kind(&self) -> OverlayKind {
        OverlayKind::Confirm
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<AppMessage> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => self.resolve(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.resolve(false),
            KeyCode::Enter => {
                let confirmed = self.yes_selected;
                self.resolve(confirmed)
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.yes_selected = true;
                None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.yes_selected = false;
                None
            }
            KeyCode::Tab => {
                self.yes_selected = !self.yes_selected;
                None
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    Scale {
        workload: WorkloadInfo,
        replicas: i32,
    },
    Copy {
        command: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub action: MenuAction,
}

/// Scale targets around the current replica count followed by
/// copyable kubectl equivalents.
pub fn scale_actions(workload: &WorkloadInfo) -> Vec<MenuItem> {
    let current = workload.replicas.max(0);
    let mut targets = vec![
        0,
        1,
        current.saturating_sub(1),
        current.saturating_add(1),
        current.saturating_mul(2),
    ];
    targets.retain(|target| *target >= 0 && *target != current);
    targets.sort_unstable();
    targets.dedup();

    let kind = workload.resource_type.kubectl_kind();
    let target = format!("{kind}/{}", workload.name);
    let mut items = targets
        .into_iter()
        .map(|replicas| MenuItem {
            label: format!("Scale to {replicas} (from {current})"),
            action: MenuAction::Scale {
                workload: workload.clone(),
                replicas,
            },
        })
        .collect::<Vec<_>>();

    let scale_up = current.saturating_add(1);
    items.push(MenuItem {
        label: format!("Copy scale command ({scale_up} replicas)"),
        action: MenuAction::Copy {
            command: format!(
                "kubectl scale {target} -n {} --replicas={scale_up}",
                workload.namespace
            ),
        },
    });
    items.push(MenuItem {
        label: "Copy rollout restart command".to_string(),
        action: MenuAction::Copy {
            command: format!("kubectl rollout restart {target} -n {}", workload.namespace),
        },
    });
    items
}

#[derive(Debug, Clone, Default)]
pub struct ActionMenu {
    visible: bool,
    title: String,
    items: Vec<MenuItem>,
    selected: usize,
}

impl ActionMenu {
    pub fn show(&mut self, title: impl Into<String>, items: Vec<MenuItem>) {
        self.title = title.into();
        self.items = items;
        self.selected = 0;
        self.visible = !self.items.is_empty();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn selected(&self) -> usize {
        self.selected
    }
}

impl Overlay for ActionMenu {
    fn kind(&self) -> OverlayKind {
        OverlayKind::ActionMenu
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<AppMessage> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.visible = false;
                None
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < self.items.len() {
                    self.selected += 1;
                }
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            KeyCode::Enter => {
                self.visible = false;
                self.items
                    .get(self.selected)
                    .cloned()
                    .map(AppMessage::ActionMenuResult)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HelpPanel {
    visible: bool,
}

impl HelpPanel {
    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }
}

impl Overlay for HelpPanel {
    fn kind(&self) -> OverlayKind {
        OverlayKind::Help
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<AppMessage> {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
            self.visible = false;
        }
        None
    }
}

/// Single-line editor. The owner collects the text with
/// [`TextPrompt::take_submitted`] after routing a key.
#[derive(Debug, Clone, Default)]
pub struct TextPrompt {
    visible: bool,
    title: String,
    hint: String,
    input: String,
    submitted: Option<String>,
}

impl TextPrompt {
    pub fn show(&mut self, title: impl Into<String>, hint: impl Into<String>) {
        self.title = title.into();
        self.hint = hint.into();
        self.input.clear();
        self.submitted = None;
        self.visible = true;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn hint(&self) -> &str {
        &self.hint
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn take_submitted(&mut self) -> Option<String> {
        self.submitted.take()
    }
}

impl Overlay for TextPrompt {
    fn kind(&self) -> OverlayKind {
        OverlayKind::Prompt
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<AppMessage> {
        match key.code {
            KeyCode::Esc => self.visible = false,
            KeyCode::Enter => {
                self.visible = false;
                let value = self.input.trim().to_string();
                if !value.is_empty() {
                    self.submitted = Some(value);
                }
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            _ => {
                if let Some(c) = text_input_char(key) {
                    self.input.push(c);
                }
            }
        }
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultViewer {
    visible: bool,
    title: String,
    lines: Vec<String>,
    scroll: usize,
    height: usize,
}

impl ResultViewer {
    pub fn show(&mut self, title: impl Into<String>, content: &str) {
        self.title = title.into();
        self.lines = content.lines().map(str::to_string).collect();
        self.scroll = 0;
        self.visible = true;
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
        self.scroll = self.scroll.min(self.max_scroll());
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    fn max_scroll(&self) -> usize {
        self.lines.len().saturating_sub(self.height.max(1))
    }
}

impl Overlay for ResultViewer {
    fn kind(&self) -> OverlayKind {
        OverlayKind::ResultViewer
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<AppMessage> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.visible = false,
            KeyCode::Char('j') | KeyCode::Down => {
                self.scroll = (self.scroll + 1).min(self.max_scroll());
            }
            KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::PageDown => {
                self.scroll = (self.scroll + self.height.max(1)).min(self.max_scroll());
            }
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(self.height.max(1)),
            KeyCode::Char('g') | KeyCode::Home => self.scroll = 0,
            KeyCode::Char('G') | KeyCode::End => self.scroll = self.max_scroll(),
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ActionMenu, ConfirmDialog, HelpPanel, KeyRoute, MenuAction, Overlay, OverlayKind,
        ResultViewer, TextPrompt, active_overlay, dispatch_key, scale_actions,
    };
    use crate::message::{AppMessage, ConfirmAction};
    use crate::model::{ResourceType, WorkloadInfo};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn delete_action() -> ConfirmAction {
        ConfirmAction::DeletePod {
            namespace: "default".to_string(),
            pod: "api-abc".to_string(),
        }
    }

    fn workload(replicas: i32) -> WorkloadInfo {
        WorkloadInfo {
            name: "api".to_string(),
            namespace: "prod".to_string(),
            resource_type: ResourceType::Deployments,
            replicas,
            ..WorkloadInfo::default()
        }
    }

    #[test]
    fn confirm_defaults_to_no_on_enter() {
        let mut dialog = ConfirmDialog::default();
        dialog.show("Delete", delete_action());
        let result = dialog.handle_key(press(KeyCode::Enter));
        assert_eq!(
            result,
            Some(AppMessage::ConfirmResult {
                confirmed: false,
                action: delete_action()
            })
        );
        assert!(!dialog.is_visible());
    }

    #[test]
    fn confirm_selection_follows_navigation_keys() {
        let mut dialog = ConfirmDialog::default();
        dialog.show("Delete", delete_action());
        assert_eq!(dialog.handle_key(press(KeyCode::Char('h'))), None);
        assert!(dialog.yes_selected());
        dialog.handle_key(press(KeyCode::Tab));
        assert!(!dialog.yes_selected());
        dialog.handle_key(press(KeyCode::Left));
        let result = dialog.handle_key(press(KeyCode::Enter));
        assert!(matches!(
            result,
            Some(AppMessage::ConfirmResult {
                confirmed: true,
                ..
            })
        ));
    }

    #[test]
    fn confirm_shortcuts_resolve_immediately() {
        let mut dialog = ConfirmDialog::default();
        dialog.show("Delete", delete_action());
        assert!(matches!(
            dialog.handle_key(KeyEvent::new(KeyCode::Char('Y'), KeyModifiers::SHIFT)),
            Some(AppMessage::ConfirmResult {
                confirmed: true,
                ..
            })
        ));
        dialog.show("Delete", delete_action());
        assert!(matches!(
            dialog.handle_key(press(KeyCode::Esc)),
            Some(AppMessage::ConfirmResult {
                confirmed: false,
                ..
            })
        ));
    }

    #[test]
    fn confirm_outranks_menu_and_help() {
        let mut confirm = ConfirmDialog::default();
        let mut menu = ActionMenu::default();
        let mut help = HelpPanel::default();
        help.toggle();
        menu.show("Scale api", scale_actions(&workload(2)));
        confirm.show("Delete", delete_action());

        assert_eq!(
            active_overlay(&[&help, &menu, &confirm]),
            Some(OverlayKind::Confirm)
        );
        let route = dispatch_key(&mut [&mut help, &mut menu, &mut confirm], press(KeyCode::Esc));
        assert!(matches!(route, KeyRoute::Consumed(Some(_))));
        assert!(!confirm.is_visible());
        assert!(menu.is_visible());
        assert!(help.is_visible());

        assert_eq!(
            active_overlay(&[&help, &menu, &confirm]),
            Some(OverlayKind::ActionMenu)
        );
    }

    #[test]
    fn help_swallows_unrelated_keys() {
        let mut help = HelpPanel::default();
        help.toggle();
        let route = dispatch_key(&mut [&mut help], press(KeyCode::Char('q')));
        assert_eq!(route, KeyRoute::Consumed(None));
        assert!(help.is_visible());
        dispatch_key(&mut [&mut help], press(KeyCode::Char('?')));
        assert!(!help.is_visible());
        let route = dispatch_key(&mut [&mut help], press(KeyCode::Char('q')));
        assert_eq!(route, KeyRoute::PassThrough);
    }

    #[test]
    fn scale_actions_skip_current_count() {
        let items = scale_actions(&workload(2));
        let targets = items
            .iter()
            .filter_map(|item| match &item.action {
                MenuAction::Scale { replicas, .. } => Some(*replicas),
                MenuAction::Copy { .. } => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(targets, vec![0, 1, 3, 4]);
        assert!(items.iter().any(|item| matches!(
            &item.action,
            MenuAction::Copy { command } if command == "kubectl scale deployment/api -n prod --replicas=3"
        )));
    }

    #[test]
    fn menu_enter_emits_selected_item() {
        let mut menu = ActionMenu::default();
        let items = scale_actions(&workload(1));
        menu.show("Scale api", items.clone());
        menu.handle_key(press(KeyCode::Char('j')));
        let result = menu.handle_key(press(KeyCode::Enter));
        assert_eq!(result, Some(AppMessage::ActionMenuResult(items[1].clone())));
        assert!(!menu.is_visible());
    }

    #[test]
    fn prompt_collects_text_on_enter() {
        let mut prompt = TextPrompt::default();
        prompt.show("Exec", "command");
        for c in "ls -la".chars() {
            prompt.handle_key(press(KeyCode::Char(c)));
        }
        prompt.handle_key(press(KeyCode::Backspace));
        prompt.handle_key(press(KeyCode::Enter));
        assert!(!prompt.is_visible());
        assert_eq!(prompt.take_submitted(), Some("ls -l".to_string()));
        assert_eq!(prompt.take_submitted(), None);
    }

    #[test]
    fn result_viewer_scrolls_and_closes() {
        let mut viewer = ResultViewer::default();
        viewer.set_height(2);
        viewer.show("Describe", "a\nb\nc\nd");
        viewer.handle_key(press(KeyCode::Char('G')));
        assert_eq!(viewer.scroll(), 2);
        viewer.handle_key(press(KeyCode::Char('g')));
        assert_eq!(viewer.scroll(), 0);
        viewer.handle_key(press(KeyCode::Char('q')));
        assert!(!viewer.is_visible());
    }
}
