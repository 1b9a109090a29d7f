use chrono::Utc;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, ViewState};
use crate::dashboard::{Dashboard, DashboardFocus};
use crate::input::GLOBAL_BINDINGS;
use crate::model::{
    ResourceType, Severity, format_bytes, format_cpu_millicores, human_age,
};
use crate::navigator::NavigatorMode;
use crate::overlay::{ActionMenu, ConfirmDialog, Overlay, OverlayKind, ResultViewer, TextPrompt};

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const SELECTED: Color = Color::Rgb(24, 36, 58);

const NAVIGATOR_HINTS: &str = "enter open  / search  c clear";
const DASHBOARD_HINTS: &str =
    "tab focus  / search  f follow  e error  P prev  [ ] container  T time  x exec  p fwd  d describe  D delete";

pub fn render(frame: &mut Frame, app: &App) {
    frame.render_widget(Block::default().style(Style::default().bg(BG)), frame.area());
    if let Some(error) = app.fatal_error() {
        render_fatal_error(frame, frame.area(), error);
        return;
    }

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    match (app.view(), app.dashboard()) {
        (ViewState::Dashboard, Some(dashboard)) => render_dashboard(frame, root[1], dashboard),
        _ => render_navigator(frame, root[1], app),
    }
    render_footer(frame, root[2], app);

    if let Some(dashboard) = app.dashboard() {
        render_viewer(frame, dashboard.viewer());
        render_prompt(frame, dashboard.exec_prompt());
        render_prompt(frame, dashboard.port_forward_prompt());
        render_confirm(frame, dashboard.confirm());
    }
    match app.active_overlay() {
        Some(OverlayKind::Confirm) => render_confirm(frame, app.confirm()),
        Some(OverlayKind::ActionMenu) => render_action_menu(frame, app.action_menu()),
        Some(OverlayKind::Help) => render_help_modal(frame, app),
        _ => {}
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " podscope ", Color::White, PL_A, PL_B);
    push_powerline_segment(
        &mut spans,
        format!(" {} ", compact_text(app.context(), 28)),
        Color::White,
        PL_B,
        PL_C,
    );
    let location = match app.dashboard() {
        Some(dashboard) => dashboard.breadcrumb().to_string(),
        None => format!(
            "{} > {}",
            app.navigator().namespace(),
            app.resource_type().title()
        ),
    };
    push_powerline_segment(
        &mut spans,
        format!(" {} ", compact_text(&location, 72)),
        Color::White,
        PL_C,
        BG,
    );

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(12)])
        .split(area);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG).fg(Color::White)),
        chunks[0],
    );
    if app.loading() {
        frame.render_widget(
            Paragraph::new("Loading… ")
                .alignment(Alignment::Right)
                .style(Style::default().bg(BG).fg(WARN)),
            chunks[1],
        );
    }
}

fn render_fatal_error(frame: &mut Frame, area: Rect, error: &str) {
    let text = Text::from(vec![
        Line::from(Span::styled(
            "Unable to load cluster data",
            Style::default().fg(ERROR).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(error.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "r retry  n namespace  q quit",
            Style::default().fg(MUTED),
        )),
    ]);
    let panel = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(panel_block("Error".to_string(), false).border_style(Style::default().fg(ERROR)))
        .style(Style::default().fg(Color::White));
    frame.render_widget(panel, area);
}

fn render_navigator(frame: &mut Frame, area: Rect, app: &App) {
    let navigator = app.navigator();
    let query_suffix = if navigator.is_searching() {
        format!("  /{}_", navigator.query())
    } else if navigator.query().is_empty() {
        String::new()
    } else {
        format!("  /{}", navigator.query())
    };

    let (title, headers, rows, widths): (String, Vec<&str>, Vec<Row>, Vec<Constraint>) =
        match navigator.list_mode() {
            NavigatorMode::Workloads | NavigatorMode::Search => {
                let now = Utc::now();
                let workloads = navigator.visible_workloads();
                let rows = workloads
                    .iter()
                    .map(|workload| {
                        let ready_style = if workload.ready < workload.replicas {
                            Style::default().fg(WARN)
                        } else {
                            Style::default().fg(ACCENT)
                        };
                        Row::new(vec![
                            Cell::from(workload.name.clone()),
                            Cell::from(workload.ready_label()).style(ready_style),
                            Cell::from(human_age(workload.created, now)),
                        ])
                    })
                    .collect();
                (
                    format!(
                        "{} in {} ({}){query_suffix}",
                        navigator.resource_type().title(),
                        navigator.namespace(),
                        workloads.len()
                    ),
                    vec!["Name", "Ready", "Age"],
                    rows,
                    vec![
                        Constraint::Percentage(60),
                        Constraint::Percentage(20),
                        Constraint::Percentage(20),
                    ],
                )
            }
            NavigatorMode::Pods => {
                let now = Utc::now();
                let pods = navigator.visible_pods();
                let rows = pods
                    .iter()
                    .map(|pod| {
                        Row::new(vec![
                            Cell::from(pod.name.clone()),
                            Cell::from(pod.ready_label()),
                            Cell::from(pod.phase.clone()).style(phase_style(&pod.phase)),
                            Cell::from(pod.restarts().to_string()),
                            Cell::from(pod.node.clone().unwrap_or_else(|| "-".to_string())),
                            Cell::from(human_age(pod.created, now)),
                        ])
                    })
                    .collect();
                let workload = app
                    .selected_workload()
                    .map(|workload| workload.name.as_str())
                    .unwrap_or("-");
                (
                    format!("Pods of {workload} ({}){query_suffix}", pods.len()),
                    vec!["Name", "Ready", "Status", "Restarts", "Node", "Age"],
                    rows,
                    vec![
                        Constraint::Percentage(36),
                        Constraint::Percentage(10),
                        Constraint::Percentage(14),
                        Constraint::Percentage(10),
                        Constraint::Percentage(20),
                        Constraint::Percentage(10),
                    ],
                )
            }
            NavigatorMode::Namespace => {
                let rows = navigator
                    .namespaces()
                    .iter()
                    .map(|namespace| {
                        let marker = if namespace == navigator.namespace() {
                            "●"
                        } else {
                            " "
                        };
                        Row::new(vec![Cell::from(marker), Cell::from(namespace.clone())])
                    })
                    .collect();
                (
                    format!("Namespaces ({})", navigator.namespaces().len()),
                    vec!["", "Namespace"],
                    rows,
                    vec![Constraint::Length(2), Constraint::Min(10)],
                )
            }
            NavigatorMode::ResourceType => {
                let rows = ResourceType::ALL
                    .iter()
                    .map(|kind| {
                        let marker = if *kind == navigator.resource_type() {
                            "●"
                        } else {
                            " "
                        };
                        Row::new(vec![Cell::from(marker), Cell::from(kind.title())])
                    })
                    .collect();
                (
                    "Resource type".to_string(),
                    vec!["", "Type"],
                    rows,
                    vec![Constraint::Length(2), Constraint::Min(10)],
                )
            }
        };

    let header_row = Row::new(headers.into_iter().map(|header| {
        Cell::from(header).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let table = Table::new(rows, widths)
        .header(header_row)
        .block(panel_block(title, true))
        .column_spacing(1)
        .style(Style::default().fg(Color::White))
        .row_highlight_style(Style::default().bg(SELECTED).add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(navigator.cursor()));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_dashboard(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(4)])
        .split(area);
    render_pod_summary(frame, rows[0], dashboard);

    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);
    render_logs(frame, body[0], dashboard);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(body[1]);
    render_events(frame, panels[0], dashboard);
    render_related(frame, panels[1], dashboard);
    render_hints(frame, panels[2], dashboard);
}

fn render_pod_summary(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let pod = dashboard.pod();
    let mut first = vec![
        Span::styled(
            pod.name.clone(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(pod.phase.clone(), phase_style(&pod.phase)),
        Span::styled(
            format!(
                "  ready {}  restarts {}  node {}  age {}",
                pod.ready_label(),
                pod.restarts(),
                pod.node.as_deref().unwrap_or("-"),
                human_age(pod.created, Utc::now())
            ),
            Style::default().fg(MUTED),
        ),
    ];
    if let Some(metrics) = dashboard.metrics() {
        first.push(Span::styled(
            format!(
                "  cpu {}  mem {}",
                format_cpu_millicores(metrics.cpu_millicores()),
                format_bytes(metrics.memory_bytes())
            ),
            Style::default().fg(ACCENT),
        ));
    }

    let containers = pod
        .containers
        .iter()
        .map(|container| {
            let label = match &container.reason {
                Some(reason) => format!("{} {}", container.name, reason),
                None => format!("{} {}", container.name, container.state),
            };
            let style = if container.ready {
                Style::default().fg(ACCENT)
            } else {
                Style::default().fg(WARN)
            };
            Span::styled(format!("{label}  "), style)
        })
        .collect::<Vec<_>>();

    let summary = Paragraph::new(vec![Line::from(first), Line::from(containers)])
        .block(panel_block(format!("Pod · {}", dashboard.context()), false));
    frame.render_widget(summary, area);
}

fn render_logs(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let logs = dashboard.logs();
    let mut lines = logs
        .visible_lines()
        .iter()
        .map(|line| {
            let style = if line.is_error {
                Style::default().fg(ERROR)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(Span::styled(line.text.clone(), style))
        })
        .collect::<Vec<_>>();
    if lines.is_empty() {
        let placeholder = if logs.log_count() == 0 {
            "No logs"
        } else {
            "No lines match the current filters"
        };
        lines.push(Line::from(Span::styled(placeholder, Style::default().fg(MUTED))));
    }

    let title = if logs.is_searching() {
        format!("{}_", logs.header())
    } else {
        logs.header()
    };
    let paragraph = Paragraph::new(lines).block(panel_block(
        title,
        dashboard.focus() == DashboardFocus::Logs,
    ));
    frame.render_widget(paragraph, area);
}

fn render_events(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let focused = dashboard.focus() == DashboardFocus::Events;
    let now = Utc::now();
    let lines = dashboard
        .events()
        .iter()
        .map(|event| {
            let style = if event.is_warning() {
                Style::default().fg(WARN)
            } else {
                Style::default().fg(MUTED)
            };
            Line::from(vec![
                Span::styled(format!("{:>4} ", human_age(event.last_seen, now)), style),
                Span::styled(format!("{} ", event.reason), style.add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("x{} ", event.count),
                    Style::default().fg(MUTED),
                ),
                Span::raw(event.message.clone()),
            ])
        })
        .collect::<Vec<_>>();

    let text = if lines.is_empty() {
        Text::from(Span::styled("No recent events", Style::default().fg(MUTED)))
    } else {
        Text::from(lines)
    };
    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .scroll((panel_offset(dashboard, focused), 0))
        .style(Style::default().fg(Color::White))
        .block(panel_block(
            format!("Events ({})", dashboard.events().len()),
            focused,
        ));
    frame.render_widget(paragraph, area);
}

fn render_related(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let focused = dashboard.focus() == DashboardFocus::Related;
    let mut lines = Vec::new();
    if let Some(metrics) = dashboard.metrics() {
        for container in &metrics.containers {
            lines.push(Line::from(Span::styled(
                format!(
                    "{}  cpu {}  mem {}",
                    container.name,
                    format_cpu_millicores(container.cpu_millicores),
                    format_bytes(container.memory_bytes)
                ),
                Style::default().fg(ACCENT),
            )));
        }
    }
    match dashboard.related() {
        Some(related) if !related.is_empty() => {
            lines.extend(related.lines().into_iter().map(Line::from));
        }
        _ => lines.push(Line::from(Span::styled(
            "No related resources",
            Style::default().fg(MUTED),
        ))),
    }

    let paragraph = Paragraph::new(lines)
        .scroll((panel_offset(dashboard, focused), 0))
        .style(Style::default().fg(Color::White))
        .block(panel_block("Related".to_string(), focused));
    frame.render_widget(paragraph, area);
}

fn render_hints(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let focused = dashboard.focus() == DashboardFocus::Hints;
    let mut lines = Vec::new();
    for helper in dashboard.helpers() {
        let color = match helper.severity {
            Severity::Critical => ERROR,
            Severity::Warning => WARN,
            Severity::Info => MUTED,
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("[{}] ", helper.severity.label()),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(helper.title.clone(), Style::default().fg(Color::White)),
        ]));
        lines.push(Line::from(Span::styled(
            helper.detail.clone(),
            Style::default().fg(MUTED),
        )));
        if let Some(hint) = &helper.hint {
            lines.push(Line::from(Span::styled(
                format!("$ {hint}"),
                Style::default().fg(ACCENT),
            )));
        }
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "No issues detected",
            Style::default().fg(ACCENT),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((panel_offset(dashboard, focused), 0))
        .block(panel_block(
            format!("Debug hints ({})", dashboard.helpers().len()),
            focused,
        ));
    frame.render_widget(paragraph, area);
}

fn panel_offset(dashboard: &Dashboard, focused: bool) -> u16 {
    if focused {
        u16::try_from(dashboard.panel_scroll()).unwrap_or(u16::MAX)
    } else {
        0
    }
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let status = app
        .dashboard()
        .and_then(|dashboard| dashboard.status())
        .or_else(|| app.status());

    let mut spans = Vec::new();
    let (mode_label, hints) = match app.view() {
        ViewState::Dashboard => (" dashboard ", DASHBOARD_HINTS.to_string()),
        ViewState::Navigator => (
            navigator_mode_label(app.navigator().mode()),
            format!("{NAVIGATOR_HINTS}  {}", global_hints()),
        ),
    };
    push_powerline_segment(&mut spans, mode_label, Color::White, PL_A, BG);

    match status {
        Some(status) => {
            let color = if status.starts_with("Error") || status.contains("failed") {
                ERROR
            } else {
                WARN
            };
            spans.push(Span::styled(
                format!(" {}", compact_text(status, usize::from(area.width.saturating_sub(16)))),
                Style::default().fg(color),
            ));
        }
        None => spans.push(Span::styled(
            format!(" {}", compact_text(&hints, usize::from(area.width.saturating_sub(16)))),
            Style::default().fg(MUTED),
        )),
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn navigator_mode_label(mode: NavigatorMode) -> &'static str {
    match mode {
        NavigatorMode::Workloads => " workloads ",
        NavigatorMode::Pods => " pods ",
        NavigatorMode::Namespace => " namespace ",
        NavigatorMode::ResourceType => " type ",
        NavigatorMode::Search => " search ",
    }
}

fn global_hints() -> String {
    GLOBAL_BINDINGS
        .iter()
        .map(|binding| format!("{} {}", binding.keys[0], binding.help))
        .collect::<Vec<_>>()
        .join("  ")
}

fn render_help_modal(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(
            "Global",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
    ];
    for binding in &GLOBAL_BINDINGS {
        lines.push(Line::from(format!(
            "  {:<14} {}",
            binding.keys.join(" / "),
            binding.help
        )));
    }
    lines.push(Line::from(""));

    let (section, entries): (&str, &[(&str, &str)]) = match app.view() {
        ViewState::Navigator => (
            "Lists",
            &[
                ("j / k", "move"),
                ("g / G", "top / bottom"),
                ("/", "search"),
                ("c", "clear search"),
            ],
        ),
        ViewState::Dashboard => (
            "Dashboard",
            &[
                ("tab", "next panel"),
                ("/", "search logs"),
                ("f", "follow logs"),
                ("e", "next error"),
                ("P", "previous container logs"),
                ("[ / ]", "cycle container"),
                ("T", "time window"),
                ("x", "exec command"),
                ("p", "port-forward"),
                ("d", "describe pod"),
                ("D", "delete pod"),
            ],
        ),
    };
    lines.push(Line::from(Span::styled(
        section,
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    )));
    for (keys, help) in entries {
        lines.push(Line::from(format!("  {keys:<14} {help}")));
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block("Help".to_string(), true))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn render_confirm(frame: &mut Frame, confirm: &ConfirmDialog) {
    if !confirm.is_visible() {
        return;
    }
    let area = centered_rect(50, 24, frame.area());
    frame.render_widget(Clear, area);

    let option = |label: &str, selected: bool| {
        if selected {
            Span::styled(
                format!(" {label} "),
                Style::default()
                    .fg(Color::Black)
                    .bg(WARN)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(format!(" {label} "), Style::default().fg(MUTED))
        }
    };
    let lines = vec![
        Line::from(confirm.prompt()),
        Line::from(""),
        Line::from(vec![
            option("Yes", confirm.yes_selected()),
            Span::raw("   "),
            option("No", !confirm.yes_selected()),
        ])
        .alignment(Alignment::Center),
    ];

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block(confirm.title().to_string(), true).border_style(Style::default().fg(WARN)))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn render_action_menu(frame: &mut Frame, menu: &ActionMenu) {
    if !menu.is_visible() {
        return;
    }
    let area = centered_rect(50, 40, frame.area());
    frame.render_widget(Clear, area);

    let rows = menu
        .items()
        .iter()
        .map(|item| Row::new(vec![Cell::from(item.label.clone())]))
        .collect::<Vec<_>>();
    let table = Table::new(rows, [Constraint::Percentage(100)])
        .block(panel_block(menu.title().to_string(), true))
        .style(Style::default().fg(Color::White))
        .row_highlight_style(Style::default().bg(SELECTED).add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(menu.selected()));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_prompt(frame: &mut Frame, prompt: &TextPrompt) {
    if !prompt.is_visible() {
        return;
    }
    let area = centered_rect(60, 20, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled(prompt.hint().to_string(), Style::default().fg(MUTED))),
        Line::from(""),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(ACCENT)),
            Span::raw(prompt.input().to_string()),
            Span::styled("_", Style::default().fg(ACCENT)),
        ]),
    ];
    let modal = Paragraph::new(lines)
        .block(panel_block(prompt.title().to_string(), true))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn render_viewer(frame: &mut Frame, viewer: &ResultViewer) {
    if !viewer.is_visible() {
        return;
    }
    let area = centered_rect(86, 80, frame.area());
    frame.render_widget(Clear, area);

    let text = viewer
        .lines()
        .iter()
        .map(|line| Line::from(line.clone()))
        .collect::<Vec<_>>();
    let modal = Paragraph::new(text)
        .scroll((u16::try_from(viewer.scroll()).unwrap_or(u16::MAX), 0))
        .block(panel_block(
            format!("{}  (esc close)", viewer.title()),
            true,
        ))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(ACCENT)
        } else {
            Style::default().fg(MUTED)
        })
        .style(Style::default().bg(PANEL))
}

fn phase_style(phase: &str) -> Style {
    match phase {
        "Running" | "Succeeded" => Style::default().fg(ACCENT),
        "Pending" => Style::default().fg(WARN),
        "Failed" | "Unknown" => Style::default().fg(ERROR),
        _ => Style::default().fg(MUTED),
    }
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{compact_text, render};
    use crate::app::App;
    use crate::config::AppConfig;
    use crate::message::AppMessage;
    use crate::model::{ContainerInfo, LogLine, PodInfo, ResourceType, WorkloadInfo};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;

    fn draw(app: &App, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal.draw(|frame| render(frame, app)).expect("draw");
        buffer_to_string(terminal.backend().buffer())
    }

    fn buffer_to_string(buffer: &Buffer) -> String {
        let area = buffer.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle(AppMessage::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn app_with_workloads() -> App {
        let mut app = App::new(AppConfig::default(), "kind-dev".to_string());
        app.handle(AppMessage::WorkloadsLoaded {
            namespaces: Some(vec!["default".to_string()]),
            result: Ok(vec![WorkloadInfo {
                name: "checkout-api".to_string(),
                namespace: "default".to_string(),
                resource_type: ResourceType::Deployments,
                replicas: 3,
                ready: 2,
                ..WorkloadInfo::default()
            }]),
        });
        app
    }

    #[test]
    fn navigator_lists_workloads() {
        let screen = draw(&app_with_workloads(), 100, 20);
        assert!(screen.contains("checkout-api"));
        assert!(screen.contains("2/3"));
        assert!(screen.contains("Deployments in default (1)"));
    }

    #[test]
    fn fatal_error_replaces_whole_screen() {
        let mut app = App::new(AppConfig::default(), "kind-dev".to_string());
        app.handle(AppMessage::WorkloadsLoaded {
            namespaces: None,
            result: Err("connection refused".to_string()),
        });
        let screen = draw(&app, 100, 20);
        assert!(screen.contains("Unable to load cluster data"));
        assert!(screen.contains("connection refused"));
        assert!(!screen.contains("podscope"));
        assert!(!screen.contains("kind-dev"));
    }

    #[test]
    fn dashboard_shows_logs_and_pod_summary() {
        let mut app = app_with_workloads();
        press(&mut app, KeyCode::Enter);
        app.handle(AppMessage::PodsLoaded {
            workload: "checkout-api".to_string(),
            result: Ok(vec![PodInfo {
                name: "checkout-api-7d9".to_string(),
                namespace: "default".to_string(),
                phase: "Running".to_string(),
                containers: vec![ContainerInfo {
                    name: "app".to_string(),
                    ready: true,
                    state: "Running".to_string(),
                    ..ContainerInfo::default()
                }],
                ..PodInfo::default()
            }]),
        });
        press(&mut app, KeyCode::Enter);
        app.handle(AppMessage::LogsRefreshed {
            generation: 1,
            logs: vec![LogLine {
                content: "listening on :8080".to_string(),
                container: "app".to_string(),
                ..LogLine::default()
            }],
        });

        let screen = draw(&app, 120, 30);
        assert!(screen.contains("checkout-api-7d9"));
        assert!(screen.contains("listening on :8080"));
        assert!(screen.contains("No issues detected"));
    }

    #[test]
    fn help_modal_lists_global_bindings() {
        let mut app = app_with_workloads();
        press(&mut app, KeyCode::Char('?'));
        let screen = draw(&app, 100, 30);
        assert!(screen.contains("Help"));
        assert!(screen.contains("toggle help"));
    }

    #[test]
    fn compact_text_truncates_with_ellipsis() {
        assert_eq!(compact_text("podscope", 20), "podscope");
        assert_eq!(compact_text("podscope", 4), "pod…");
    }
}
