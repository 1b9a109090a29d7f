use crate::input::text_input_char;
use crate::model::LogLine;
use chrono::{DateTime, Duration, Utc};
use crossterm::event::{KeyCode, KeyEvent};

const ERROR_MARKERS: [&str; 3] = ["error", "fatal", "panic"];

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum TimeFilter {
    #[default]
    All,
    Last5m,
    Last15m,
    Last1h,
    Last6h,
}

impl TimeFilter {
    pub const ALL: [Self; 5] = [
        Self::All,
        Self::Last5m,
        Self::Last15m,
        Self::Last1h,
        Self::Last6h,
    ];

    pub fn next(self) -> Self {
        let index = Self::ALL
            .iter()
            .position(|candidate| *candidate == self)
            .unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Last5m => "5m",
            Self::Last15m => "15m",
            Self::Last1h => "1h",
            Self::Last6h => "6h",
        }
    }

    pub fn window(self) -> Option<Duration> {
        match self {
            Self::All => None,
            Self::Last5m => Some(Duration::minutes(5)),
            Self::Last15m => Some(Duration::minutes(15)),
            Self::Last1h => Some(Duration::hours(1)),
            Self::Last6h => Some(Duration::hours(6)),
        }
    }
}

pub fn contains_error_marker(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    ERROR_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Runs the container, time-window and text stages in that order.
/// Lines keep their original relative order.
pub fn filter_logs<'a>(
    lines: &'a [LogLine],
    container: Option<&str>,
    time_filter: TimeFilter,
    query: &str,
    now: DateTime<Utc>,
) -> Vec<&'a LogLine> {
    let cutoff = time_filter.window().map(|window| now - window);
    let query = query.to_lowercase();

    lines
        .iter()
        .filter(|line| container.is_none_or(|name| line.container == name))
        .filter(|line| match cutoff {
            None => true,
            Some(cutoff) => line.timestamp.is_some_and(|ts| ts > cutoff),
        })
        .filter(|line| query.is_empty() || line.content.to_lowercase().contains(&query))
        .collect()
}

/// Steps through `[-1, 0, .., count - 1]` with wrap-around; `-1` means all
/// containers.
pub fn cycle_container(index: isize, count: usize, forward: bool) -> isize {
    if count == 0 {
        return -1;
    }
    let last = count as isize - 1;
    if forward {
        if index >= last { -1 } else { index + 1 }
    } else if index <= -1 {
        last
    } else {
        index - 1
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RenderedLine {
    pub text: String,
    pub is_error: bool,
}

#[derive(Debug, Clone)]
pub struct LogsPanel {
    logs: Vec<LogLine>,
    containers: Vec<String>,
    container_idx: isize,
    show_previous: bool,
    following: bool,
    filter: String,
    searching: bool,
    time_filter: TimeFilter,
    scroll: usize,
    height: usize,
    clock: DateTime<Utc>,
    rendered: Vec<RenderedLine>,
}

impl Default for LogsPanel {
    fn default() -> Self {
        Self {
            logs: Vec::new(),
            containers: Vec::new(),
            container_idx: -1,
            show_previous: false,
            following: true,
            filter: String::new(),
            searching: false,
            time_filter: TimeFilter::All,
            scroll: 0,
            height: 10,
            clock: Utc::now(),
            rendered: Vec::new(),
        }
    }
}

impl LogsPanel {
    pub fn set_logs(&mut self, logs: Vec<LogLine>) {
        self.set_logs_at(logs, Utc::now());
    }

    pub fn set_logs_at(&mut self, logs: Vec<LogLine>, now: DateTime<Utc>) {
        self.logs = logs;
        self.clock = now;
        self.rebuild();
    }

    pub fn set_containers(&mut self, containers: Vec<String>) {
        self.containers = containers;
        self.container_idx = -1;
        self.rebuild();
    }

    /// Visible line count of the log viewport.
    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
        self.clamp_scroll();
        if self.following {
            self.scroll = self.max_scroll();
        }
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        self.rebuild();
    }

    pub fn clear_filter(&mut self) {
        self.set_filter(String::new());
    }

    pub fn set_following(&mut self, following: bool) {
        self.following = following;
        if following {
            self.scroll = self.max_scroll();
        }
    }

    pub fn toggle_follow(&mut self) {
        self.set_following(!self.following);
    }

    pub fn toggle_previous(&mut self) {
        self.show_previous = !self.show_previous;
    }

    pub fn cycle_time_filter(&mut self) {
        self.cycle_time_filter_at(Utc::now());
    }

    /// Advances the time window, measuring it back from `now`.
    pub fn cycle_time_filter_at(&mut self, now: DateTime<Utc>) {
        self.time_filter = self.time_filter.next();
        self.clock = now;
        self.rebuild();
    }

    pub fn next_container(&mut self) {
        self.container_idx = cycle_container(self.container_idx, self.containers.len(), true);
        self.rebuild();
    }

    pub fn prev_container(&mut self) {
        self.container_idx = cycle_container(self.container_idx, self.containers.len(), false);
        self.rebuild();
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.following = false;
    }

    pub fn goto_top(&mut self) {
        self.scroll = 0;
        self.following = false;
    }

    pub fn goto_bottom(&mut self) {
        self.scroll = self.max_scroll();
    }

    /// Moves the viewport to the next rendered line carrying an error marker,
    /// wrapping to the top. Returns false when nothing matches.
    pub fn jump_to_next_error(&mut self) -> bool {
        let total = self.rendered.len();
        let start = self.scroll.saturating_add(1);
        let found = (start..total)
            .chain(0..self.scroll.min(total))
            .find(|index| contains_error_marker(&self.rendered[*index].text));

        match found {
            Some(index) => {
                self.scroll = index.min(self.max_scroll());
                self.following = false;
                true
            }
            None => false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.searching {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => self.searching = false,
                KeyCode::Backspace => {
                    let mut filter = self.filter.clone();
                    filter.pop();
                    self.set_filter(filter);
                }
                _ => {
                    if let Some(c) = text_input_char(key) {
                        let mut filter = self.filter.clone();
                        filter.push(c);
                        self.set_filter(filter);
                    }
                }
            }
            return;
        }

        match key.code {
            KeyCode::Char('/') => self.searching = true,
            KeyCode::Char('c') => self.clear_filter(),
            KeyCode::Char('f') => self.toggle_follow(),
            KeyCode::Char('e') => {
                self.jump_to_next_error();
            }
            KeyCode::Char('g') | KeyCode::Home => self.goto_top(),
            KeyCode::Char('G') | KeyCode::End => self.goto_bottom(),
            KeyCode::Char('[') => self.prev_container(),
            KeyCode::Char(']') => self.next_container(),
            KeyCode::Char('P') => self.toggle_previous(),
            KeyCode::Char('T') => self.cycle_time_filter(),
            KeyCode::Char('j') | KeyCode::Down => self.scroll_down(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_up(1),
            KeyCode::PageDown => self.scroll_down(self.height),
            KeyCode::PageUp => self.scroll_up(self.height),
            _ => {}
        }
    }

    pub fn selected_container(&self) -> Option<&str> {
        usize::try_from(self.container_idx)
            .ok()
            .and_then(|index| self.containers.get(index))
            .map(String::as_str)
    }

    #[cfg(test)]
    pub fn container_idx(&self) -> isize {
        self.container_idx
    }

    pub fn show_previous(&self) -> bool {
        self.show_previous
    }

    #[cfg(test)]
    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    #[cfg(test)]
    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn log_count(&self) -> usize {
        self.logs.len()
    }

    pub fn error_count(&self) -> usize {
        self.logs.iter().filter(|line| line.is_error).count()
    }

    pub fn rendered(&self) -> &[RenderedLine] {
        &self.rendered
    }

    pub fn visible_lines(&self) -> &[RenderedLine] {
        let end = self.scroll.saturating_add(self.height).min(self.rendered.len());
        &self.rendered[self.scroll.min(end)..end]
    }

    /// Panel title with container, mode and filter indicators.
    pub fn header(&self) -> String {
        let mut header = String::from("Logs");
        if !self.containers.is_empty() {
            match self.selected_container() {
                Some(name) => header.push_str(&format!(
                    " [{name}] ({}/{})",
                    self.container_idx + 2,
                    self.containers.len() + 1
                )),
                None => header.push_str(&format!(" [all] (1/{})", self.containers.len() + 1)),
            }
        }
        if self.show_previous {
            header.push_str(" [Previous]");
        }
        if self.following {
            header.push_str(" [Following]");
        }
        if self.time_filter != TimeFilter::All {
            header.push_str(&format!(" [{}]", self.time_filter.label()));
        }
        let errors = self.error_count();
        if errors > 0 {
            header.push_str(&format!(" [{errors} errors]"));
        }
        if !self.filter.is_empty() && !self.searching {
            header.push_str(&format!(" /{} (c:clear)", self.filter));
        }
        header
    }

    fn rebuild(&mut self) {
        let show_tags = self.container_idx == -1 && self.containers.len() > 1;
        self.rendered = filter_logs(
            &self.logs,
            self.selected_container(),
            self.time_filter,
            &self.filter,
            self.clock,
        )
        .into_iter()
        .map(|line| RenderedLine {
            text: format_line(line, show_tags),
            is_error: line.is_error,
        })
        .collect();

        if self.following {
            self.scroll = self.max_scroll();
        } else {
            self.clamp_scroll();
        }
    }

    fn max_scroll(&self) -> usize {
        self.rendered.len().saturating_sub(self.height)
    }

    fn clamp_scroll(&mut self) {
        self.scroll = self.scroll.min(self.max_scroll());
    }
}

fn format_line(line: &LogLine, show_container: bool) -> String {
    let mut out = String::new();
    if let Some(timestamp) = line.timestamp {
        out.push_str(&timestamp.format("%H:%M:%S").to_string());
        out.push(' ');
    }
    if show_container && !line.container.is_empty() {
        out.push_str(&format!("[{}] ", line.container));
    }
    out.push_str(&line.content);
    out
}
