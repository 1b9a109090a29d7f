mod analysis;
mod app;
mod cli;
mod clipboard;
mod config;
mod dashboard;
mod input;
mod k8s;
mod logs;
mod message;
mod model;
mod navigator;
mod overlay;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use cli::CliArgs;
use config::AppConfig;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use k8s::KubeGateway;
use message::{AppMessage, Command, WorkloadAction};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
type MessageSender = mpsc::UnboundedSender<AppMessage>;

const ERROR_SUMMARY_CHARS: usize = 240;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let saved = config::config_path().is_some_and(|path| path.exists());
    let mut config = AppConfig::load().unwrap_or_else(|error| {
        warn!("ignoring unreadable config: {error:#}");
        AppConfig::default()
    });

    let gateway = Arc::new(KubeGateway::new(args.context.clone()).await?);
    if let Some(namespace) = args.namespace {
        config.last_namespace = namespace;
    } else if !saved && !gateway.default_namespace().is_empty() {
        config.last_namespace = gateway.default_namespace().to_string();
    }
    if let Some(refresh_secs) = args.refresh_secs {
        config.refresh_interval = refresh_secs;
    }
    info!(
        "starting in namespace {} ({})",
        config.last_namespace,
        gateway.context()
    );

    let mut app = App::new(config, gateway.context().to_string());
    let result = run(&mut app, gateway).await;
    if let Err(error) = app.config().save() {
        warn!("failed to save config on exit: {error:#}");
    }
    result
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::sink).try_init();
        }
    }

    Ok(())
}

async fn run(app: &mut App, gateway: Arc<KubeGateway>) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, gateway).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    gateway: Arc<KubeGateway>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<AppMessage>();
    let size = terminal.size().context("failed to read terminal size")?;
    let mut commands = app.handle(AppMessage::Resize {
        width: size.width,
        height: size.height,
    });
    commands.extend(app.init());
    execute_commands(&gateway, &tx, commands);

    let mut reader = EventStream::new();
    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        let message = tokio::select! {
            maybe_event = reader.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    Some(AppMessage::Key(key))
                }
                Some(Ok(Event::Resize(width, height))) => Some(AppMessage::Resize { width, height }),
                Some(Ok(_)) => None,
                Some(Err(error)) => {
                    warn!("terminal event error: {error}");
                    None
                }
                None => {
                    warn!("terminal event stream closed");
                    break;
                }
            },
            Some(message) = rx.recv() => Some(message),
        };

        if let Some(message) = message {
            let commands = app.handle(message);
            execute_commands(&gateway, &tx, commands);
        }
    }

    Ok(())
}

fn execute_commands(gateway: &Arc<KubeGateway>, tx: &MessageSender, commands: Vec<Command>) {
    for command in commands {
        debug!("command={command:?}");
        spawn_command(Arc::clone(gateway), tx.clone(), command);
    }
}

/// Runs one command in the background; its outcome comes back as a message.
fn spawn_command(gateway: Arc<KubeGateway>, tx: MessageSender, command: Command) {
    match command {
        Command::Dispatch(message) => {
            let _ = tx.send(*message);
        }
        Command::ScheduleTick(period) => {
            tokio::spawn(async move {
                tokio::time::sleep(period).await;
                let _ = tx.send(AppMessage::Tick);
            });
        }
        Command::SaveConfig(config) => {
            tokio::task::spawn_blocking(move || {
                if let Err(error) = config.save() {
                    warn!("failed to save config: {error:#}");
                }
            });
        }
        Command::LoadInitial {
            namespace,
            resource_type,
        } => {
            tokio::spawn(async move {
                let (namespaces, workloads) = tokio::join!(
                    gateway.list_namespaces(),
                    gateway.list_workloads(&namespace, resource_type)
                );
                let result = match (&namespaces, workloads) {
                    (Err(error), _) => Err(compact_error(error)),
                    (Ok(_), result) => result.map_err(|error| compact_error(&error)),
                };
                let _ = tx.send(AppMessage::WorkloadsLoaded {
                    namespaces: namespaces.ok(),
                    result,
                });
            });
        }
        Command::LoadWorkloads {
            namespace,
            resource_type,
        } => {
            tokio::spawn(async move {
                let result = gateway
                    .list_workloads(&namespace, resource_type)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMessage::WorkloadsLoaded {
                    namespaces: None,
                    result,
                });
            });
        }
        Command::LoadPods { workload } => {
            tokio::spawn(async move {
                let result = gateway
                    .workload_pods(&workload)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMessage::PodsLoaded {
                    workload: workload.name,
                    result,
                });
            });
        }
        Command::LoadDashboard {
            generation,
            pod,
            logs,
        } => {
            tokio::spawn(async move {
                let data = gateway.load_dashboard(&pod, &logs).await;
                let _ = tx.send(AppMessage::DashboardLoaded { generation, data });
            });
        }
        Command::LoadLogs {
            generation,
            namespace,
            pod,
            logs,
        } => {
            tokio::spawn(async move {
                let logs = gateway.fetch_logs(&namespace, &pod, &logs).await;
                let _ = tx.send(AppMessage::LogsRefreshed { generation, logs });
            });
        }
        Command::DeletePod { namespace, pod } => {
            tokio::spawn(async move {
                let result = gateway
                    .delete_pod(&namespace, &pod)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMessage::PodDeleted { pod, result });
            });
        }
        Command::ScaleWorkload { workload, replicas } => {
            tokio::spawn(async move {
                let result = gateway
                    .scale_workload(
                        &workload.namespace,
                        &workload.name,
                        workload.resource_type,
                        replicas,
                    )
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMessage::ActionCompleted {
                    action: WorkloadAction::Scale { replicas },
                    workload: workload.name,
                    result,
                });
            });
        }
        Command::RestartWorkload { workload } => {
            tokio::spawn(async move {
                let result = gateway
                    .restart_workload(&workload.namespace, &workload.name, workload.resource_type)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMessage::ActionCompleted {
                    action: WorkloadAction::Restart,
                    workload: workload.name,
                    result,
                });
            });
        }
        Command::ExecInPod {
            namespace,
            pod,
            container,
            command,
        } => {
            tokio::spawn(async move {
                let result = gateway
                    .exec_in_pod(&namespace, &pod, container.as_deref(), &command)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMessage::ExecFinished {
                    title: format!("{pod} $ {}", command.join(" ")),
                    result,
                });
            });
        }
        Command::DescribePod { namespace, pod } => {
            tokio::spawn(async move {
                let result = gateway
                    .describe_pod(&namespace, &pod)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMessage::DescribeOutput {
                    title: format!("describe pod {namespace}/{pod}"),
                    result,
                });
            });
        }
        Command::StartPortForward {
            namespace,
            pod,
            local_port,
            remote_port,
        } => {
            tokio::spawn(async move {
                let target = format!("{namespace}/{pod} {local_port}:{remote_port}");
                let mut child =
                    match gateway.spawn_port_forward(&namespace, &pod, local_port, remote_port) {
                        Ok((pid, child)) => {
                            let _ = tx.send(AppMessage::PortForwardStarted {
                                target: target.clone(),
                                result: Ok(pid),
                            });
                            child
                        }
                        Err(error) => {
                            let _ = tx.send(AppMessage::PortForwardStarted {
                                target,
                                result: Err(compact_error(&error)),
                            });
                            return;
                        }
                    };

                let result = match child.wait().await {
                    Ok(status) if status.success() => Ok(status.to_string()),
                    Ok(status) => Err(status.to_string()),
                    Err(error) => Err(error.to_string()),
                };
                let _ = tx.send(AppMessage::PortForwardExited { target, result });
            });
        }
        Command::CopyToClipboard { text, label } => {
            tokio::spawn(async move {
                let result = clipboard::copy_to_clipboard(&text)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppMessage::ClipboardCopied { label, result });
            });
        }
    }
}

fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    let summary = out.join(": ").replace('\n', " ");
    if summary.chars().count() <= ERROR_SUMMARY_CHARS {
        return summary;
    }
    let mut short = summary
        .chars()
        .take(ERROR_SUMMARY_CHARS.saturating_sub(1))
        .collect::<String>();
    short.push('…');
    short
}
