use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;

/// A clipboard writer program that reads the text on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardBackend {
    Pbcopy,
    Clip,
    WlCopy,
    Xclip,
    Xsel,
}

impl ClipboardBackend {
    pub fn program(self) -> &'static str {
        match self {
            Self::Pbcopy => "pbcopy",
            Self::Clip => "clip",
            Self::WlCopy => "wl-copy",
            Self::Xclip => "xclip",
            Self::Xsel => "xsel",
        }
    }

    pub fn args(self) -> &'static [&'static str] {
        match self {
            Self::Xclip => &["-selection", "clipboard"],
            Self::Xsel => &["--clipboard", "--input"],
            Self::Pbcopy | Self::Clip | Self::WlCopy => &[],
        }
    }

    /// Picks the backend for an OS name as reported by `std::env::consts::OS`.
    /// On Linux, xclip wins when present and xsel is the fallback.
    pub fn select(os: &str, wayland: bool, has_xclip: bool) -> Self {
        match os {
            "macos" => Self::Pbcopy,
            "windows" => Self::Clip,
            "linux" if wayland => Self::WlCopy,
            "linux" if !has_xclip => Self::Xsel,
            _ => Self::Xclip,
        }
    }

    pub fn detect() -> Self {
        let wayland = std::env::var_os("WAYLAND_DISPLAY").is_some_and(|value| !value.is_empty());
        Self::select(std::env::consts::OS, wayland, program_on_path("xclip"))
    }
}

fn program_on_path(program: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| Path::new(&dir).join(program).is_file())
        })
        .unwrap_or(false)
}

pub async fn copy_to_clipboard(text: &str) -> Result<()> {
    let backend = ClipboardBackend::detect();
    let mut child = TokioCommand::new(backend.program())
        .args(backend.args())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to start {}", backend.program()))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .await
            .with_context(|| format!("failed to write to {}", backend.program()))?;
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("failed to wait for {}", backend.program()))?;
    if !status.success() {
        anyhow::bail!("{} exited with {status}", backend.program());
    }
    Ok(())
}
