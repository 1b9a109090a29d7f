use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "podscope",
    version,
    about = "A terminal dashboard for Kubernetes workloads, pods and their logs."
)]
pub struct CliArgs {
    /// Start in a specific namespace (overrides the saved one)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// kubeconfig context to use instead of the current one
    #[arg(long)]
    pub context: Option<String>,

    /// Dashboard refresh interval in seconds (overrides the saved one)
    #[arg(long)]
    pub refresh_secs: Option<u64>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Append tracing output to this file instead of discarding it
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
