use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect, send one frame, and print received frames.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Host name or IP address of the service.
    pub host: String,
    /// TCP port of the service.
    pub port: u16,
    /// Message name (header `name`).
    #[arg(long)]
    pub name: String,
    /// Message id (header `UID`). Generated when omitted.
    #[arg(long)]
    pub uid: Option<String>,
    /// Body data type (header `dataType`).
    #[arg(long, default_value = "JSON")]
    pub data_type: String,
    /// Target receiver (header `receiver`).
    #[arg(long, default_value = "")]
    pub receiver: String,
    /// Message type (header `type`).
    #[arg(long = "type", value_name = "TYPE", default_value = "")]
    pub msg_type: String,
    /// Header `dataLen`.
    #[arg(long, default_value_t = 0)]
    pub data_len: i64,
    /// Header `interval`.
    #[arg(long, default_value_t = 0)]
    pub interval: i64,
    /// JSON body (validated before sending).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Text body.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read the body from a UTF-8 file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Print this many received frames before exiting (0 = send only).
    #[arg(long, default_value_t = 0)]
    pub count: usize,
    /// Connect timeout, and the time allowed for --count frames (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Keep-alive probe period (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub keepalive: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
