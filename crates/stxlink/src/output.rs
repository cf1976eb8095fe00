use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use stxlink_frame::Frame;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    uid: &'a str,
    name: &'a str,
    data_type: &'a str,
    receiver: &'a str,
    msg_type: &'a str,
    data_len: i64,
    interval: i64,
    body_size: usize,
    body: String,
    peer: &'a str,
    timestamp: String,
}

impl<'a> FrameOutput<'a> {
    fn new(frame: &'a Frame, peer: &'a str) -> Self {
        let header = &frame.header;
        Self {
            uid: header.uid(),
            name: header.name(),
            data_type: header.data_type(),
            receiver: header.receiver(),
            msg_type: header.msg_type(),
            data_len: header.data_len(),
            interval: header.interval(),
            body_size: frame.body.len(),
            body: body_preview(&frame.body),
            peer,
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn render_frame(frame: &Frame, peer: &str, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Json => {
            let mut line = serde_json::to_vec(&FrameOutput::new(frame, peer))
                .unwrap_or_else(|_| b"{}".to_vec());
            line.push(b'\n');
            line
        }
        OutputFormat::Table => {
            let header = &frame.header;
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["UID", "NAME", "TYPE", "RECEIVER", "SIZE", "BODY"])
                .add_row(vec![
                    header.uid().to_string(),
                    header.name().to_string(),
                    header.msg_type().to_string(),
                    header.receiver().to_string(),
                    frame.body.len().to_string(),
                    body_preview(&frame.body),
                ]);
            format!("{table}\n").into_bytes()
        }
        OutputFormat::Pretty => format!(
            "uid={} name={} type={} receiver={} size={} peer={} body={}\n",
            frame.header.uid(),
            frame.header.name(),
            frame.header.msg_type(),
            frame.header.receiver(),
            frame.body.len(),
            peer,
            body_preview(&frame.body)
        )
        .into_bytes(),
        OutputFormat::Raw => {
            let mut out = frame.body.to_vec();
            out.push(b'\n');
            out
        }
    }
}

pub fn print_frame(frame: &Frame, peer: &str, format: OutputFormat) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(&render_frame(frame, peer, format));
    let _ = out.flush();
}

fn body_preview(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", body.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
