use std::fs;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use stxlink_client::{connect_with_config, ClientConfig};
use stxlink_frame::{Frame, MessageHeader};
use tokio::sync::mpsc;
use tracing::info;

use crate::cmd::SendArgs;
use crate::exit::{
    client_error, io_error, CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS, TIMEOUT, USAGE,
};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;
    runtime.block_on(send_and_collect(args, format))
}

async fn send_and_collect(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let keepalive = parse_duration(&args.keepalive)?;
    let header = build_header(&args);
    let body = resolve_body(&args)?;

    let config = ClientConfig {
        keepalive_interval: keepalive,
        connect_timeout: Some(timeout),
        ..ClientConfig::default()
    };
    let (tx, mut frames) = mpsc::unbounded_channel();
    let client = connect_with_config(&args.host, args.port, config, tx)
        .await
        .map_err(|err| client_error("connect failed", err))?;
    let peer = client.peer_addr().to_string();

    if let Err(err) = client.send(&header, &body).await {
        client.shutdown().await;
        return Err(client_error("send failed", err));
    }
    info!(%peer, uid = header.uid(), name = header.name(), "frame sent");

    let outcome = collect_frames(&mut frames, args.count, timeout, &peer, format).await;
    client.shutdown().await;
    outcome
}

/// Print up to `count` frames. Ends early on Ctrl-C (success) or when the
/// receive loop drops its sender because the peer closed (failure).
async fn collect_frames(
    frames: &mut mpsc::UnboundedReceiver<Frame>,
    count: usize,
    timeout: Duration,
    peer: &str,
    format: OutputFormat,
) -> CliResult<i32> {
    if count == 0 {
        return Ok(SUCCESS);
    }

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let mut received = 0;
    while received < count {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => {
                    print_frame(&frame, peer, format);
                    received += 1;
                }
                None => {
                    return Err(CliError::new(
                        FAILURE,
                        format!("peer closed after {received} of {count} frames"),
                    ));
                }
            },
            _ = &mut deadline => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("timed out after {timeout:?} ({received} of {count} frames)"),
                ));
            }
            result = &mut interrupt => {
                result.map_err(|err| io_error("signal handler failed", err))?;
                info!(received, "interrupted");
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}

fn build_header(args: &SendArgs) -> MessageHeader {
    let uid = args.uid.clone().unwrap_or_else(generate_uid);
    MessageHeader::new(uid, args.name.as_str())
        .with_data_type(args.data_type.as_str())
        .with_receiver(args.receiver.as_str())
        .with_type(args.msg_type.as_str())
        .with_data_len(args.data_len)
        .with_interval(args.interval)
}

fn generate_uid() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("stxlink-{}-{nanos:x}", std::process::id())
}

fn resolve_body(args: &SendArgs) -> CliResult<String> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.clone());
    }
    if let Some(data) = &args.data {
        return Ok(data.clone());
    }
    if let Some(path) = &args.file {
        let bytes = fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return String::from_utf8(bytes).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                format!("{} is not UTF-8 text: {err}", path.display()),
            )
        });
    }
    Ok(String::new())
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
