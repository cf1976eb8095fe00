use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("stxlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: stxlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("STXLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "max_frame_size: {}",
        stxlink_frame::DEFAULT_MAX_FRAME_SIZE
    );
    println!(
        "default_keepalive: {:?}",
        stxlink_client::DEFAULT_KEEPALIVE_INTERVAL
    );
    println!("features: client={}, cli=true", cfg!(feature = "client"));

    Ok(SUCCESS)
}
