use objlink_frame::{DEFAULT_PREFIX, DEFAULT_SUFFIX, MAX_CHANNELS, OVERHEAD};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("objlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: objlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("OBJLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "frame: prefix={:?} suffix={:?} overhead={} channels={}",
        DEFAULT_PREFIX as char, DEFAULT_SUFFIX as char, OVERHEAD, MAX_CHANNELS
    );
    println!(
        "features: async={}, serial={}, cli=true",
        cfg!(feature = "async"),
        cfg!(unix)
    );

    Ok(SUCCESS)
}
