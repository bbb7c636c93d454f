use clap::Parser;
use std::path::PathBuf;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Player: Mopidy JSON-RPC\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// RFID tag scanner service with an HTTP registry API
#[derive(Parser, Debug, Default)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Address the HTTP API binds to (default: 127.0.0.1)
    #[arg(long = "bind", value_name = "ADDR")]
    pub bind: Option<String>,

    /// HTTP API port
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Reader device node (evdev keyboard reader, e.g. /dev/input/event3)
    #[arg(short = 'd', long = "device", value_name = "PATH", conflicts_with_all = ["device_name", "stdin"])]
    pub device: Option<PathBuf>,

    /// Find the evdev reader by its device name (e.g. "HXGCoLtd Keyboard")
    #[arg(short = 'n', long = "device-name", value_name = "NAME", conflicts_with = "stdin")]
    pub device_name: Option<String>,

    /// Read one UID per line from a serial tty or file instead of evdev
    #[arg(long = "line-device", value_name = "PATH", conflicts_with_all = ["device", "device_name", "stdin"])]
    pub line_device: Option<PathBuf>,

    /// Read UIDs from stdin, one per line
    #[arg(long = "stdin")]
    pub stdin: bool,

    /// Mopidy HTTP root
    #[arg(short = 'm', long = "mopidy-url", value_name = "URL")]
    pub mopidy_url: Option<String>,

    /// Registry file (default: <data dir>/registry.json)
    #[arg(short = 'r', long = "registry", value_name = "FILE")]
    pub registry: Option<PathBuf>,

    /// Directory holding success.wav / fail.wav
    #[arg(long = "sounds-dir", value_name = "DIR")]
    pub sounds_dir: Option<PathBuf>,

    /// Disable scan feedback sounds
    #[arg(long = "no-sound")]
    pub no_sound: bool,

    /// Allow registering RunCommand tags (runs shell commands on scan)
    #[arg(long = "allow-commands")]
    pub allow_commands: bool,

    /// Ignore repeat reads of the same tag within this window
    #[arg(long = "debounce-ms", value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Enable logging to file (default: tapdeck.log in the data dir)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}
