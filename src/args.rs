use adb_screenshot::adb::{BackendKind, TransportStrategy};
use adb_screenshot::config::ScreenshotConfig;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Screenshot,
    Devices,
}

#[derive(Debug)]
pub struct Args {
    pub mode: Mode,
    pub debug_mode: bool,
    pub backend: Option<BackendKind>,
    pub transport: Option<TransportStrategy>,
    pub output_dir: Option<PathBuf>,
    pub adb_path: Option<PathBuf>,
}

impl Args {
    /// Parse the process arguments. `Ok(None)` means help or version was
    /// printed and there is nothing left to do.
    pub fn parse() -> Result<Option<Self>, String> {
        Self::parse_from(env::args().skip(1))
    }

    pub fn parse_from<I: IntoIterator<Item = String>>(args: I) -> Result<Option<Self>, String> {
        let mut mode: Option<Mode> = None;
        let mut debug_mode: bool = false;
        let mut backend: Option<BackendKind> = None;
        let mut transport: Option<TransportStrategy> = None;
        let mut output_dir: Option<PathBuf> = None;
        let mut adb_path: Option<PathBuf> = None;

        for arg in args {
            if arg == "--help" || arg == "-h" {
                print_help();
                return Ok(None);
            } else if arg == "--version" || arg == "-v" {
                println!("adb-screenshot v{}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            } else if arg == "--debug" {
                debug_mode = true;
            } else if arg == "--screenshot" || arg == "-s" {
                mode = Some(Mode::Screenshot);
            } else if arg == "--devices" || arg == "-l" {
                mode = Some(Mode::Devices);
            } else if let Some(rest) = arg.strip_prefix("--impl=") {
                backend = Some(BackendKind::parse(rest).ok_or_else(|| {
                    format!("Unknown impl '{rest}', expected 'shell' or 'rust'")
                })?);
            } else if let Some(rest) = arg.strip_prefix("--transport=") {
                transport = Some(match rest {
                    "exec" => TransportStrategy::ExecOut,
                    "pull" => TransportStrategy::pull_file(),
                    other => {
                        return Err(format!(
                            "Unknown transport '{other}', expected 'exec' or 'pull'"
                        ));
                    }
                });
            } else if let Some(rest) = arg.strip_prefix("--out=") {
                output_dir = Some(PathBuf::from(rest));
            } else if let Some(rest) = arg.strip_prefix("--adb=") {
                adb_path = Some(PathBuf::from(rest));
            } else {
                return Err(format!("Unknown argument: {arg}"));
            }
        }

        Ok(Some(Args {
            mode: mode.unwrap_or(Mode::Screenshot),
            debug_mode,
            backend,
            transport,
            output_dir,
            adb_path,
        }))
    }

    /// Flags win over whatever `config` was loaded with.
    pub fn apply(&self, config: &mut ScreenshotConfig) {
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(transport) = &self.transport {
            config.transport = transport.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = Some(dir.clone());
        }
        if let Some(path) = &self.adb_path {
            config.adb_path = Some(path.clone());
        }
    }
}

pub fn print_help() {
    println!("📸 Android Screenshot Tool");
    println!();
    println!("USAGE:");
    println!("    adb-screenshot [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    (no flags)              Take a screenshot and save it in the current directory");
    println!("    --screenshot, -s        Take a screenshot of the first device and save it");
    println!("    --devices, -l           List attached devices");
    println!("    --out=<dir>             Directory to save screenshots in (must exist)");
    println!("    --impl=<shell|rust>     Select ADB implementation (default: shell, or ADB_IMPL)");
    println!("    --transport=<exec|pull> How the image leaves the device (default: exec)");
    println!("    --adb=<path>            Use this adb executable (or set ADB_PATH)");
    println!("    --debug                 Enable debug logging");
    println!("    --help, -h              Show this help message");
    println!("    --version, -v           Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    adb-screenshot --screenshot --out=$HOME/Pictures");
    println!("    adb-screenshot --devices --impl=rust");
    println!("    adb-screenshot --transport=pull --adb=/opt/android/platform-tools/adb");
}
