// Resolves the adb executable through an ordered chain of strategies.
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

#[cfg(windows)]
const ADB_BINARY: &str = "adb.exe";
#[cfg(not(windows))]
const ADB_BINARY: &str = "adb";

const SDK_ENV_VARS: [&str; 2] = ["ANDROID_HOME", "ANDROID_SDK_ROOT"];
const PATH_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// A host-provided SDK lookup, consulted before anything else.
pub trait SdkPathService: Send + Sync {
    fn adb_path(&self) -> Option<PathBuf>;
}

/// An explicitly configured adb path (`--adb=` flag or `ADB_PATH`).
#[derive(Debug, Clone)]
pub struct ConfiguredAdbPath(pub PathBuf);

impl SdkPathService for ConfiguredAdbPath {
    fn adb_path(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

/// Snapshot of the process environment the locator reads from.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub home: Option<PathBuf>,
}

impl Environment {
    pub fn from_process() -> Self {
        let home = match homedir::my_home() {
            Ok(home) => home,
            Err(e) => {
                debug!("Could not resolve home directory: {e}");
                None
            }
        };
        Self {
            vars: std::env::vars().collect(),
            home,
        }
    }

    fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

#[derive(Clone)]
pub enum LocateStrategy {
    HostSdk(Arc<dyn SdkPathService>),
    SdkEnvVars {
        vars: Vec<String>,
        subpath: PathBuf,
    },
    CommonPaths(Vec<PathBuf>),
    PathLookup {
        program: String,
        timeout: Duration,
    },
}

impl std::fmt::Debug for LocateStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocateStrategy::HostSdk(_) => f.write_str("HostSdk"),
            LocateStrategy::SdkEnvVars { vars, .. } => write!(f, "SdkEnvVars({vars:?})"),
            LocateStrategy::CommonPaths(paths) => write!(f, "CommonPaths({} entries)", paths.len()),
            LocateStrategy::PathLookup { program, .. } => write!(f, "PathLookup({program})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeLocator {
    strategies: Vec<LocateStrategy>,
}

impl BridgeLocator {
    /// Standard chain: host SDK (if any), SDK env vars, common install
    /// locations, then a `which`/`where` lookup on PATH.
    pub fn new(host_sdk: Option<Arc<dyn SdkPathService>>, env: &Environment) -> Self {
        let mut strategies = Vec::with_capacity(4);
        if let Some(service) = host_sdk {
            strategies.push(LocateStrategy::HostSdk(service));
        }
        strategies.push(LocateStrategy::SdkEnvVars {
            vars: SDK_ENV_VARS.iter().map(|v| v.to_string()).collect(),
            subpath: Path::new("platform-tools").join(ADB_BINARY),
        });
        strategies.push(LocateStrategy::CommonPaths(common_install_paths(env)));
        strategies.push(LocateStrategy::PathLookup {
            program: ADB_BINARY.to_string(),
            timeout: PATH_LOOKUP_TIMEOUT,
        });
        Self { strategies }
    }

    pub fn with_strategies(strategies: Vec<LocateStrategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[LocateStrategy] {
        &self.strategies
    }

    /// Path to the adb executable, or `None` when no strategy found one.
    pub async fn locate(&self, env: &Environment) -> Option<PathBuf> {
        for strategy in &self.strategies {
            if let Some(path) = try_strategy(strategy, env).await {
                info!("Using adb from {strategy:?}: {}", path.display());
                return Some(path);
            }
            debug!("adb not found via {strategy:?}");
        }
        None
    }
}

async fn try_strategy(strategy: &LocateStrategy, env: &Environment) -> Option<PathBuf> {
    match strategy {
        LocateStrategy::HostSdk(service) => service.adb_path().filter(|p| p.exists()),
        LocateStrategy::SdkEnvVars { vars, subpath } => vars
            .iter()
            .filter_map(|name| env.var(name))
            .map(|root| Path::new(root).join(subpath))
            .find(|candidate| candidate.exists()),
        LocateStrategy::CommonPaths(paths) => paths.iter().find(|p| p.exists()).cloned(),
        LocateStrategy::PathLookup { program, timeout } => lookup_on_path(program, *timeout).await,
    }
}

fn common_install_paths(env: &Environment) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if cfg!(windows) {
        if let Some(local) = env.var("LOCALAPPDATA") {
            paths.push(
                Path::new(local)
                    .join("Android")
                    .join("Sdk")
                    .join("platform-tools")
                    .join(ADB_BINARY),
            );
        }
        return paths;
    }
    if let Some(home) = &env.home {
        paths.push(home.join("Library/Android/sdk/platform-tools").join(ADB_BINARY));
        paths.push(home.join("Android/Sdk/platform-tools").join(ADB_BINARY));
    }
    paths.extend(
        ["/usr/local/bin/adb", "/opt/homebrew/bin/adb", "/usr/bin/adb"]
            .iter()
            .map(PathBuf::from),
    );
    paths
}

async fn lookup_on_path(program: &str, timeout: Duration) -> Option<PathBuf> {
    let finder = if cfg!(windows) { "where" } else { "which" };
    let output = Command::new(finder)
        .arg(program)
        .kill_on_drop(true)
        .output();
    let output = match tokio::time::timeout(timeout, output).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            debug!("Failed to run '{finder} {program}': {e}");
            return None;
        }
        Err(_) => {
            debug!("'{finder} {program}' timed out after {timeout:?}");
            return None;
        }
    };
    if !output.status.success() {
        return None;
    }
    first_line(&String::from_utf8_lossy(&output.stdout)).map(PathBuf::from)
}

fn first_line(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}
