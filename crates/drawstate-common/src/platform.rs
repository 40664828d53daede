use std::path::PathBuf;

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV: &str = "DRAWSTATE_CONFIG";

/// File name of the layer configuration.
pub const CONFIG_FILE_NAME: &str = "drawstate.toml";

/// Returns the system-wide configuration path for this platform.
pub fn system_config_path() -> PathBuf {
    #[cfg(windows)]
    {
        let programdata = std::env::var("PROGRAMDATA")
            .unwrap_or_else(|_| r"C:\ProgramData".to_string());
        PathBuf::from(programdata).join("DrawState").join(CONFIG_FILE_NAME)
    }
    #[cfg(not(windows))]
    {
        PathBuf::from("/etc/drawstate").join(CONFIG_FILE_NAME)
    }
}

/// Returns the config file path the layer should read.
/// Search order:
/// 1. `$DRAWSTATE_CONFIG`
/// 2. System-wide config (see [`system_config_path`])
/// 3. Local fallback: `./drawstate.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    let system_path = system_config_path();
    if system_path.exists() {
        return system_path;
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Returns the platform name string.
pub fn platform_name() -> &'static str {
    #[cfg(target_os = "windows")]
    { "windows" }
    #[cfg(target_os = "linux")]
    { "linux" }
    #[cfg(target_os = "macos")]
    { "macos" }
    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    { "unknown" }
}
