//! Command line arguments and config source paths.

use std::path::PathBuf;

use clap::Parser;

/// A configuration source - either a single file or a directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigPath {
    File(PathBuf),
    Dir(PathBuf),
}

impl ConfigPath {
    /// Files first, then directories, preserving the order within each group.
    pub fn from_cli_args(config_files: &[PathBuf], config_dirs: &[PathBuf]) -> Vec<Self> {
        config_files
            .iter()
            .cloned()
            .map(ConfigPath::File)
            .chain(config_dirs.iter().cloned().map(ConfigPath::Dir))
            .collect()
    }
}

/// Check if a path has a YAML extension.
pub fn is_yaml_file(path: &std::path::Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    )
}

#[derive(Parser, Debug)]
#[command(version, about = "Drive delivery-slot forecasts through the managed forecasting service")]
pub struct CliArgs {
    /// Path to configuration file (can be specified multiple times)
    #[arg(short, long)]
    pub config: Vec<PathBuf>,

    /// Path to configuration directory (can be specified multiple times)
    #[arg(short = 'C', long = "config-dir")]
    pub config_dirs: Vec<PathBuf>,

    /// Only run the named pipelines (default: all configured pipelines)
    #[arg(short, long = "pipeline")]
    pub pipelines: Vec<String>,
}

impl CliArgs {
    pub fn config_paths(&self) -> Vec<ConfigPath> {
        ConfigPath::from_cli_args(&self.config, &self.config_dirs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_is_yaml_file() {
        assert!(is_yaml_file(Path::new("pipelines.yaml")));
        assert!(is_yaml_file(Path::new("pipelines.yml")));
        assert!(!is_yaml_file(Path::new("pipelines.toml")));
        assert!(!is_yaml_file(Path::new("README")));
    }

    #[test]
    fn test_cli_args_ordering() {
        let args = CliArgs::parse_from([
            "slotcast",
            "-C",
            "conf.d",
            "-c",
            "base.yaml",
            "--pipeline",
            "daily",
        ]);
        assert_eq!(
            args.config_paths(),
            vec![
                ConfigPath::File("base.yaml".into()),
                ConfigPath::Dir("conf.d".into())
            ]
        );
        assert_eq!(args.pipelines, vec!["daily".to_string()]);
    }
}
