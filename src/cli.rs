use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{find_config_file, ConfigError, FileConfig, LogLevel, SEARCH_DIRS};
use crate::supervisor::TriggerConfig;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "a utility to monitor GPIO pin state and send a WOL packet",
    long_about = None
)]
pub struct Args {
    /// Config file. Defaults to the first wake.toml found in . or /etc/wake.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// GPIO pin number to monitor.
    #[arg(short, long)]
    pub pin: Option<u32>,

    /// MAC address to send the WOL packet to.
    #[arg(short, long, conflicts_with = "dry_run")]
    pub mac_address: Option<String>,

    /// Broadcast interface name.
    #[arg(short = 'i', long)]
    pub broadcast_interface: Option<String>,

    /// Log level.
    #[arg(short, long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// GPIO character device the pin belongs to.
    #[arg(long)]
    pub gpio_chip: Option<PathBuf>,

    /// UDP port of the broadcast.
    #[arg(long)]
    pub port: Option<u16>,

    /// Milliseconds between two samples of the pin.
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Dry run mode (do not send WOL packet).
    #[arg(long)]
    pub dry_run: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub trigger: TriggerConfig,
    pub log_level: LogLevel,
}

impl Args {
    /// The explicit `--config` path, or the first file found in the search path.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| find_config_file(&SEARCH_DIRS[..]))
    }

    /// Layers the command line over the file values.
    pub fn resolve(self, file: FileConfig) -> Result<Settings, ConfigError> {
        let poll_interval_ms = self.poll_interval_ms.unwrap_or(file.poll_interval_ms);
        if poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll interval must be at least 1 ms".to_string(),
            ));
        }

        let port = self.port.unwrap_or(file.port);
        if port == 0 {
            return Err(ConfigError::Invalid("port must not be 0".to_string()));
        }

        Ok(Settings {
            trigger: TriggerConfig {
                pin: self.pin.unwrap_or(file.pin),
                mac_address: self.mac_address.unwrap_or(file.mac_address),
                interface: self.broadcast_interface.unwrap_or(file.interface),
                dry_run: self.dry_run,
                gpio_chip: self.gpio_chip.unwrap_or(file.gpio_chip),
                port,
                poll_interval: Duration::from_millis(poll_interval_ms),
            },
            log_level: self.log_level.unwrap_or(file.log_level),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("wake").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_flags_uses_file_values() {
        let file = FileConfig {
            pin: 17,
            interface: "eth0".to_string(),
            ..FileConfig::default()
        };

        let settings = parse(&[]).resolve(file).unwrap();

        assert_eq!(settings.trigger.pin, 17);
        assert_eq!(settings.trigger.interface, "eth0");
        assert_eq!(settings.trigger.mac_address, "11:22:33:44:55:66");
        assert_eq!(settings.trigger.poll_interval, Duration::from_millis(100));
        assert_eq!(settings.trigger.port, 9);
        assert!(!settings.trigger.dry_run);
        assert_eq!(settings.log_level, LogLevel::Info);
    }

    #[test]
    fn test_flags_override_file() {
        let settings = parse(&[
            "--pin",
            "5",
            "--mac-address",
            "AA:BB:CC:DD:EE:FF",
            "--broadcast-interface",
            "eth1",
            "--log-level",
            "debug",
            "--port",
            "7",
            "--poll-interval-ms",
            "50",
            "--gpio-chip",
            "/dev/gpiochip4",
        ])
        .resolve(FileConfig::default())
        .unwrap();

        assert_eq!(settings.trigger.pin, 5);
        assert_eq!(settings.trigger.mac_address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(settings.trigger.interface, "eth1");
        assert_eq!(settings.trigger.port, 7);
        assert_eq!(settings.trigger.poll_interval, Duration::from_millis(50));
        assert_eq!(settings.trigger.gpio_chip, PathBuf::from("/dev/gpiochip4"));
        assert_eq!(settings.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_dry_run_flag() {
        let settings = parse(&["--dry-run"]).resolve(FileConfig::default()).unwrap();
        assert!(settings.trigger.dry_run);
    }

    #[test]
    fn test_dry_run_conflicts_with_mac_address() {
        let result = Args::try_parse_from([
            "wake",
            "--dry-run",
            "--mac-address",
            "AA:BB:CC:DD:EE:FF",
        ]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        assert!(Args::try_parse_from(["wake", "--log-level", "verbose"]).is_err());
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let err = parse(&["--poll-interval-ms", "0"])
            .resolve(FileConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_port_from_file_is_rejected() {
        let file = FileConfig {
            port: 0,
            ..FileConfig::default()
        };
        assert!(matches!(
            parse(&[]).resolve(file),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let args = parse(&["--config", "/tmp/elsewhere.toml"]);
        assert_eq!(args.config_path(), Some(PathBuf::from("/tmp/elsewhere.toml")));
    }

    #[test]
    fn test_clap_definition_is_valid() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
