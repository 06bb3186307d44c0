// autospeed command-line arguments
// (c) 2024 Ross Younger

use std::path::PathBuf;

use clap::Parser;

use crate::settings::DEFAULT_SETTINGS_FILE;

#[derive(Debug, Parser, Clone)]
#[command(
    author,
    version(env!("AUTOSPEED_VERSION_STRING")),
    about,
    infer_long_args(true)
)]
#[command(help_template(
    "\
{name} version {version}
{about-with-newline}
{usage-heading} {usage}
{before-help}
{all-args}{after-help}
"
))]
#[command(styles=super::styles::CLAP_STYLES)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CliArgs {
    /// The settings file to use.
    ///
    /// If it does not exist, it is created containing the default settings.
    #[arg(short = 'c', long, value_name("FILE"), default_value(DEFAULT_SETTINGS_FILE))]
    pub settings: PathBuf,

    /// Outputs the settings that would be used, and where each came from, then exits
    #[arg(long, action, help_heading("Settings"))]
    pub show_settings: bool,

    /// Quiet mode
    ///
    /// The console shows only errors. The event log file is unaffected.
    #[arg(short, long, action, conflicts_with("debug"))]
    pub quiet: bool,

    /// Enable detailed debug output
    ///
    /// This has the same effect as setting `RUST_LOG=autospeed=trace` in the environment.
    /// If present, `RUST_LOG` overrides this option.
    #[arg(short, long, action, help_heading("Debug"))]
    pub debug: bool,

    /// Logs the elapsed time of each phase after every test
    #[arg(long, action, help_heading("Debug"))]
    pub profile: bool,
}

impl CliArgs {
    /// Trace level for the console
    pub(crate) fn console_level(&self) -> &'static str {
        if self.debug {
            "trace"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    /// Trace level for the event log file
    pub(crate) fn file_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use clap::Parser as _;

    use super::CliArgs;

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["autospeed"]).unwrap();
        assert_eq!(args.settings, Path::new("./settings.toml"));
        assert!(!args.show_settings);
        assert_eq!(args.console_level(), "info");
        assert_eq!(args.file_level(), "info");
    }

    #[test]
    fn settings_path() {
        let args = CliArgs::try_parse_from(["autospeed", "-c", "/etc/autospeed.toml"]).unwrap();
        assert_eq!(args.settings, Path::new("/etc/autospeed.toml"));
    }

    #[test]
    fn quiet_affects_console_only() {
        let args = CliArgs::try_parse_from(["autospeed", "-q"]).unwrap();
        assert_eq!(args.console_level(), "error");
        assert_eq!(args.file_level(), "info");
    }

    #[test]
    fn debug() {
        let args = CliArgs::try_parse_from(["autospeed", "--debug"]).unwrap();
        assert_eq!(args.console_level(), "trace");
        assert_eq!(args.file_level(), "debug");
    }

    #[test]
    fn quiet_and_debug_conflict() {
        assert!(CliArgs::try_parse_from(["autospeed", "-q", "-d"]).is_err());
    }

    #[test]
    fn command_is_consistent() {
        use clap::CommandFactory as _;
        CliArgs::command().debug_assert();
    }
}
