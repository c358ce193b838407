use crate::config::{Category, FilterConfig, LensConfig};
use crate::stream::Input;
use clap::{ArgAction, Args, Parser, ValueEnum};
use std::path::PathBuf;

/// Correlate interleaved, request-tagged Rails log lines into one summary per request
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log file to read; standard input when omitted or "-"
    pub input: Option<PathBuf>,

    /// Keep reading the file as it grows (like tail -f)
    #[arg(short, long)]
    pub follow: bool,

    /// Output format
    #[arg(short = 'F', long, value_enum, default_value_t = OutputFormat::Text, env = "REQUEST_LENS_FORMAT")]
    pub format: OutputFormat,

    /// When to colorize text output
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, env = "REQUEST_LENS_COLOR")]
    pub color: ColorMode,

    /// Print engine statistics to stderr when the input ends
    #[arg(long)]
    pub stats: bool,

    /// Increase diagnostic verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "REQUEST_LENS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum number of requests tracked at once
    #[arg(long, value_parser = parse_capacity, env = "REQUEST_LENS_CAPACITY")]
    pub capacity: Option<usize>,

    /// Completion status from which a request is kept for trailing diagnostics
    #[arg(long, env = "REQUEST_LENS_KEEP_STATUS")]
    pub keep_status: Option<u16>,

    /// Substring marking application debug lines
    #[arg(long, env = "REQUEST_LENS_DEBUG_MARKER")]
    pub debug_marker: Option<String>,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub display: DisplayArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable, colorized blocks
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Forces `colored` on or off; `Auto` leaves terminal detection alone.
    pub fn apply(self) {
        match self {
            ColorMode::Always => colored::control::set_override(true),
            ColorMode::Never => colored::control::set_override(false),
            ColorMode::Auto => {}
        }
    }
}

fn parse_capacity(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("capacity must be at least 1".to_string()),
        Ok(capacity) => Ok(capacity),
        Err(e) => Err(e.to_string()),
    }
}

/// Record exclusion and entry hiding patterns (regular expressions)
#[derive(Args, Debug, Clone, Default)]
#[command(next_help_heading = "Filters")]
pub struct FilterArgs {
    /// Suppress requests whose path matches
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_EXCLUDE")]
    pub exclude: Option<String>,

    /// Only emit requests whose path matches
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_INCLUDE_PATH")]
    pub include_path: Option<String>,

    /// Suppress requests whose path matches
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_EXCLUDE_PATH")]
    pub exclude_path: Option<String>,

    /// Suppress requests handled by a matching controller
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_EXCLUDE_CONTROLLER")]
    pub exclude_controller: Option<String>,

    /// Suppress requests handled by a matching action
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_EXCLUDE_ACTION")]
    pub exclude_action: Option<String>,

    /// Suppress requests whose "Controller#action" matches
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_EXCLUDE_CONTROLLER_ACTION")]
    pub exclude_controller_action: Option<String>,

    /// Suppress requests whose raw parameters match
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_EXCLUDE_PARAMS")]
    pub exclude_params: Option<String>,

    /// Suppress requests whose status code matches
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_EXCLUDE_STATUS")]
    pub exclude_status: Option<String>,

    /// Suppress requests with a matching sql entry
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_EXCLUDE_SQL")]
    pub exclude_sql: Option<String>,

    /// Suppress requests with a matching debug entry
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_EXCLUDE_LOG")]
    pub exclude_log: Option<String>,

    /// Suppress requests with a matching error entry
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_EXCLUDE_ERROR")]
    pub exclude_error: Option<String>,

    /// Drop matching source references from the output
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_HIDE_RB")]
    pub hide_rb: Option<String>,

    /// Drop matching template renders from the output
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_HIDE_HTML")]
    pub hide_html: Option<String>,

    /// Drop matching debug entries from the output
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_HIDE_LOG")]
    pub hide_log: Option<String>,

    /// Drop matching sql entries from the output
    #[arg(long, value_name = "REGEX", env = "REQUEST_LENS_HIDE_SQL")]
    pub hide_sql: Option<String>,
}

impl FilterArgs {
    /// Overlays every pattern given on the command line onto `filters`.
    pub fn apply_to(&self, filters: &mut FilterConfig) {
        let overrides = [
            (&mut filters.exclude, &self.exclude),
            (&mut filters.include_path, &self.include_path),
            (&mut filters.exclude_path, &self.exclude_path),
            (&mut filters.exclude_controller, &self.exclude_controller),
            (&mut filters.exclude_action, &self.exclude_action),
            (
                &mut filters.exclude_controller_action,
                &self.exclude_controller_action,
            ),
            (&mut filters.exclude_params, &self.exclude_params),
            (&mut filters.exclude_status, &self.exclude_status),
            (&mut filters.exclude_sql, &self.exclude_sql),
            (&mut filters.exclude_log, &self.exclude_log),
            (&mut filters.exclude_error, &self.exclude_error),
            (&mut filters.hide_rb, &self.hide_rb),
            (&mut filters.hide_html, &self.hide_html),
            (&mut filters.hide_log, &self.hide_log),
            (&mut filters.hide_sql, &self.hide_sql),
        ];
        for (target, value) in overrides {
            if let Some(value) = value {
                *target = Some(value.clone());
            }
        }
    }
}

/// Sections to show; with none selected every section is shown
#[derive(Args, Debug, Clone, Default)]
#[command(next_help_heading = "Display")]
pub struct DisplayArgs {
    /// Show request parameters
    #[arg(long)]
    pub params: bool,
    /// Show every data-access entry
    #[arg(long)]
    pub sql: bool,
    /// Show template renders
    #[arg(long)]
    pub html: bool,
    /// Show application source references
    #[arg(long)]
    pub rb: bool,
    /// Show debug entries
    #[arg(long)]
    pub log: bool,
    /// Show errors
    #[arg(long)]
    pub error: bool,
    /// Show reads
    #[arg(long)]
    pub read: bool,
    /// Show inserts
    #[arg(long)]
    pub create: bool,
    /// Show updates
    #[arg(long)]
    pub update: bool,
    /// Show deletes
    #[arg(long)]
    pub delete: bool,
    /// Show transaction boundaries
    #[arg(long)]
    pub transaction: bool,
}

impl DisplayArgs {
    pub fn selected(&self) -> Vec<Category> {
        [
            (self.params, Category::Params),
            (self.sql, Category::Sql),
            (self.html, Category::Html),
            (self.rb, Category::Rb),
            (self.log, Category::Log),
            (self.error, Category::Error),
            (self.read, Category::Read),
            (self.create, Category::Create),
            (self.update, Category::Update),
            (self.delete, Category::Delete),
            (self.transaction, Category::Transaction),
        ]
        .into_iter()
        .filter_map(|(on, category)| on.then_some(category))
        .collect()
    }
}

impl Cli {
    pub fn input(&self) -> Input {
        match &self.input {
            Some(path) if path.as_os_str() != "-" => Input::File {
                path: path.clone(),
                follow: self.follow,
            },
            _ => Input::Stdin,
        }
    }

    /// Applies command line and environment overrides on top of a loaded
    /// configuration.
    pub fn apply_to(&self, config: &mut LensConfig) {
        if let Some(capacity) = self.capacity {
            config.engine.capacity = capacity;
        }
        if let Some(status) = self.keep_status {
            config.engine.keep_status_threshold = status;
        }
        if let Some(marker) = &self.debug_marker {
            config.engine.debug_marker = marker.clone();
        }
        self.filters.apply_to(&mut config.filters);

        let selected = self.display.selected();
        if !selected.is_empty() {
            config.display.show = selected;
        }
    }
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "request-lens",
            "--capacity",
            "10",
            "--exclude-path",
            "^/health",
            "--sql",
            "--rb",
            "app.log",
        ])
        .expect("valid args");

        let mut config = LensConfig::default();
        config.filters.exclude_path = Some("^/old".to_string());
        config.filters.hide_sql = Some("SCHEMA".to_string());
        cli.apply_to(&mut config);

        assert_eq!(config.engine.capacity, 10);
        assert_eq!(config.filters.exclude_path.as_deref(), Some("^/health"));
        assert_eq!(config.filters.hide_sql.as_deref(), Some("SCHEMA"));
        assert_eq!(config.display.show, vec![Category::Sql, Category::Rb]);
        assert_eq!(
            cli.input(),
            Input::File {
                path: PathBuf::from("app.log"),
                follow: false
            }
        );
    }

    #[test]
    fn test_dash_means_stdin() {
        let cli = Cli::try_parse_from(["request-lens", "-"]).expect("valid args");
        assert_eq!(cli.input(), Input::Stdin);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(Cli::try_parse_from(["request-lens", "--capacity", "0"]).is_err());
    }
}
