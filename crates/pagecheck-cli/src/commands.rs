//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use pagecheck::Category;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Pagecheck: exercise every button, link and form on a page
#[derive(Parser, Debug)]
#[command(name = "pagecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the element checks against a page
    Check(CheckArgs),

    /// Compose a buggy page from the fixture catalog
    Generate(GenerateArgs),

    /// List fixture bug families
    Bugs,

    /// Ask a model how to fix the failures in a saved report
    Suggest(SuggestArgs),

    /// Serve fixtures, checks and suggestions over HTTP
    Serve(ServeArgs),
}

/// Arguments for the check command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct CheckArgs {
    /// File path, URL or inline HTML
    pub source: String,

    /// Categories to run (default: all)
    #[arg(short, long = "category", value_name = "CATEGORY")]
    pub categories: Vec<CategoryArg>,

    /// Page driver
    #[arg(long, default_value = "static")]
    pub driver: DriverArg,

    /// One session per category, run concurrently
    #[arg(long)]
    pub isolated: bool,

    /// Skip destination probes for links
    #[arg(long)]
    pub no_network: bool,

    /// Do not click links
    #[arg(long)]
    pub no_click_links: bool,

    /// Base URL for relative links in inline or file sources
    #[arg(long)]
    pub base_url: Option<String>,

    /// Engine configuration (YAML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: FormatArg,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Exit non-zero when any element failed
    #[arg(long)]
    pub fail_on_defects: bool,
}

/// Arguments for the generate command
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Bug family keys (see `pagecheck bugs`)
    #[arg(short, long = "bug", value_name = "KEY", required = true)]
    pub bugs: Vec<String>,

    /// Variant index, wrapped to each family's size
    #[arg(long, default_value = "0")]
    pub variant: usize,

    /// Write the page to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Run the static checks on the generated page
    #[arg(long)]
    pub check: bool,
}

/// Arguments for the suggest command
#[derive(Parser, Debug)]
pub struct SuggestArgs {
    /// JSON report written by `pagecheck check --format json`
    pub report: PathBuf,

    /// Maximum number of failures to ask about
    #[arg(short, long, default_value = "5")]
    pub limit: usize,

    /// Model name
    #[arg(long, default_value = "gpt-4")]
    pub model: String,

    /// OpenAI-compatible server base URL
    #[arg(long, default_value = "https://api.openai.com")]
    pub base_url: String,

    /// API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: SocketAddr,

    /// Directory for generated pages
    #[arg(short, long, default_value = "generated_html")]
    pub dir: PathBuf,

    /// Model name for suggestions
    #[arg(long, default_value = "gpt-4")]
    pub model: String,

    /// OpenAI-compatible server base URL
    #[arg(long, default_value = "https://api.openai.com")]
    pub llm_base_url: String,

    /// API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Category selector
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryArg {
    /// Buttons
    #[value(alias = "button")]
    Buttons,
    /// Links
    #[value(alias = "link")]
    Links,
    /// Forms
    #[value(alias = "form")]
    Forms,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Buttons => Self::Buttons,
            CategoryArg::Links => Self::Links,
            CategoryArg::Forms => Self::Forms,
        }
    }
}

/// Page driver selector
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverArg {
    /// In-process DOM, no JavaScript
    #[default]
    Static,
    /// Headless Chromium
    Chromium,
}

/// Report format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_verify_cli() {
            use clap::CommandFactory;
            Cli::command().debug_assert();
        }

        #[test]
        fn test_global_flags() {
            let cli = Cli::try_parse_from(["pagecheck", "-vv", "--color", "never", "bugs"]).unwrap();
            assert_eq!(cli.verbose, 2);
            assert!(matches!(cli.color, ColorArg::Never));
            assert!(matches!(cli.command, Commands::Bugs));
        }
    }

    mod check_tests {
        use super::*;

        #[test]
        fn test_check_defaults() {
            let cli = Cli::try_parse_from(["pagecheck", "check", "page.html"]).unwrap();
            let Commands::Check(args) = cli.command else {
                panic!("expected check");
            };
            assert_eq!(args.source, "page.html");
            assert!(args.categories.is_empty());
            assert_eq!(args.driver, DriverArg::Static);
            assert_eq!(args.format, FormatArg::Text);
            assert!(!args.fail_on_defects);
        }

        #[test]
        fn test_repeated_categories_with_aliases() {
            let cli = Cli::try_parse_from([
                "pagecheck", "check", "x.html", "-c", "link", "--category", "forms",
            ])
            .unwrap();
            let Commands::Check(args) = cli.command else {
                panic!("expected check");
            };
            let categories: Vec<Category> = args.categories.into_iter().map(Into::into).collect();
            assert_eq!(categories, vec![Category::Links, Category::Forms]);
        }

        #[test]
        fn test_unknown_driver_rejected() {
            assert!(Cli::try_parse_from(["pagecheck", "check", "x", "--driver", "gecko"]).is_err());
        }
    }

    mod generate_tests {
        use super::*;

        #[test]
        fn test_generate_requires_a_bug() {
            assert!(Cli::try_parse_from(["pagecheck", "generate"]).is_err());
        }

        #[test]
        fn test_generate_args() {
            let cli = Cli::try_parse_from([
                "pagecheck", "generate", "-b", "broken_link", "-b", "empty_button", "--variant", "1",
            ])
            .unwrap();
            let Commands::Generate(args) = cli.command else {
                panic!("expected generate");
            };
            assert_eq!(args.bugs, vec!["broken_link", "empty_button"]);
            assert_eq!(args.variant, 1);
            assert!(!args.check);
        }
    }

    mod serve_tests {
        use super::*;

        #[test]
        fn test_serve_defaults() {
            let cli = Cli::try_parse_from(["pagecheck", "serve"]).unwrap();
            let Commands::Serve(args) = cli.command else {
                panic!("expected serve");
            };
            assert_eq!(args.addr.port(), 8000);
            assert_eq!(args.dir, PathBuf::from("generated_html"));
        }
    }
}
