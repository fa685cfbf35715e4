use anyhow::{Context, Result};
use clap::Parser;
use makemessages::backend::BackendKind;
use makemessages::commands::extract;
use makemessages::config::Config;
use makemessages::logging::{self, LogLevel};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "makemessages")]
#[command(author, version, about = "Extract translatable strings from Go packages and templates into gettext catalogs", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directories to scan for templates (comma separated)
    #[arg(short = 't', long, value_delimiter = ',')]
    template_paths: Vec<String>,

    /// Template file extensions (default: .html)
    #[arg(short = 'e', long, value_delimiter = ',')]
    template_extensions: Vec<String>,

    /// Go package directories (comma separated)
    #[arg(short = 'p', long, value_delimiter = ',')]
    package_paths: Vec<String>,

    /// Scan package directories recursively
    #[arg(short, long)]
    recursive: bool,

    /// Output directory (default: locales)
    #[arg(short, long)]
    output: Option<String>,

    /// Languages to write catalogs for (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    languages: Vec<String>,

    /// Catalog normalize/merge implementation
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// error, warn, info or debug
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Command line values win over the configuration file.
    fn apply(self, config: &mut Config) {
        if !self.template_paths.is_empty() {
            config.template_paths = self.template_paths;
        }
        if !self.template_extensions.is_empty() {
            config.template_extensions = self.template_extensions;
        }
        if !self.package_paths.is_empty() {
            config.package_paths = self.package_paths;
        }
        if self.recursive {
            config.recursive = true;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if !self.languages.is_empty() {
            config.languages = self.languages;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = LogLevel::parse(&cli.log_level)
        .with_context(|| format!("Unknown log level: {}", cli.log_level))?;
    logging::set_level(level);

    let mut config = Config::load_or_default(cli.config.as_ref())?;
    cli.apply(&mut config);

    extract::run(&config)?;
    Ok(())
}
