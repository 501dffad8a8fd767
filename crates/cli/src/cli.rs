use crate::tracing::LogLevel;
use clap::Parser;
use semrel_release::{BranchConfig, ReleaseOptions};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "semrel")]
#[command(about = "Automated semantic versioning and release publishing from commit history")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(short = 'd', long, help = "Compute the next release without tagging or publishing")]
    pub dry_run: bool,

    #[arg(long, help = "Skip the CI environment and pull request checks")]
    pub no_ci: bool,

    #[arg(
        short = 'b',
        long,
        value_delimiter = ',',
        num_args = 1..,
        help = "Branches to release from, replacing the configured ones"
    )]
    pub branches: Vec<String>,

    #[arg(short = 'r', long, help = "Git repository URL")]
    pub repository_url: Option<String>,

    #[arg(short = 't', long, help = "Git tag format, containing {version}")]
    pub tag_format: Option<String>,

    #[arg(short = 'c', long, help = "Configuration file [default: <cwd>/.releaserc.toml]")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Repository directory", default_value = ".")]
    pub cwd: PathBuf,

    #[arg(
        short = 'l',
        long,
        help = "Set logging level",
        default_value = "info",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(long, help = "Tracing filter directive such as 'semrel_release=trace', overriding --level")]
    pub log_filter: Option<String>,

    #[arg(long, help = "Print the result and logs as JSON")]
    pub json: bool,
}

impl Cli {
    /// Layer the command line flags over file options.
    pub fn apply(&self, options: &mut ReleaseOptions) {
        if self.dry_run {
            options.dry_run = true;
        }
        if self.no_ci {
            options.ci = false;
        }
        if !self.branches.is_empty() {
            options.branches = self.branches.iter().map(BranchConfig::named).collect();
        }
        if let Some(url) = &self.repository_url {
            options.repository_url = Some(url.clone());
        }
        if let Some(format) = &self.tag_format {
            options.tag_format.clone_from(format);
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
