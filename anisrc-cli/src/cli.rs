use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "anisrc", author, version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file
    #[arg(long, global = true, env = "ANISRC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides the configuration)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Preferred quality, e.g. "1080p"
    #[arg(long, global = true)]
    pub quality: Option<String>,

    /// Preferred server or host, e.g. "Okru"
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Custom domain replacing the source's built-in base url
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Output format (overrides the configuration)
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the available sources
    Sources,

    /// List the video hosts that can be resolved
    Hosts,

    /// Fetch a page of the popular listing
    Popular {
        source: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Fetch a page of the latest updates
    Latest {
        source: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Search a source
    Search {
        source: String,
        /// Free-text query; may be empty when filters are given
        #[arg(default_value = "")]
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        /// Search filter as key=value, repeatable
        #[arg(short, long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },

    /// Walk the popular listing page by page
    Catalog {
        source: String,
        /// Upper bound on the pages fetched
        #[arg(long)]
        max_pages: Option<u32>,
    },

    /// Show the detail page of an entry
    Details { source: String, url: String },

    /// List the episodes of an entry
    Episodes { source: String, url: String },

    /// List the ranked video candidates of an episode
    Videos { source: String, episode_url: String },

    /// Resolve an embed url with the matching host decoder
    Resolve {
        url: String,
        /// Label prefix added to every quality
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Manage configuration
    Config {
        /// Show the current configuration
        #[arg(long)]
        show: bool,
        /// Reset the configuration to defaults
        #[arg(long)]
        reset: bool,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
    JsonCompact,
    Table,
    Csv,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::JsonCompact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_search_with_filters() {
        let args = Args::try_parse_from([
            "anisrc", "search", "anizm", "naruto", "-f", "year=2002", "-f", "genre=Aksiyon",
            "--quality", "1080p",
        ])
        .unwrap();
        assert_eq!(args.quality.as_deref(), Some("1080p"));
        match args.command {
            Commands::Search {
                source,
                query,
                page,
                filters,
            } => {
                assert_eq!(source, "anizm");
                assert_eq!(query, "naruto");
                assert_eq!(page, 1);
                assert_eq!(filters, ["year=2002", "genre=Aksiyon"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["anisrc", "-v", "-q", "sources"]).is_err());
    }
}
