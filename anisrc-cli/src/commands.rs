use crate::{
    cli::OutputFormat,
    config::AppConfig,
    error::{CliError, Result},
    output::{OutputManager, write_output},
};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use sources_parser::{
    Anime, AnimeSource, Episode, HosterFactory, SearchFilters, SourceConfig, available_sources,
    create_source, extractor::default::client_with_timeout, source::pagination::collect_pages,
};
use std::time::Duration;
use tracing::{debug, info};

/// Preferences given on the command line; they win over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub timeout: Option<u64>,
    pub quality: Option<String>,
    pub server: Option<String>,
    pub base_url: Option<String>,
    pub output: Option<OutputFormat>,
}

impl Overrides {
    fn source_config(&self) -> SourceConfig {
        SourceConfig {
            preferred_quality: self.quality.clone(),
            preferred_server: self.server.clone(),
            base_url_override: self.base_url.clone(),
            ..Default::default()
        }
    }
}

pub struct CommandExecutor {
    config: AppConfig,
    overrides: Overrides,
    client: Client,
    output_manager: OutputManager,
}

impl CommandExecutor {
    pub fn new(config: AppConfig, overrides: Overrides) -> Result<Self> {
        let timeout = Duration::from_secs(overrides.timeout.unwrap_or(config.timeout));
        let client = client_with_timeout(timeout)?;
        let output_manager = OutputManager::new(config.colored);
        Ok(Self {
            config,
            overrides,
            client,
            output_manager,
        })
    }

    pub fn output_format(&self) -> OutputFormat {
        self.overrides.output.unwrap_or(self.config.output_format)
    }

    /// Flags over the source's section over the shared defaults.
    fn source_config(&self, source_id: &str) -> SourceConfig {
        self.overrides
            .source_config()
            .merged_with(&self.config.source_config(source_id))
    }

    fn source(&self, source_id: &str) -> Result<Box<dyn AnimeSource>> {
        let config = self.source_config(source_id);
        debug!(source = %source_id, ?config, "Creating source");
        Ok(create_source(source_id, self.client.clone(), config)?)
    }

    pub fn list_sources(&self) -> Result<()> {
        let output = self
            .output_manager
            .format_sources(&available_sources(), &self.output_format())?;
        write_output(&output)
    }

    pub fn list_hosts(&self) -> Result<()> {
        let output = self.output_manager.format_hosts(&self.output_format())?;
        write_output(&output)
    }

    pub async fn popular(&self, source_id: &str, page: u32) -> Result<()> {
        let source = self.source(source_id)?;
        let result = source.popular(page).await?;
        self.print_page(&result.animes, Some(result.has_next_page))
    }

    pub async fn latest(&self, source_id: &str, page: u32) -> Result<()> {
        let source = self.source(source_id)?;
        let result = source.latest(page).await?;
        self.print_page(&result.animes, Some(result.has_next_page))
    }

    pub async fn search(
        &self,
        source_id: &str,
        query: &str,
        page: u32,
        raw_filters: &[String],
    ) -> Result<()> {
        let source = self.source(source_id)?;
        let filters = raw_filters
            .iter()
            .map(|raw| SearchFilters::parse(raw))
            .collect::<std::result::Result<SearchFilters, _>>()?;

        if let Some((key, _)) = filters
            .iter()
            .find(|(key, _)| !source.filter_keys().iter().any(|known| known == key))
        {
            return Err(CliError::invalid_argument(format!(
                "{} does not understand the filter '{key}' (known: {})",
                source.name(),
                source.filter_keys().join(", ")
            )));
        }

        let result = source.search(page, query, &filters).await?;
        self.print_page(&result.animes, Some(result.has_next_page))
    }

    /// Walk the popular listing until it ends or `max_pages` is reached.
    pub async fn catalog(&self, source_id: &str, max_pages: Option<u32>) -> Result<()> {
        let source = self.source(source_id)?;
        let max_pages = max_pages.unwrap_or_else(|| {
            self.source_config(source_id)
                .max_pages_or(self.config.max_pages)
        });

        let spinner = (self.output_format() == OutputFormat::Pretty).then(|| {
            Self::spinner(format!("Walking the {} catalog...", source.name()))
        });

        let result = collect_pages(1, max_pages, |page| {
            if let Some(pb) = &spinner {
                pb.set_message(format!("Fetching {} page {page}...", source.name()));
            }
            source.popular(page)
        })
        .await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        let animes = result?;
        info!(source = %source.id(), count = animes.len(), "Catalog walk finished");
        self.print_page(&animes, None)
    }

    pub async fn details(&self, source_id: &str, url: &str) -> Result<()> {
        let source = self.source(source_id)?;
        let anime = source.details(&Anime::from_url(url)).await?;
        let output = self
            .output_manager
            .format_details(&anime, &self.output_format())?;
        write_output(&output)
    }

    pub async fn episodes(&self, source_id: &str, url: &str) -> Result<()> {
        let source = self.source(source_id)?;
        let episodes = source.episodes(&Anime::from_url(url)).await?;
        let output = self
            .output_manager
            .format_episodes(&episodes, &self.output_format())?;
        write_output(&output)
    }

    pub async fn videos(&self, source_id: &str, episode_url: &str) -> Result<()> {
        let source = self.source(source_id)?;
        let episode = Episode::new(episode_url, "", 0.0);
        let videos = source.videos(&episode).await?;
        let output = self
            .output_manager
            .format_videos(&videos, &self.output_format())?;
        write_output(&output)
    }

    /// Resolve a single embed url, outside of any source.
    pub async fn resolve(&self, url: &str, prefix: &str) -> Result<()> {
        let factory = HosterFactory::new(self.client.clone());
        let videos = factory.try_videos_from_url(url, prefix).await?;
        let output = self
            .output_manager
            .format_videos(&videos, &self.output_format())?;
        write_output(&output)
    }

    fn print_page(&self, animes: &[Anime], has_next_page: Option<bool>) -> Result<()> {
        let output =
            self.output_manager
                .format_animes(animes, has_next_page, &self.output_format())?;
        write_output(&output)
    }

    fn spinner(message: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
            pb.set_style(style.tick_strings(&[
                "▹▹▹▹▹", "▸▹▹▹▹", "▹▸▹▹▹", "▹▹▸▹▹", "▹▹▹▸▹", "▹▹▹▹▸", "▪▪▪▪▪",
            ]));
        }
        pb.set_message(message);
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(config: AppConfig, overrides: Overrides) -> CommandExecutor {
        CommandExecutor::new(config, overrides).unwrap()
    }

    #[test]
    fn test_flags_win_over_configuration() {
        let config = AppConfig::from_toml(
            r#"
output_format = "csv"

[defaults]
preferred_quality = "720p"
preferred_sub_lang = "es"

[sources.animeflv]
preferred_server = "Okru"
"#,
        )
        .unwrap();
        let overrides = Overrides {
            quality: Some("1080".into()),
            ..Default::default()
        };
        let executor = executor(config, overrides);

        let merged = executor.source_config("animeflv");
        assert_eq!(merged.preferred_quality.as_deref(), Some("1080"));
        assert_eq!(merged.preferred_server.as_deref(), Some("Okru"));
        assert_eq!(merged.preferred_sub_lang.as_deref(), Some("es"));
        assert_eq!(executor.output_format(), OutputFormat::Csv);
    }

    #[test]
    fn test_output_flag_wins() {
        let overrides = Overrides {
            output: Some(OutputFormat::Json),
            ..Default::default()
        };
        assert_eq!(
            executor(AppConfig::default(), overrides).output_format(),
            OutputFormat::Json
        );
    }

    #[tokio::test]
    async fn test_unknown_filter_is_rejected_before_fetching() {
        let executor = executor(AppConfig::default(), Overrides::default());
        let result = executor
            .search("animeflv", "", 1, &["colour=red".to_string()])
            .await;
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let executor = executor(AppConfig::default(), Overrides::default());
        assert!(matches!(
            executor.popular("nope", 1).await,
            Err(CliError::Source(sources_parser::ExtractorError::UnknownSource(_)))
        ));
    }
}
