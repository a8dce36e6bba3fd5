use clap::Parser;
use site_book::BookConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "site-book")]
#[command(about = "Crawls a documentation site and binds it into one PDF")]
#[command(version)]
pub struct Args {
    /// Seed URL to crawl from
    #[arg(required_unless_present = "config")]
    pub url: Option<String>,

    /// JSON configuration file; command-line values override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Substring every followed link must contain (defaults to the seed's path)
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Maximum link hops from the seed
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Maximum number of pages to discover
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Output directory
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Number of pages rendered at once
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Title printed on the cover
    #[arg(long)]
    pub title: Option<String>,

    /// Subtitle printed on the cover
    #[arg(long)]
    pub subtitle: Option<String>,

    /// Name article files by discovery order instead of a random suffix
    #[arg(long)]
    pub stable_filenames: bool,

    /// Delete the individual PDFs after merging
    #[arg(long)]
    pub no_keep_separate: bool,

    /// Leave the individual PDFs next to the merged file
    #[arg(long)]
    pub no_organize: bool,

    /// Pause between crawl visits, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// WebDriver server URL
    #[arg(long)]
    pub webdriver_url: Option<String>,
}

/// Builds the run configuration from the optional file and the flags
pub fn build_config(args: &Args) -> site_book::Result<BookConfig> {
    let mut config = match (&args.config, &args.url) {
        (Some(path), _) => BookConfig::from_file(path)?,
        (None, Some(url)) => BookConfig::new(url),
        (None, None) => BookConfig::new(""),
    };

    if let Some(url) = &args.url {
        config.start_url = url.clone();
    }
    if let Some(pattern) = &args.pattern {
        config.url_pattern = Some(pattern.clone());
    }
    if let Some(depth) = args.depth {
        config.max_depth = depth;
    }
    if let Some(max_pages) = args.max_pages {
        config.max_pages = max_pages;
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = Some(output_dir.clone());
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency.max(1);
    }
    if let Some(title) = &args.title {
        config.document_title = Some(title.clone());
    }
    if let Some(subtitle) = &args.subtitle {
        config.cover_subtitle = subtitle.clone();
    }
    if args.stable_filenames {
        config.stable_filenames = true;
    }
    if args.no_keep_separate {
        config.keep_separate = false;
    }
    if args.no_organize {
        config.organize = false;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.crawl_delay_ms = delay_ms;
    }
    if let Some(webdriver_url) = &args.webdriver_url {
        config.webdriver_url = webdriver_url.clone();
    }

    // surface a bad seed before any browser work starts
    config.seed_url()?;
    Ok(config)
}
