use clap::Parser;
use site_book::Book;
use std::process::ExitCode;

mod args;
use args::{Args, build_config};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();
    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    ::log::info!("Building book from: {}", config.start_url);
    println!("Note: rendering requires a WebDriver server (e.g., ChromeDriver).");
    println!(
        "Set WEBDRIVER_URL or --webdriver-url if not using the default {}",
        config.webdriver_url
    );

    let start_time = std::time::Instant::now();
    match Book::new(config).build().await {
        Ok(summary) => {
            ::log::info!(
                "Finished in {:.2} seconds",
                start_time.elapsed().as_secs_f64()
            );
            if !summary.converged {
                ::log::warn!("Contents page numbers may be off by a page");
            }
            println!(
                "Created {} ({} sections, {} contents pages)",
                summary.path.display(),
                summary.sections.len(),
                summary.contents_pages
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            ::log::error!("Failed to build book: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
