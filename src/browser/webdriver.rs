use crate::browser::{BrowserEngine, BrowserPage, PrintOptions};
use crate::error::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use fantoccini::wd::{Capabilities, WebDriverCompatibleCommand};
use fantoccini::{Client, ClientBuilder};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Drivers commonly listening locally, tried when the configured one is down
const FALLBACK_WEBDRIVER_URLS: [&str; 4] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// Stops live media so printing does not wait on streams
const QUIESCE_MEDIA_SCRIPT: &str = r#"
    document.querySelectorAll('audio, video').forEach((el) => {
        try { el.pause(); } catch (e) {}
        el.removeAttribute('src');
        el.querySelectorAll('source').forEach((s) => s.remove());
        el.load();
    });
    return true;
"#;

/// Browser engine backed by a WebDriver server.
///
/// Sessions are pooled: a page lease takes an idle session (or connects a new
/// one) and hands it back on close.
pub struct WebDriverEngine {
    webdriver_url: String,
    idle: Arc<Mutex<Vec<Client>>>,
}

impl WebDriverEngine {
    pub fn new(webdriver_url: &str) -> Self {
        Self {
            webdriver_url: webdriver_url.to_string(),
            idle: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Ends every pooled session
    pub async fn shutdown(&self) {
        let clients = std::mem::take(&mut *self.idle.lock().await);
        ::log::debug!("Closing {} WebDriver sessions", clients.len());
        for client in clients {
            if let Err(e) = client.close().await {
                ::log::warn!("Failed to close WebDriver session: {}", e);
            }
        }
    }
}

impl BrowserEngine for WebDriverEngine {
    type Page = WebDriverPage;

    async fn open_page(&self) -> Result<WebDriverPage> {
        let pooled = self.idle.lock().await.pop();
        let client = match pooled {
            Some(client) => client,
            None => connect_to_webdriver(&self.webdriver_url).await?,
        };

        Ok(WebDriverPage {
            client,
            idle: Arc::clone(&self.idle),
        })
    }
}

/// A pooled WebDriver session used as a single tab
pub struct WebDriverPage {
    client: Client,
    idle: Arc<Mutex<Vec<Client>>>,
}

impl BrowserPage for WebDriverPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.client.goto(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(Error::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(Error::Timeout {
                    url: url.to_string(),
                    seconds: timeout.as_secs(),
                });
            }
        }

        if let Err(e) = self.client.execute(QUIESCE_MEDIA_SCRIPT, Vec::new()).await {
            ::log::debug!("Could not stop media on {}: {}", url, e);
        }
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    async fn evaluate(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        Ok(self.client.execute(script, args).await?)
    }

    async fn set_content(&mut self, html: &str) -> Result<()> {
        let data_url = format!("data:text/html;base64,{}", STANDARD.encode(html));
        self.client.goto(&data_url).await?;
        Ok(())
    }

    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        self.client.set_window_size(width, height).await?;
        Ok(())
    }

    async fn print_pdf(&mut self, options: &PrintOptions) -> Result<Vec<u8>> {
        let encoded = self.client.issue_cmd(PrintCommand::new(options)).await?;
        match encoded {
            Value::String(data) => STANDARD
                .decode(data.as_bytes())
                .map_err(|e| Error::Print(format!("Invalid PDF encoding: {}", e))),
            other => Err(Error::Print(format!("Unexpected print response: {}", other))),
        }
    }

    async fn close(self) {
        // A session that cannot be reset is ended instead of being reused
        match self.client.goto("about:blank").await {
            Ok(()) => self.idle.lock().await.push(self.client),
            Err(e) => {
                ::log::warn!("Dropping WebDriver session that failed to reset: {}", e);
                if let Err(e) = self.client.close().await {
                    ::log::warn!("Failed to close WebDriver session: {}", e);
                }
            }
        }
    }
}

/// W3C `Print Page` command; sizes are in centimetres
#[derive(Debug)]
struct PrintCommand {
    body: Value,
}

impl PrintCommand {
    fn new(options: &PrintOptions) -> Self {
        let (width, height) = options.page.size_cm();
        let margins = options.margins;
        Self {
            body: json!({
                "orientation": "portrait",
                "scale": 1.0,
                "background": options.print_background,
                "page": { "width": width, "height": height },
                "margin": {
                    "top": margins.top,
                    "bottom": margins.bottom,
                    "left": margins.left,
                    "right": margins.right,
                },
                "shrinkToFit": false,
            }),
        }
    }
}

impl WebDriverCompatibleCommand for PrintCommand {
    fn endpoint(
        &self,
        base_url: &url::Url,
        session_id: Option<&str>,
    ) -> std::result::Result<url::Url, url::ParseError> {
        let session_id = session_id.ok_or(url::ParseError::RelativeUrlWithoutBase)?;
        base_url.join(&format!("session/{}/print", session_id))
    }

    fn method_and_body(&self, _request_url: &url::Url) -> (http::Method, Option<String>) {
        (http::Method::POST, Some(self.body.to_string()))
    }
}

fn headless_capabilities() -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": ["--headless=new", "--disable-gpu", "--window-size=1200,800"] }),
    );
    caps.insert(
        "moz:firefoxOptions".to_string(),
        json!({ "args": ["-headless"] }),
    );
    caps
}

async fn connect(url: &str) -> std::result::Result<Client, fantoccini::error::NewSessionError> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(headless_capabilities());
    builder.connect(url).await
}

/// Connects to the WebDriver instance, trying the usual local ports on failure
async fn connect_to_webdriver(webdriver_url: &str) -> Result<Client> {
    let first_error = match connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            e
        }
    };

    for url in FALLBACK_WEBDRIVER_URLS.iter() {
        if *url == webdriver_url {
            continue;
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Ok(client);
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(first_error.into())
}
