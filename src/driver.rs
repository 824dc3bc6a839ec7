//! Page drivers
//!
//! A driver owns the "current page": it navigates somewhere and hands out the
//! markup snapshot the rest of the pass works on. No JavaScript is executed;
//! [`HttpDriver`] sees what the server sends.

use std::fs;
use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

/// Renderer/navigation capability.
pub trait PageDriver {
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// URL of the loaded page, if any.
    fn current_url(&self) -> Option<&str>;

    /// Full markup of the loaded page.
    fn current_page_markup(&self) -> Result<String>;
}

impl<D: PageDriver + ?Sized> PageDriver for Box<D> {
    fn navigate(&mut self, url: &str) -> Result<()> {
        (**self).navigate(url)
    }

    fn current_url(&self) -> Option<&str> {
        (**self).current_url()
    }

    fn current_page_markup(&self) -> Result<String> {
        (**self).current_page_markup()
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    url: String,
    markup: String,
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| Error::Navigation {
        url: url.to_string(),
        msg: e.to_string(),
    })
}

/// Fetches pages over HTTP(S) with a blocking ureq agent.
pub struct HttpDriver {
    agent: ureq::Agent,
    current: Option<Snapshot>,
}

impl HttpDriver {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(Some(Duration::from_secs(timeout_secs)))
                .user_agent(user_agent)
                .http_status_as_error(false)
                .build(),
        );
        Self {
            agent,
            current: None,
        }
    }
}

impl PageDriver for HttpDriver {
    fn navigate(&mut self, url: &str) -> Result<()> {
        let parsed = parse_url(url)?;
        let nav_err = |msg: String| Error::Navigation {
            url: url.to_string(),
            msg,
        };

        let response = self
            .agent
            .get(parsed.as_str())
            .call()
            .map_err(|e| nav_err(e.to_string()))?;

        if !response.status().is_success() {
            warn!(url = %parsed, status = %response.status(), "navigation refused");
            return Err(nav_err(format!("HTTP {}", response.status())));
        }

        let markup = response
            .into_body()
            .read_to_string()
            .map_err(|e| nav_err(e.to_string()))?;

        debug!(url = %parsed, bytes = markup.len(), "page loaded");
        self.current = Some(Snapshot {
            url: parsed.to_string(),
            markup,
        });
        Ok(())
    }

    fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.url.as_str())
    }

    fn current_page_markup(&self) -> Result<String> {
        self.current
            .as_ref()
            .map(|s| s.markup.clone())
            .ok_or(Error::NoPage)
    }
}

/// Serves markup that is already in memory or on disk.
///
/// Navigation only understands `file://` URLs.
#[derive(Debug, Clone, Default)]
pub struct StaticPage {
    current: Option<Snapshot>,
}

impl StaticPage {
    pub fn new(url: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            current: Some(Snapshot {
                url: url.into(),
                markup: markup.into(),
            }),
        }
    }
}

impl PageDriver for StaticPage {
    fn navigate(&mut self, url: &str) -> Result<()> {
        let parsed = parse_url(url)?;
        let path = parsed.to_file_path().map_err(|_| Error::Navigation {
            url: url.to_string(),
            msg: "only file:// URLs can be opened without a browser".to_string(),
        })?;

        let markup = fs::read_to_string(&path).map_err(|e| Error::Navigation {
            url: url.to_string(),
            msg: e.to_string(),
        })?;

        debug!(path = %path.display(), bytes = markup.len(), "page loaded");
        self.current = Some(Snapshot {
            url: parsed.to_string(),
            markup,
        });
        Ok(())
    }

    fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.url.as_str())
    }

    fn current_page_markup(&self) -> Result<String> {
        self.current
            .as_ref()
            .map(|s| s.markup.clone())
            .ok_or(Error::NoPage)
    }
}
