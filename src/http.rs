use tracing::debug;

use crate::error::DownloadError;

pub(crate) const DEFAULT_USER_AGENT: &str = "rac1-cli (+https://github.com/emibcn/Rac1.py)";

const MAX_REDIRECTS: u32 = 5;

/// Status and body of one GET. Non-200 answers are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FetchedPage {
    pub(crate) status: u16,
    pub(crate) body: String,
}

pub(crate) trait Fetch {
    fn fetch(&self, host: &str, path: &str, secure: bool) -> Result<FetchedPage, DownloadError>;
}

pub(crate) fn page_url(host: &str, path: &str, secure: bool) -> String {
    let scheme = if secure { "https" } else { "http" };
    format!("{scheme}://{host}{path}")
}

pub(crate) struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub(crate) fn new(user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .redirects(MAX_REDIRECTS)
            .user_agent(user_agent)
            .build();
        Self { agent }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, host: &str, path: &str, secure: bool) -> Result<FetchedPage, DownloadError> {
        let url = page_url(host, path, secure);
        debug!(%url, "GET");

        let request = self
            .agent
            .get(&url)
            .set("Cache-Control", "max-age=0")
            .set("DNT", "1")
            .set("Upgrade-Insecure-Requests", "1");

        match request.call() {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|err| DownloadError::Transport {
                        url: url.clone(),
                        message: format!("response decode failed: {err}"),
                    })?;
                Ok(FetchedPage { status, body })
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().ok().unwrap_or_default();
                Ok(FetchedPage { status, body })
            }
            Err(ureq::Error::Transport(err)) => Err(DownloadError::Transport {
                url,
                message: err.to_string(),
            }),
        }
    }
}
