//! HTTP client bound to one candidate.
//!
//! Each candidate gets its own client and cookie jar, so a session set by one
//! step is visible to every later step of the same candidate and to nobody
//! else. Redirects are never followed: the scenario asserts on them.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, Url};
use tracing::debug;

use crate::check::CaseError;
use crate::error::LoadError;

/// A fetched response, fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub status: u16,
    pub location: Option<String>,

    /// The response carried at least one `Set-Cookie` header.
    pub sets_cookie: bool,

    pub body: String,
}

impl Page {
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether this is a redirect whose target ends with `suffix`.
    pub fn redirects_to(&self, suffix: &str) -> bool {
        self.is_redirect()
            && self
                .location
                .as_deref()
                .is_some_and(|location| location.ends_with(suffix))
    }

    async fn read(response: Response) -> Result<Self, CaseError> {
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let sets_cookie = response.headers().contains_key(SET_COOKIE);
        let body = response.text().await?;
        Ok(Self {
            status,
            location,
            sets_cookie,
            body,
        })
    }
}

/// Request-issuing client for one loaded candidate.
#[derive(Debug, Clone)]
pub struct CandidateClient {
    http: Client,
    jar: Arc<Jar>,
    base: Url,
}

impl CandidateClient {
    /// Fresh client with an empty cookie jar.
    pub fn new(base: Url) -> Result<Self, LoadError> {
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(jar.clone())
            .redirect(Policy::none())
            .build()?;
        Ok(Self { http, jar, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, CaseError> {
        self.base
            .join(path)
            .map_err(|e| CaseError::Url(format!("{}: {}", path, e)))
    }

    pub async fn get(&self, path: &str) -> Result<Page, CaseError> {
        self.get_with_query(path, &[]).await
    }

    /// GET with URL-encoded query parameters.
    pub async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Page, CaseError> {
        let url = self.url(path)?;
        debug!(%url, "GET");
        let response = self.http.get(url).query(query).send().await?;
        Page::read(response).await
    }

    /// POST a URL-encoded form.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<Page, CaseError> {
        let url = self.url(path)?;
        debug!(%url, "POST");
        let response = self.http.post(url).form(form).send().await?;
        Page::read(response).await
    }

    /// Whether the candidate has handed this client any cookie.
    pub fn has_cookies(&self) -> bool {
        self.jar.cookies(&self.base).is_some()
    }

    /// The `Cookie` header this client would send to the candidate right now.
    pub fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.base)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }
}
