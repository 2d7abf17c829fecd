//! Movie reference validation and canonicalization.
//!
//! A reference may be a bare title id (`tt0149460`), a path (`/title/tt0149460/`)
//! or a URL with or without scheme. Everything resolves to a canonical
//! `<origin>/title/<id>/...` page URL on the configured site.

use std::sync::LazyLock;
use regex::Regex;
use url::Url;

use crate::global::error::ConfigError;

static TITLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i:tt)[0-9]+$").expect("title id pattern is valid"));

/// The movie site every reference is resolved against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    scheme: String,
    /// Host including a non-default port, e.g. `www.imdb.com`
    host: String,
    origin: String,
}

impl Site {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(base_url)
            .map_err(|e| ConfigError::Invalid(format!("site.base_url '{base_url}': {e}")))?;

        let scheme = url.scheme().to_string();
        if scheme != "https" && scheme != "http" {
            return Err(ConfigError::Invalid(format!(
                "site.base_url '{base_url}' must use http or https"
            )));
        }

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ConfigError::Invalid(format!(
                    "site.base_url '{base_url}' has no host"
                )));
            }
        };

        let origin = format!("{scheme}://{host}");
        Ok(Self { scheme, host, origin })
    }

    #[cfg(test)]
    pub fn imdb() -> Self {
        Self {
            scheme: "https".to_string(),
            host: "www.imdb.com".to_string(),
            origin: "https://www.imdb.com".to_string(),
        }
    }

    /// `https://www.imdb.com`, no trailing slash
    #[cfg(test)]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Canonical page URL for a movie reference, or `None` if the reference
    /// is neither a site URL, a title path, nor a title id.
    pub fn normalize(&self, reference: &str) -> Option<String> {
        let src = clean_url(reference);
        let title_path = format!("{}/title/", self.host);
        let bare_title_path = self.host.strip_prefix("www.").map(|bare| format!("{bare}/title/"));

        if src.starts_with(&format!("https://{title_path}")) || src.starts_with(&format!("http://{title_path}")) {
            Some(src.to_string())
        } else if src.starts_with(&title_path) {
            Some(format!("{}://{src}", self.scheme))
        } else if bare_title_path.as_deref().is_some_and(|path| src.starts_with(path)) {
            Some(format!("{}://www.{src}", self.scheme))
        } else if src.starts_with("/title/tt") {
            Some(format!("{}{src}", self.origin))
        } else if src.starts_with("title/tt") {
            Some(format!("{}/{src}", self.origin))
        } else if is_title_id(src) {
            Some(self.title_url(src))
        } else {
            None
        }
    }

    /// Any page on the site, scheme optional
    pub fn validate_site_url(&self, url: &str) -> Option<String> {
        let url = url.trim();
        if url.starts_with(&format!("https://{}", self.host)) || url.starts_with(&format!("http://{}", self.host)) {
            Some(url.to_string())
        } else if url.starts_with(&self.host) {
            Some(format!("{}://{url}", self.scheme))
        } else {
            None
        }
    }

    /// Resolve an href found on a site page into an absolute URL
    pub fn resolve(&self, href: &str) -> Option<String> {
        let base = Url::parse(&format!("{}/", self.origin)).ok()?;
        base.join(href).ok().map(String::from)
    }

    fn title_url(&self, title_id: &str) -> String {
        format!("{}/title/{title_id}/", self.origin)
    }
}

/// Strip the query string and surrounding whitespace
pub fn clean_url(url: &str) -> &str {
    let url = match url.find('?') {
        Some(index) => &url[..index],
        None => url,
    };
    url.trim()
}

/// `tt` (any case) followed by one or more ASCII digits
pub fn is_title_id(candidate: &str) -> bool {
    TITLE_ID.is_match(candidate)
}

pub fn title_id_from_url(url: &str) -> Option<String> {
    if !url.to_ascii_lowercase().contains("title/tt") {
        return None;
    }

    let segments = path_segments(url);
    let index = segments.iter().position(|segment| *segment == "title")?;
    segments.get(index + 1).map(|id| id.to_string())
}

/// Last path segment of a media viewer URL, e.g. `rm2231255808`
pub fn media_id_from_url(url: &str) -> Option<String> {
    path_segments(clean_url(url)).last().map(|id| id.to_string())
}

fn path_segments(url: &str) -> Vec<&str> {
    url.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}
