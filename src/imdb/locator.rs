use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::global::error::AppError;
use crate::global::http::PageSource;
use super::markup;
use super::source::{clean_url, media_id_from_url, title_id_from_url, Site};

/// Walks movie pages to find poster images and titles
pub struct PosterLocator {
    pages: Arc<dyn PageSource>,
    site: Site,
    all_resolutions: bool,
}

impl PosterLocator {
    pub fn new(pages: Arc<dyn PageSource>, site: Site, all_resolutions: bool) -> Self {
        Self {
            pages,
            site,
            all_resolutions,
        }
    }

    /// Canonical page URL for a reference
    pub fn normalize(&self, reference: &str) -> Result<String, AppError> {
        self.site
            .normalize(reference)
            .ok_or_else(|| AppError::InvalidReference(clean_url(reference).to_string()))
    }

    /// Image URLs for a movie's poster: the movie page leads to the media
    /// viewer, the media viewer lists the images.
    pub async fn locate(&self, movie_url: &str) -> Result<Vec<String>, AppError> {
        let media_viewer_url = self.find_media_viewer(movie_url).await?;
        self.find_posters_in_media_viewer(&media_viewer_url).await
    }

    async fn find_media_viewer(&self, movie_url: &str) -> Result<String, AppError> {
        let page = self.pages.fetch_page(movie_url).await?;
        let title_id = title_id_from_url(movie_url);

        let href = markup::find_media_viewer_href(&page, title_id.as_deref())
            .ok_or_else(|| AppError::MediaViewerNotFound(movie_url.to_string()))?;

        let media_viewer_url = self
            .site
            .resolve(&href)
            .ok_or_else(|| AppError::MediaViewerNotFound(movie_url.to_string()))?;

        debug!(movie = %movie_url, media_viewer = %media_viewer_url, "Found media viewer");
        Ok(media_viewer_url)
    }

    async fn find_posters_in_media_viewer(&self, media_viewer_url: &str) -> Result<Vec<String>, AppError> {
        let media_id = media_id_from_url(media_viewer_url)
            .ok_or_else(|| AppError::NoPostersFound(media_viewer_url.to_string()))?;

        let page = self.pages.fetch_page(media_viewer_url).await?;
        let posters = markup::find_poster_images(&page, &media_id, self.all_resolutions);

        if posters.is_empty() {
            return Err(AppError::NoPostersFound(media_viewer_url.to_string()));
        }

        debug!(
            media_viewer = %media_viewer_url,
            media_id = %media_id,
            count = posters.len(),
            "Found posters"
        );
        Ok(posters)
    }

    /// Displayed title of a movie page; `None` when no heading matches
    pub async fn extract_title(&self, movie_url: &str) -> Result<Option<String>, AppError> {
        let page = self.pages.fetch_page(movie_url).await?;
        let title = markup::find_title(&page);

        if title.is_none() {
            warn!(movie = %movie_url, "No title heading found");
        }
        Ok(title)
    }

    /// Canonical URLs of every movie linked from a site page
    pub async fn scrape_title_links(&self, page_url: &str) -> Result<Vec<String>, AppError> {
        let page_url = self
            .site
            .validate_site_url(page_url)
            .ok_or_else(|| AppError::InvalidReference(page_url.to_string()))?;

        let page = self.pages.fetch_page(&page_url).await?;

        let mut movies: Vec<String> = Vec::new();
        for href in markup::find_title_links(&page) {
            match self.site.normalize(&href) {
                Some(url) if !movies.contains(&url) => movies.push(url),
                Some(_) => {}
                None => warn!(page = %page_url, href = %href, "Skipping unrecognized title link"),
            }
        }

        info!(page = %page_url, count = movies.len(), "Scraped title links");
        Ok(movies)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::global::error::HttpError;

    /// Serves canned pages and records every request
    #[derive(Default)]
    pub(crate) struct StubPages {
        pages: HashMap<String, String>,
        pub(crate) requests: Mutex<Vec<String>>,
    }

    impl StubPages {
        pub(crate) fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
            self.pages.insert(url.to_string(), body.into());
            self
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl PageSource for StubPages {
        async fn fetch_page(&self, url: &str) -> Result<String, HttpError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| HttpError::UnexpectedStatus {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    /// Movie page plus media viewer page for `title_id`, with one matching
    /// image carrying a three entry srcset
    pub(crate) fn with_movie(pages: StubPages, title_id: &str) -> StubPages {
        let media_id = format!("rm{}", &title_id[2..]);
        let movie_page = format!(
            r#"<div class="poster"><a href="/title/{title_id}/mediaviewer/{media_id}?ref_=tt_ov_i">poster</a></div>"#
        );
        let viewer_page = format!(
            r#"<div class="pswp__zoom-wrap">
                 <img data-image-id="{media_id}-curr" src="https://m.media-amazon.com/images/M/{title_id}.jpg"
                      srcset="https://img/{title_id}-380.jpg 380w, https://img/{title_id}-760.jpg 760w, https://img/{title_id}-1200.jpg 1200w">
               </div>
               <div class="thumb"><img data-image-id="xx-next" src="https://img/unrelated.jpg"></div>"#
        );

        pages
            .with_page(&format!("https://www.imdb.com/title/{title_id}/"), movie_page)
            .with_page(
                &format!("https://www.imdb.com/title/{title_id}/mediaviewer/{media_id}"),
                viewer_page,
            )
    }

    fn locator(pages: StubPages, all_resolutions: bool) -> PosterLocator {
        PosterLocator::new(Arc::new(pages), Site::imdb(), all_resolutions)
    }

    #[tokio::test]
    async fn locates_primary_poster() {
        let locator = locator(with_movie(StubPages::default(), "tt2861424"), false);

        let posters = locator.locate("https://www.imdb.com/title/tt2861424/").await.unwrap();

        assert_eq!(posters, vec!["https://m.media-amazon.com/images/M/tt2861424.jpg"]);
    }

    #[tokio::test]
    async fn locates_every_resolution() {
        let locator = locator(with_movie(StubPages::default(), "tt2861424"), true);

        let posters = locator.locate("https://www.imdb.com/title/tt2861424/").await.unwrap();

        assert_eq!(posters.len(), 4);
        assert_eq!(posters[0], "https://m.media-amazon.com/images/M/tt2861424.jpg");
        assert_eq!(posters[3], "https://img/tt2861424-1200.jpg");
    }

    #[tokio::test]
    async fn missing_media_viewer() {
        let pages = StubPages::default().with_page("https://www.imdb.com/title/tt1/", "<h1>nothing</h1>");

        let err = locator(pages, false).locate("https://www.imdb.com/title/tt1/").await.unwrap_err();

        assert!(matches!(err, AppError::MediaViewerNotFound(_)));
    }

    #[tokio::test]
    async fn media_viewer_without_matching_images() {
        let pages = StubPages::default()
            .with_page(
                "https://www.imdb.com/title/tt1/",
                r#"<div class="poster"><a href="/title/tt1/mediaviewer/rm5">p</a></div>"#,
            )
            .with_page(
                "https://www.imdb.com/title/tt1/mediaviewer/rm5",
                r#"<div class="thumb"><img data-image-id="rm6-curr" src="https://img/x.jpg"></div>"#,
            );

        let err = locator(pages, false).locate("https://www.imdb.com/title/tt1/").await.unwrap_err();

        assert!(matches!(err, AppError::NoPostersFound(_)));
    }

    #[tokio::test]
    async fn fetch_failure_is_a_network_error() {
        let err = locator(StubPages::default(), false)
            .locate("https://www.imdb.com/title/tt1/")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Network(_)));
    }

    #[tokio::test]
    async fn title_found_and_missing() {
        let pages = StubPages::default()
            .with_page(
                "https://www.imdb.com/title/tt2861424/",
                r#"<div class="title_wrapper"><h1> Rick and Morty </h1></div>"#,
            )
            .with_page("https://www.imdb.com/title/tt1/", "<h1>Elsewhere</h1>");
        let locator = locator(pages, false);

        assert_eq!(
            locator.extract_title("https://www.imdb.com/title/tt2861424/").await.unwrap().as_deref(),
            Some("Rick and Morty")
        );
        assert_eq!(locator.extract_title("https://www.imdb.com/title/tt1/").await.unwrap(), None);
    }

    #[tokio::test]
    async fn scrapes_title_links_from_a_chart() {
        let pages = StubPages::default().with_page(
            "https://www.imdb.com/chart/top/",
            r#"<a href="/title/tt0111161/?ref_=chttp_t_1">1</a>
               <a href="https://www.imdb.com/title/tt0111161/">1 again</a>
               <a href="/title/tt0068646/">2</a>
               <a href="/name/nm0000209/">actor</a>"#,
        );
        let locator = locator(pages, false);

        let movies = locator.scrape_title_links("www.imdb.com/chart/top/").await.unwrap();

        assert_eq!(
            movies,
            vec!["https://www.imdb.com/title/tt0111161/", "https://www.imdb.com/title/tt0068646/"]
        );
        assert!(matches!(
            locator.scrape_title_links("https://example.com/").await,
            Err(AppError::InvalidReference(_))
        ));
    }
}
