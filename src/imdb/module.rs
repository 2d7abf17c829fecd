use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::global::error::AppError;
use crate::global::pacer::LaunchPacer;
use crate::picture::{self, progress::DownloadProgress};
use super::locator::PosterLocator;
use super::model::{DownloadReport, Poster, TitleListing};
use super::source::title_id_from_url;

/// Fans movie references out to one task each.
///
/// Tasks are launched in input order with a fixed delay between launches and
/// never cancel each other; every run waits for all of them. Results and
/// errors land in mutex guarded lists owned by the run.
pub struct ImdbModule {
    locator: Arc<PosterLocator>,
    downloads: Client,
    launch_delay: Duration,
}

impl ImdbModule {
    pub fn new(locator: PosterLocator, downloads: Client, launch_delay: Duration) -> Self {
        Self {
            locator: Arc::new(locator),
            downloads,
            launch_delay,
        }
    }

    fn pacer(&self, name: &str) -> LaunchPacer {
        LaunchPacer::new(name, self.launch_delay)
    }

    /// Every poster image of every reference. Order across movies follows
    /// task completion; each movie's own images stay in document order.
    pub async fn collect_posters(&self, references: &[String], on_launch: impl Fn()) -> (Vec<Poster>, Vec<AppError>) {
        let posters: Arc<Mutex<Vec<Poster>>> = Arc::new(Mutex::new(Vec::new()));
        let errors: Arc<Mutex<Vec<AppError>>> = Arc::new(Mutex::new(Vec::new()));
        let pacer = self.pacer("collect");
        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(references.len());

        info!(count = references.len(), delay_ms = pacer.delay().as_millis() as u64, "Collecting posters");

        for reference in references {
            pacer.acquire().await;

            let locator = self.locator.clone();
            let posters = posters.clone();
            let errors = errors.clone();
            let reference = reference.clone();

            handles.push(tokio::spawn(async move {
                match locate_movie(&locator, &reference).await {
                    Ok(found) => posters.lock().await.extend(found),
                    Err(e) => {
                        warn!(reference = %reference, error = %e, "Could not collect posters");
                        errors.lock().await.push(e);
                    }
                }
            }));
            on_launch();
        }

        let join_errors = join_errors(handles).await;

        let posters = std::mem::take(&mut *posters.lock().await);
        let mut errors = std::mem::take(&mut *errors.lock().await);
        errors.extend(join_errors);

        info!(posters = posters.len(), errors = errors.len(), "Collection finished");
        (posters, errors)
    }

    /// Image URLs only, for printing
    pub async fn find_posters(&self, references: &[String], on_launch: impl Fn()) -> (Vec<String>, Vec<AppError>) {
        let (posters, errors) = self.collect_posters(references, on_launch).await;
        let urls = posters.into_iter().map(|poster| poster.image_url).collect();
        (urls, errors)
    }

    /// Displayed title of every reference, in input order
    pub async fn list_titles(&self, references: &[String]) -> Vec<TitleListing> {
        let pacer = self.pacer("titles");
        let mut handles: Vec<JoinHandle<TitleListing>> = Vec::with_capacity(references.len());

        for reference in references {
            pacer.acquire().await;

            let locator = self.locator.clone();
            let reference = reference.clone();
            handles.push(tokio::spawn(async move { title_of(&locator, reference).await }));
        }

        join_all(handles)
            .await
            .into_iter()
            .zip(references)
            .map(|(joined, reference)| {
                joined.unwrap_or_else(|e| TitleListing {
                    reference: reference.clone(),
                    title_id: None,
                    title: Err(AppError::Join(e.to_string())),
                })
            })
            .collect()
    }

    /// Movie URLs linked from site pages such as charts or search results.
    /// Pages are fetched one after another, paced like every other launch.
    pub async fn scrape_references(&self, pages: &[String]) -> (Vec<String>, Vec<AppError>) {
        let pacer = self.pacer("scrape");
        let mut movies: Vec<String> = Vec::new();
        let mut errors = Vec::new();

        for page in pages {
            pacer.acquire().await;
            match self.locator.scrape_title_links(page).await {
                Ok(found) => {
                    for movie in found {
                        if !movies.contains(&movie) {
                            movies.push(movie);
                        }
                    }
                }
                Err(e) => {
                    warn!(page = %page, error = %e, "Could not scrape page");
                    errors.push(e);
                }
            }
        }

        (movies, errors)
    }

    /// Collect and download in one go. Collection errors come back on their
    /// own so they survive a download phase aborted by an unusable
    /// `target_dir`; download failures are reported per poster.
    pub async fn download_posters(
        &self,
        references: &[String],
        target_dir: &Path,
        progress: Arc<dyn DownloadProgress>,
        on_launch: impl Fn(),
    ) -> (Vec<AppError>, Result<DownloadReport, AppError>) {
        let (posters, errors) = self.collect_posters(references, &on_launch).await;

        let downloaded = self.download_all(posters, target_dir, progress).await;
        (errors, downloaded)
    }

    /// One paced task per poster, saved as `<title id>-<index>.<ext>`
    pub async fn download_all(
        &self,
        posters: Vec<Poster>,
        target_dir: &Path,
        progress: Arc<dyn DownloadProgress>,
    ) -> Result<DownloadReport, AppError> {
        picture::ensure_target_dir(target_dir).await?;

        let saved = Arc::new(Mutex::new(Vec::new()));
        let errors: Arc<Mutex<Vec<AppError>>> = Arc::new(Mutex::new(Vec::new()));
        let pacer = self.pacer("download");
        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(posters.len());

        info!(count = posters.len(), target = ?target_dir, "Downloading posters");

        for poster in posters {
            pacer.acquire().await;

            let client = self.downloads.clone();
            let target_dir = target_dir.to_path_buf();
            let progress = progress.clone();
            let saved = saved.clone();
            let errors = errors.clone();

            handles.push(tokio::spawn(async move {
                let filename = picture::poster_filename(&poster);
                debug!(url = %poster.image_url, filename = %filename, "Launching download");

                match picture::download(&client, &poster.image_url, &target_dir, &filename, progress.as_ref()).await {
                    Ok(path) => saved.lock().await.push(path),
                    Err(e) => errors.lock().await.push(e),
                }
            }));
        }

        let join_errors = join_errors(handles).await;

        let mut report = DownloadReport {
            saved: std::mem::take(&mut *saved.lock().await),
            errors: std::mem::take(&mut *errors.lock().await),
        };
        report.errors.extend(join_errors);

        info!(saved = report.saved.len(), errors = report.errors.len(), "Downloads finished");
        Ok(report)
    }
}

/// Normalize, locate, and number the images of one movie
async fn locate_movie(locator: &PosterLocator, reference: &str) -> Result<Vec<Poster>, AppError> {
    let movie_url = locator.normalize(reference)?;
    let images = locator.locate(&movie_url).await?;

    Ok(images
        .into_iter()
        .enumerate()
        .map(|(index, image_url)| Poster {
            movie_url: movie_url.clone(),
            image_url,
            index,
        })
        .collect())
}

async fn title_of(locator: &PosterLocator, reference: String) -> TitleListing {
    let movie_url = match locator.normalize(&reference) {
        Ok(url) => url,
        Err(e) => {
            return TitleListing {
                reference,
                title_id: None,
                title: Err(e),
            };
        }
    };

    TitleListing {
        title_id: title_id_from_url(&movie_url),
        title: locator.extract_title(&movie_url).await,
        reference,
    }
}

/// Wait for every task; a panicked task becomes an error instead of
/// taking the run down with it
async fn join_errors(handles: Vec<JoinHandle<()>>) -> Vec<AppError> {
    join_all(handles)
        .await
        .into_iter()
        .filter_map(|joined| joined.err())
        .map(|e| AppError::Join(e.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use super::*;
    use crate::imdb::locator::tests::{with_movie, StubPages};
    use crate::imdb::source::Site;

    struct SilentProgress;

    impl DownloadProgress for SilentProgress {
        fn start(&self, _url: &str) {}
        fn update(&self, _url: &str, _fraction: f64, _bytes_read: u64, _total_bytes: u64) {}
        fn done(&self, _url: &str) {}
    }

    fn module(pages: Arc<StubPages>, all_resolutions: bool, delay: Duration) -> ImdbModule {
        let locator = PosterLocator::new(pages, Site::imdb(), all_resolutions);
        ImdbModule::new(locator, Client::new(), delay)
    }

    fn references(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[tokio::test]
    async fn single_title_yields_one_primary_poster() {
        let pages = Arc::new(with_movie(StubPages::default(), "tt2861424"));
        let module = module(pages, false, Duration::ZERO);

        let (posters, errors) = module.collect_posters(&references(&["tt2861424"]), || {}).await;

        assert!(errors.is_empty());
        assert_eq!(
            posters,
            vec![Poster {
                movie_url: "https://www.imdb.com/title/tt2861424/".to_string(),
                image_url: "https://m.media-amazon.com/images/M/tt2861424.jpg".to_string(),
                index: 0,
            }]
        );
    }

    #[tokio::test]
    async fn invalid_reference_fails_alone() {
        let pages = ["tt2861424", "tt0149460", "tt0133093"]
            .into_iter()
            .fold(StubPages::default(), with_movie);
        let module = module(Arc::new(pages), false, Duration::ZERO);
        let launches = AtomicUsize::new(0);

        let (posters, errors) = module
            .collect_posters(
                &references(&["tt2861424", "not a movie", "www.imdb.com/title/tt0149460/", "/title/tt0133093/"]),
                || {
                    launches.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

        assert_eq!(launches.load(Ordering::SeqCst), 4);
        assert_eq!(posters.len(), 3);
        assert!(posters.iter().all(|poster| poster.index == 0));
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], AppError::InvalidReference(reference) if reference == "not a movie"));
    }

    #[tokio::test]
    async fn indices_are_dense_per_movie() {
        let pages = ["tt2861424", "tt0149460"].into_iter().fold(StubPages::default(), with_movie);
        let module = module(Arc::new(pages), true, Duration::ZERO);

        let (posters, errors) = module.collect_posters(&references(&["tt2861424", "tt0149460"]), || {}).await;

        assert!(errors.is_empty());
        for title_id in ["tt2861424", "tt0149460"] {
            let indices: Vec<usize> = posters
                .iter()
                .filter(|poster| poster.movie_url.contains(title_id))
                .map(|poster| poster.index)
                .collect();
            assert_eq!(indices, vec![0, 1, 2, 3]);
        }
    }

    #[tokio::test]
    async fn network_failures_do_not_cancel_siblings() {
        let pages = with_movie(StubPages::default(), "tt2861424");
        let module = module(Arc::new(pages), false, Duration::ZERO);

        let (urls, errors) = module.find_posters(&references(&["tt404", "tt2861424", "tt405"]), || {}).await;

        assert_eq!(urls, vec!["https://m.media-amazon.com/images/M/tt2861424.jpg"]);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, AppError::Network(_))));
    }

    #[tokio::test]
    async fn empty_input_makes_no_requests() {
        let pages = Arc::new(StubPages::default());
        let module = module(pages.clone(), false, Duration::from_millis(500));

        let (posters, errors) = module.collect_posters(&[], || {}).await;

        assert!(posters.is_empty());
        assert!(errors.is_empty());
        assert_eq!(pages.request_count(), 0);
    }

    #[tokio::test]
    async fn launches_are_spaced_by_the_delay() {
        let pages = ["tt2861424", "tt0149460", "tt0133093"]
            .into_iter()
            .fold(StubPages::default(), with_movie);
        let module = module(Arc::new(pages), false, Duration::from_millis(40));
        let started = Instant::now();

        let (posters, _) = module
            .collect_posters(&references(&["tt2861424", "tt0149460", "tt0133093"]), || {})
            .await;

        assert_eq!(posters.len(), 3);
        assert!(started.elapsed() >= Duration::from_millis(70));
    }

    #[tokio::test]
    async fn titles_in_input_order() {
        let pages = StubPages::default()
            .with_page(
                "https://www.imdb.com/title/tt0149460/",
                r#"<div class="title_wrapper"><h1>Futurama</h1></div>"#,
            )
            .with_page("https://www.imdb.com/title/tt2861424/", "<p>no heading</p>");
        let module = module(Arc::new(pages), false, Duration::ZERO);

        let listings = module
            .list_titles(&references(&["tt0149460", "bogus", "tt2861424"]))
            .await;

        assert_eq!(listings.len(), 3);
        assert_eq!(listings[0].to_string(), "tt0149460 Futurama");
        assert!(matches!(listings[1].title, Err(AppError::InvalidReference(_))));
        assert_eq!(listings[2].title_id.as_deref(), Some("tt2861424"));
        assert!(matches!(listings[2].title, Ok(None)));
    }

    #[tokio::test]
    async fn scraped_references_are_merged() {
        let pages = StubPages::default()
            .with_page(
                "https://www.imdb.com/chart/top/",
                r#"<a href="/title/tt0111161/">1</a><a href="/title/tt0068646/">2</a>"#,
            )
            .with_page("https://www.imdb.com/chart/moviemeter/", r#"<a href="/title/tt0068646/">2</a>"#);
        let module = module(Arc::new(pages), false, Duration::ZERO);

        let (movies, errors) = module
            .scrape_references(&references(&[
                "https://www.imdb.com/chart/top/",
                "https://www.imdb.com/chart/moviemeter/",
                "https://www.imdb.com/chart/missing/",
            ]))
            .await;

        assert_eq!(
            movies,
            vec!["https://www.imdb.com/title/tt0111161/", "https://www.imdb.com/title/tt0068646/"]
        );
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn downloads_every_poster_and_reports_failures() {
        let mut server = mockito::Server::new_async().await;
        let _primary = server
            .mock("GET", "/images/a.jpg")
            .with_status(200)
            .with_body("primary")
            .create_async()
            .await;
        let _alternate = server
            .mock("GET", "/images/b.png")
            .with_status(200)
            .with_body("alternate")
            .create_async()
            .await;
        let _gone = server
            .mock("GET", "/images/gone.jpg")
            .with_status(500)
            .create_async()
            .await;

        let movie_url = "https://www.imdb.com/title/tt0149460/".to_string();
        let posters = vec![
            Poster { movie_url: movie_url.clone(), image_url: format!("{}/images/a.jpg", server.url()), index: 0 },
            Poster { movie_url: movie_url.clone(), image_url: format!("{}/images/b.png", server.url()), index: 1 },
            Poster { movie_url, image_url: format!("{}/images/gone.jpg", server.url()), index: 2 },
        ];
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("posters");
        let module = module(Arc::new(StubPages::default()), false, Duration::ZERO);

        let report = module.download_all(posters, &target, Arc::new(SilentProgress)).await.unwrap();

        assert_eq!(report.saved.len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(std::fs::read_to_string(target.join("tt0149460-00.jpg")).unwrap(), "primary");
        assert_eq!(std::fs::read_to_string(target.join("tt0149460-01.png")).unwrap(), "alternate");
        assert!(!target.join("tt0149460-02.jpg").exists());
    }

    #[tokio::test]
    async fn uncreatable_target_aborts_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, b"file").unwrap();
        let pages = with_movie(StubPages::default(), "tt2861424");
        let module = module(Arc::new(pages), false, Duration::ZERO);

        let (collect_errors, result) = module
            .download_posters(
                &references(&["tt2861424", "garbage"]),
                &blocker.join("posters"),
                Arc::new(SilentProgress),
                || {},
            )
            .await;

        assert!(matches!(result, Err(AppError::TargetDirectory { .. })));
        assert_eq!(collect_errors.len(), 1);
        assert!(matches!(&collect_errors[0], AppError::InvalidReference(reference) if reference == "garbage"));
    }
}
