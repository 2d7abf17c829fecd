use crate::global::error::AppError;

/// One image found for a movie.
/// `index` is dense and zero based per movie, 0 being the primary poster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poster {
    pub movie_url: String,
    pub image_url: String,
    pub index: usize,
}

/// Outcome of looking up a movie's displayed title
#[derive(Debug)]
pub struct TitleListing {
    pub reference: String,
    pub title_id: Option<String>,
    /// `Ok(None)` when the page has no recognizable title heading
    pub title: Result<Option<String>, AppError>,
}

impl std::fmt::Display for TitleListing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = self.title_id.as_deref().unwrap_or(&self.reference);
        match &self.title {
            Ok(Some(title)) => write!(f, "{id} {title}"),
            Ok(None) => write!(f, "{id} (title not found)"),
            Err(e) => write!(f, "{id} ({e})"),
        }
    }
}

/// What happened during a download run
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub saved: Vec<std::path::PathBuf>,
    pub errors: Vec<AppError>,
}
