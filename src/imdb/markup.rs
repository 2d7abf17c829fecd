//! Page markup extraction.
//!
//! Everything that knows what the site's HTML looks like lives here, as pure
//! functions over page text. When the markup changes this is the only file
//! that should need to follow.

use std::sync::LazyLock;
use scraper::{ElementRef, Html, Selector};

use super::source::clean_url;

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h1"));

const POSTER_CLASS: &str = "poster";
const TITLE_WRAPPER_CLASS: &str = "title_wrapper";
const TITLE_HEADER_PREFIX: &str = "titleheader";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

fn parent_element<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.parent().and_then(ElementRef::wrap)
}

fn is_div(element: &ElementRef<'_>) -> bool {
    element.value().name() == "div"
}

fn has_class(element: &ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|name| name == class)
}

/// Href of the poster's media viewer link on a movie page, query stripped.
///
/// Prefers the first anchor sitting directly in a `div.poster`. Failing that,
/// any anchor pointing at `/title/<id>/mediaviewer/` whose parent's class
/// mentions a poster.
pub fn find_media_viewer_href(html: &str, title_id: Option<&str>) -> Option<String> {
    let document = Html::parse_document(html);

    let in_poster_div = document.select(&ANCHOR).find_map(|anchor| {
        let parent = parent_element(&anchor)?;
        if !is_div(&parent) || !has_class(&parent, POSTER_CLASS) {
            return None;
        }
        anchor.value().attr("href").map(|href| clean_url(href).to_string())
    });
    if in_poster_div.is_some() {
        return in_poster_div;
    }

    let prefix = format!("/title/{}/mediaviewer/", title_id?);
    document.select(&ANCHOR).find_map(|anchor| {
        let href = anchor.value().attr("href")?;
        if !href.starts_with(&prefix) {
            return None;
        }
        let parent_class = parent_element(&anchor)?.value().attr("class")?.to_lowercase();
        parent_class
            .contains(POSTER_CLASS)
            .then(|| clean_url(href).to_string())
    })
}

/// Image URLs for one media item, in document order.
///
/// Only `<img>` elements whose parent is a classed `div` and whose
/// `data-image-id` starts with `media_id` count; a media viewer page carries
/// plenty of unrelated thumbnails. Each match contributes its `src`, followed
/// by every well-formed `srcset` entry when `all_resolutions` is set.
pub fn find_poster_images(html: &str, media_id: &str, all_resolutions: bool) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut posters = Vec::new();

    for image in document.select(&IMAGE) {
        let Some(parent) = parent_element(&image) else {
            continue;
        };
        if !is_div(&parent) || parent.value().attr("class").is_none() {
            continue;
        }

        let element = image.value();
        let (Some(src), Some(image_id)) = (element.attr("src"), element.attr("data-image-id")) else {
            continue;
        };
        if !image_id.starts_with(media_id) {
            continue;
        }

        posters.push(src.to_string());

        if all_resolutions {
            if let Some(srcset) = element.attr("srcset") {
                posters.extend(srcset_urls(srcset));
            }
        }
    }

    posters
}

/// URLs of a responsive `srcset`; entries that are not exactly
/// `<url> <descriptor>` are skipped.
pub fn srcset_urls(srcset: &str) -> Vec<String> {
    srcset
        .split(',')
        .filter_map(|entry| {
            let tokens: Vec<&str> = entry.split_whitespace().collect();
            match tokens.as_slice() {
                [url, _descriptor] => Some(url.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// Displayed movie title, or `None` when no heading matches.
pub fn find_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    document.select(&HEADING).find_map(|heading| {
        let in_wrapper = parent_element(&heading)
            .is_some_and(|parent| is_div(&parent) && has_class(&parent, TITLE_WRAPPER_CLASS));
        let is_header = heading
            .value()
            .attr("class")
            .is_some_and(|class| class.to_lowercase().starts_with(TITLE_HEADER_PREFIX));

        (in_wrapper || is_header).then(|| heading.text().collect::<String>().trim().to_string())
    })
}

/// Every href on a page that points at a title page, query stripped, in
/// document order and without duplicates.
pub fn find_title_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();

    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = clean_url(href);
        if href.contains("title/tt") && !links.iter().any(|link| link == href) {
            links.push(href.to_string());
        }
    }

    links
}
