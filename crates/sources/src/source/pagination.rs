//! Catalog traversal over "next page" flags or explicit page counts.

use std::future::Future;

use tracing::{debug, warn};

use crate::extractor::error::ExtractorError;
use crate::media::{Anime, AnimesPage};

/// A page of results that knows whether another one follows.
pub trait Paged {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, bool);
}

impl Paged for AnimesPage {
    type Item = Anime;

    fn into_parts(self) -> (Vec<Anime>, bool) {
        (self.animes, self.has_next_page)
    }
}

impl<T> Paged for (Vec<T>, bool) {
    type Item = T;

    fn into_parts(self) -> (Vec<T>, bool) {
        self
    }
}

/// Fetch `first_page`, `first_page + 1`, ... until a page reports no next
/// page or `max_pages` pages were fetched.
///
/// A failure on the first page is returned; a failure later on ends the walk
/// with what was gathered so far.
pub async fn collect_pages<P, F, Fut>(
    first_page: u32,
    max_pages: u32,
    mut fetch: F,
) -> Result<Vec<P::Item>, ExtractorError>
where
    P: Paged,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<P, ExtractorError>>,
{
    let mut items = Vec::new();

    for (fetched, page) in (first_page..).enumerate() {
        if fetched as u32 >= max_pages {
            debug!(page, max_pages, "Page limit reached");
            break;
        }

        let (page_items, has_next) = match fetch(page).await {
            Ok(result) => result.into_parts(),
            Err(e) if fetched == 0 => return Err(e),
            Err(e) => {
                warn!(page, error = %e, "Stopping catalog walk");
                break;
            }
        };

        items.extend(page_items);
        if !has_next {
            break;
        }
    }

    Ok(items)
}

/// Fetch pages `1..=page_count` in order, for listings that announce their size.
pub async fn collect_counted<T, F, Fut>(
    page_count: u32,
    mut fetch: F,
) -> Result<Vec<T>, ExtractorError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ExtractorError>>,
{
    let mut items = Vec::new();

    for page in 1..=page_count.max(1) {
        match fetch(page).await {
            Ok(page_items) => items.extend(page_items),
            Err(e) if page == 1 => return Err(e),
            Err(e) => {
                warn!(page, page_count, error = %e, "Stopping counted walk");
                break;
            }
        }
    }

    Ok(items)
}

/// Page `page` (1-based) of an in-memory list cut into `per_page` chunks,
/// with whether a later chunk exists. Out-of-range pages are empty.
pub fn slice_page<T: Clone>(items: &[T], page: u32, per_page: usize) -> (Vec<T>, bool) {
    let per_page = per_page.max(1);
    let start = (page.max(1) as usize - 1).saturating_mul(per_page);
    let chunk = items.iter().skip(start).take(per_page).cloned().collect();
    (chunk, items.len() > start.saturating_add(per_page))
}
