//! Small helpers over `scraper` shared by the site parsers.
//!
//! `Html` is not `Send`, so parsers take the page body, do all DOM work
//! synchronously and return owned values before the next `.await`.

use scraper::{ElementRef, Html, Selector};

use crate::extractor::error::ExtractorError;
use crate::extractor::utils::{absolute_url, substring_before};

/// Compile a selector built at runtime.
pub fn selector(css: &str) -> Result<Selector, ExtractorError> {
    Selector::parse(css).map_err(|e| ExtractorError::SelectorError(format!("{css}: {e}")))
}

pub fn select_first<'a>(root: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    root.select(selector).next()
}

pub fn document_first<'a>(document: &'a Html, selector: &Selector) -> Option<ElementRef<'a>> {
    document.select(selector).next()
}

/// Whitespace-normalized text of the element and its descendants.
pub fn text(element: ElementRef<'_>) -> String {
    normalize(&element.text().collect::<String>())
}

/// Text of the direct text children only.
pub fn own_text(element: ElementRef<'_>) -> String {
    let raw: String = element
        .children()
        .filter_map(|child| child.value().as_text().map(|t| String::from(&*t.text)))
        .collect();
    normalize(&raw)
}

pub fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

/// `attr` resolved against `base`, like jsoup's `abs:` prefix.
pub fn abs_attr(element: ElementRef<'_>, name: &str, base: &str) -> Option<String> {
    attr(element, name).map(|value| absolute_url(base, &value))
}

/// The best image url of an `<img>`, trying the lazy-loading attributes first
/// and dropping any `?resize` suffix.
pub fn image_url(element: ElementRef<'_>, base: &str) -> Option<String> {
    let url = ["data-src", "data-lazy-src"]
        .iter()
        .find_map(|name| abs_attr(element, name, base))
        .or_else(|| {
            attr(element, "srcset").map(|srcset| {
                let first = srcset.split_whitespace().next().unwrap_or_default();
                absolute_url(base, first)
            })
        })
        .or_else(|| abs_attr(element, "src", base))?;
    Some(substring_before(&url, "?resize").to_string())
}

/// Texts of every element matching `selector` under `root`.
pub fn each_text(root: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    root.select(selector).map(text).collect()
}

/// Script bodies of the document, for pages that keep their data in inline JS.
pub fn scripts(document: &Html) -> impl Iterator<Item = String> + '_ {
    static SCRIPT: std::sync::LazyLock<Selector> =
        std::sync::LazyLock::new(|| Selector::parse("script").unwrap());
    document
        .select(&SCRIPT)
        .map(|script| script.text().collect::<String>())
}

/// First inline script containing `needle`.
pub fn script_containing(document: &Html, needle: &str) -> Option<String> {
    scripts(document).find(|script| script.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_url_fallbacks() {
        let html = Html::parse_fragment(
            r#"<img class="a" data-src="/wp/cover.jpg?resize=247,350" src="x.gif">
               <img class="b" srcset="https://cdn.example/c.jpg 1x, https://cdn.example/c2.jpg 2x">
               <img class="c" src="https://cdn.example/d.jpg">"#,
        );
        let get = |css: &str| {
            let sel = selector(css).unwrap();
            image_url(html.select(&sel).next().unwrap(), "https://site.example/anime/")
        };
        assert_eq!(get("img.a").as_deref(), Some("https://site.example/wp/cover.jpg"));
        assert_eq!(get("img.b").as_deref(), Some("https://cdn.example/c.jpg"));
        assert_eq!(get("img.c").as_deref(), Some("https://cdn.example/d.jpg"));
    }

    #[test]
    fn test_own_text_skips_children() {
        let html = Html::parse_fragment(r#"<div class="tt">  Frieren <h2>Beyond</h2> </div>"#);
        let sel = selector("div.tt").unwrap();
        let div = html.select(&sel).next().unwrap();
        assert_eq!(own_text(div), "Frieren");
        assert_eq!(text(div), "Frieren Beyond");
    }

    #[test]
    fn test_bad_selector_is_an_error() {
        assert!(matches!(selector("div[["), Err(ExtractorError::SelectorError(_))));
    }
}
