use url::Url;

/// Placeholder substituted with the page number in page-index pagination
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Query parameter used for the page number when a URL has no placeholder
pub const DEFAULT_PAGE_PARAM: &str = "page";

/// Resolves a link href against a base URL
///
/// Returns None if the link cannot be followed:
/// - empty hrefs
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - fragment-only links (same page anchors)
/// - hrefs that do not resolve to an HTTP(S) URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use web_extractor::url::resolve_url;
///
/// let base = Url::parse("https://shop.example.com/catalog/").unwrap();
/// assert_eq!(
///     resolve_url(&base, "/p/1").as_deref(),
///     Some("https://shop.example.com/p/1")
/// );
/// assert_eq!(resolve_url(&base, "mailto:me@example.com"), None);
/// ```
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}

/// Builds the URL of page `index` for page-index pagination
///
/// A `{page}` placeholder (possibly percent-encoded by earlier resolution)
/// is replaced by the index. Otherwise the index is written into the query
/// parameter `param` (default `page`), replacing any existing value.
///
/// ```
/// use web_extractor::url::page_url;
///
/// assert_eq!(
///     page_url("https://x.test/list?p={page}", None, 3).unwrap(),
///     "https://x.test/list?p=3"
/// );
/// assert_eq!(
///     page_url("https://x.test/list?sort=new", Some("pg"), 2).unwrap(),
///     "https://x.test/list?sort=new&pg=2"
/// );
/// ```
pub fn page_url(url: &str, param: Option<&str>, index: u32) -> Result<String, url::ParseError> {
    let number = index.to_string();

    for placeholder in [PAGE_PLACEHOLDER, "%7Bpage%7D", "%7bpage%7d"] {
        if url.contains(placeholder) {
            return Ok(url.replace(placeholder, &number));
        }
    }

    let mut parsed = Url::parse(url)?;
    let param = param.unwrap_or(DEFAULT_PAGE_PARAM);

    let retained: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| key != param)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(param, &number);

    Ok(parsed.to_string())
}
