//! Allocation-free URL helpers
//!
//! These work on both absolute URLs (`https://www.instagram.com/p/abc/`) and
//! the path-relative forms the page hands to `history.pushState` (`/?a=b`).

// =============================================================================
// Scheme
// =============================================================================

/// Get the position after "://", if the URL is absolute.
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    // A '/' or '?' before the colon means the colon belongs to the path or query
    if bytes[..colon_pos].iter().any(|&b| b == b'/' || b == b'?' || b == b'#') {
        return None;
    }

    if bytes.len() > colon_pos + 2
        && bytes[colon_pos + 1] == b'/'
        && bytes[colon_pos + 2] == b'/'
    {
        return Some(colon_pos + 3);
    }

    None
}

/// Offset where the path starts, or `url.len()` if the URL has an authority
/// and nothing after it.
#[inline]
fn path_start(url: &str) -> usize {
    let scheme_end = match get_scheme_end(url) {
        Some(pos) => pos,
        None => return 0,
    };

    let bytes = url.as_bytes();
    for (i, &b) in bytes[scheme_end..].iter().enumerate() {
        if b == b'/' || b == b'?' || b == b'#' {
            return scheme_end + i;
        }
    }
    bytes.len()
}

/// Scheme and authority of an absolute URL (`https://host:port`), or `""`
/// for a relative one.
#[inline]
pub fn extract_origin(url: &str) -> &str {
    if get_scheme_end(url).is_none() {
        return "";
    }
    &url[..path_start(url)]
}

// =============================================================================
// Path / Query Extraction
// =============================================================================

/// Extract the path portion of a URL, without query or fragment.
///
/// Returns `""` for a relative URL that is only a query (`?a=b`), which is how
/// `location.pathname` can read on some pages; absolute URLs always yield at
/// least `/`.
#[inline]
pub fn extract_path(url: &str) -> &str {
    let start = path_start(url);
    let rest = &url[start..];
    let end = rest
        .as_bytes()
        .iter()
        .position(|&b| b == b'?' || b == b'#')
        .unwrap_or(rest.len());

    let path = &rest[..end];
    if path.is_empty() && get_scheme_end(url).is_some() {
        "/"
    } else {
        path
    }
}

/// Extract the query string including its leading `?`, the same shape as
/// `location.search`. Empty when there is no query.
#[inline]
pub fn extract_query(url: &str) -> &str {
    let without_fragment = match url.find('#') {
        Some(pos) => &url[..pos],
        None => url,
    };
    match without_fragment.find('?') {
        Some(pos) if pos + 1 < without_fragment.len() => &without_fragment[pos..],
        _ => "",
    }
}

/// Check whether a query string (with or without its leading `?`) carries
/// `name=value` as one of its parameters.
#[inline]
pub fn has_query_param(query: &str, name: &str, value: &str) -> bool {
    let query = query.strip_prefix('?').unwrap_or(query);
    query.split('&').any(|pair| match pair.split_once('=') {
        Some((k, v)) => k == name && v == value,
        None => false,
    })
}

/// Whether a path addresses the site root. The page reports an empty
/// pathname on a few transitional states, which counts as root.
#[inline]
pub fn is_root_path(path: &str) -> bool {
    path.is_empty() || path == "/"
}
