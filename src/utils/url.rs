//! Public URL helpers.

/// Public URL of an output path relative to the output root.
///
/// `index.html` → `/`, `posts/index.html` → `/posts/`, `a.html` → `/a.html`.
pub fn public_url(output_path: &str) -> String {
    let path = output_path.replace('\\', "/");
    let path = path.trim_start_matches("./").trim_start_matches('/');
    let path = path.strip_suffix("index.html").unwrap_or(path);
    format!("/{path}")
}

/// Split `scheme://host[:port]/path` into origin and path (path keeps its `/`).
fn split_origin(base_url: &str) -> (&str, &str) {
    let after_scheme = base_url.find("://").map_or(0, |idx| idx + 3);
    match base_url[after_scheme..].find('/') {
        Some(idx) => base_url.split_at(after_scheme + idx),
        None => (base_url, ""),
    }
}

/// Host part of a base URL, without port.
pub fn host(base_url: &str) -> &str {
    let (origin, _) = split_origin(base_url);
    let host = origin.find("://").map_or(origin, |idx| &origin[idx + 3..]);
    host.split(':').next().unwrap_or(host)
}

fn has_scheme(url: &str) -> bool {
    url.find(':').is_some_and(|idx| {
        idx > 0
            && url[..idx]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Remove `.` and `..` segments from an absolute URL path.
fn normalize_url_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let trailing = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    let mut out = format!("/{}", parts.join("/"));
    if trailing && !out.ends_with('/') {
        out.push('/');
    }
    out
}

/// Resolve `url` the way a browser would when it appears on the page served
/// at `base_url` + `page_url`.
pub fn resolve(base_url: &str, page_url: &str, url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    if has_scheme(url) {
        return url.to_owned();
    }

    let (origin, base_path) = split_origin(base_url);
    if let Some(rest) = url.strip_prefix("//") {
        let scheme = origin.split("://").next().unwrap_or("https");
        return format!("{scheme}://{rest}");
    }

    let page_path = format!("{base_path}{page_url}");
    if url.is_empty() {
        return format!("{origin}{page_path}");
    }
    if url.starts_with('#') || url.starts_with('?') {
        let page_path = page_path
            .split(['#', '?'])
            .next()
            .unwrap_or(&page_path)
            .to_owned();
        return format!("{origin}{page_path}{url}");
    }

    // Split off query/fragment so they are not normalized as path segments
    let split_at = url.find(['?', '#']).unwrap_or(url.len());
    let (path, suffix) = url.split_at(split_at);

    let joined = if path.starts_with('/') {
        path.to_owned()
    } else {
        let dir = page_path.rfind('/').map_or("/", |idx| &page_path[..=idx]);
        format!("{dir}{path}")
    };

    format!("{origin}{}{suffix}", normalize_url_path(&joined))
}
