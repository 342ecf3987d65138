//! URL utilities for consistent URL handling
//!
//! Base URLs come from user configuration and may or may not carry a
//! trailing slash; these helpers keep endpoint construction free of double
//! slashes.

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use parley::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://api.example.com/v1"), "https://api.example.com/v1");
/// assert_eq!(normalize_base_url("https://api.example.com/v1///"), "https://api.example.com/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash.
///
/// # Examples
///
/// ```
/// use parley::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.example.com/v1beta/", "/models"),
///     "https://api.example.com/v1beta/models"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Path of the `generateContent` method for `model`, relative to the base URL.
pub fn generate_content_path(model: &str) -> String {
    format!("models/{}:generateContent", model.trim())
}

/// Full `generateContent` URL with the API key carried as the `key` query
/// parameter.
pub fn generate_content_url(base_url: &str, model: &str, api_key: &str) -> String {
    format!(
        "{}?key={}",
        construct_api_url(base_url, &generate_content_path(model)),
        api_key
    )
}

/// Drops the query string so the key never reaches log output.
pub fn redact_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}
