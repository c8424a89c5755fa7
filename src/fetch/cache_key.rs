//! Cache key derivation.

use super::params::FetchParams;

/// Build `slice:operation` or `slice:operation:k1=v1&k2=v2`.
///
/// Keys are sorted, so insertion order never changes the result.
///
/// ```
/// use slice_lifecycle::fetch::{create_cache_key, FetchParams};
///
/// let params = FetchParams::new().with("page", 2).with("language", "en");
/// assert_eq!(create_cache_key("posts", "fetch", Some(&params)), "posts:fetch:language=en&page=2");
/// assert_eq!(create_cache_key("posts", "fetch", None), "posts:fetch");
/// ```
pub fn create_cache_key(slice_name: &str, operation: &str, params: Option<&FetchParams>) -> String {
    match params {
        Some(params) if !params.is_empty() => {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            format!("{}:{}:{}", slice_name, operation, query)
        }
        _ => format!("{}:{}", slice_name, operation),
    }
}
