use crate::error::Error;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;

pub fn extract_headers(header_map: &hyper::HeaderMap) -> HashMap<String, String> {
    // it currently ignores header values with opaque characters
    header_map
        .iter()
        .map(|(k, v)| (String::from(k.as_str()), v.to_str()))
        .filter_map(|(key, value)| value.ok().map(|v| (key, String::from(v))))
        .collect::<HashMap<_, _>>()
}

pub fn put_headers<'a, I: IntoIterator<Item = (&'a String, &'a String)>>(
    header_map: &mut HeaderMap<HeaderValue>,
    headers: I,
) -> Result<(), Error> {
    for (key, value) in headers {
        let header_name = HeaderName::from_lowercase(key.to_lowercase().as_bytes())
            .map_err(|_| Error::InvalidHeaderName(key.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| Error::InvalidHeaderValue(key.clone()))?;
        header_map.insert(header_name, header_value);
    }

    Ok(())
}

/// Value of an `Authorization` header for HTTP basic authentication.
pub fn basic_auth_value(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", username, password))
    )
}

/// Removes every whitespace character, so bodies that differ only in
/// formatting compare equal.
pub fn strip_whitespace(text: &str) -> String {
    text.split_whitespace().collect()
}
