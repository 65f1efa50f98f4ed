use crate::{
    data::{HttpMethod, ResponseData},
    error::Error,
    http_client::HttpClient,
    util,
};
use reqwest::Url;
use std::collections::BTreeMap;

/// An HTTP request assembled step by step before it is sent.
///
/// Parameters and headers follow a replace-on-duplicate policy: setting a key
/// twice keeps only the last value. Header names are compared without regard
/// to case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: HttpMethod,
    host: String,
    port: u16,
    endpoint: String,
    params: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            host: String::from("localhost"),
            port: 80,
            endpoint: String::from("/"),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn set_host<S: Into<String>>(&mut self, host: S) -> &mut Self {
        self.host = host.into();
        self
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.port = port;
        self
    }

    pub fn set_endpoint<S: Into<String>>(&mut self, endpoint: S) -> &mut Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn add_param<S1: Into<String>, S2: Into<String>>(
        &mut self,
        key: S1,
        value: S2,
    ) -> &mut Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn add_header<S1: Into<String>, S2: Into<String>>(
        &mut self,
        name: S1,
        value: S2,
    ) -> &mut Self {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    pub fn set_basic_auth(&mut self, username: &str, password: &str) -> &mut Self {
        self.add_header("Authorization", util::basic_auth_value(username, password))
    }

    pub fn set_body<S: Into<String>>(&mut self, body: S) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Full URL of the request. Query parameters are appended in name order
    /// after any query already present in the endpoint.
    pub fn url(&self) -> Result<Url, Error> {
        let separator = if self.endpoint.starts_with('/') { "" } else { "/" };
        let raw = format!("http://{}:{}{}{}", self.host, self.port, separator, self.endpoint);

        let mut url = Url::parse(&raw).map_err(|e| Error::Transport {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    pub fn perform_request(&self, client: &dyn HttpClient) -> Result<ResponseData, Error> {
        client.make_request(self)
    }
}

#[cfg(test)]
mod tests {
    use super::HttpRequest;
    use crate::{data::HttpMethod, error::Error};

    fn request() -> HttpRequest {
        let mut request = HttpRequest::new(HttpMethod::Get);
        request.set_host("localhost").set_port(8080).set_endpoint("/status");
        request
    }

    #[test]
    fn last_written_param_wins() {
        let mut request = request();
        request.add_param("id", "1").add_param("id", "2").add_param("page", "3");

        assert_eq!(request.params().len(), 2);
        assert_eq!(request.params()["id"], "2");
    }

    #[test]
    fn last_written_header_wins_regardless_of_case() {
        let mut request = request();
        request
            .add_header("Content-type", "text/plain")
            .add_header("content-TYPE", "application/json");

        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn basic_auth_sets_authorization_header() {
        let mut request = request();
        request.set_basic_auth("alice", "secret");

        assert_eq!(
            request.header("authorization"),
            Some("Basic YWxpY2U6c2VjcmV0")
        );
    }

    #[test]
    fn url_contains_encoded_sorted_params() {
        let mut request = request();
        request.add_param("b", "x y").add_param("a", "1&2");

        assert_eq!(
            request.url().unwrap().as_str(),
            "http://localhost:8080/status?a=1%262&b=x+y"
        );
    }

    #[test]
    fn url_keeps_query_already_in_endpoint() {
        let mut request = request();
        request.set_endpoint("search?q=1").add_param("page", "2");

        assert_eq!(
            request.url().unwrap().as_str(),
            "http://localhost:8080/search?q=1&page=2"
        );
    }

    #[test]
    fn malformed_host_is_a_transport_error() {
        let mut request = request();
        request.set_host("not a host");

        assert!(matches!(request.url(), Err(Error::Transport { .. })));
    }
}
