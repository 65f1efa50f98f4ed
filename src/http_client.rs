use crate::{data::ResponseData, error::Error, http_request::HttpRequest, util};
use reqwest::{blocking::Client, header::HeaderMap};
use std::{fmt::Debug, time::Duration};
use tracing::debug;

pub trait HttpClient: Debug {
    fn make_request(&self, request: &HttpRequest) -> Result<ResponseData, Error>;
}

#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestHttpClient {
    fn make_request(&self, request: &HttpRequest) -> Result<ResponseData, Error> {
        let url = request.url()?;
        let transport_error = |e: reqwest::Error| Error::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let mut headers = HeaderMap::new();
        util::put_headers(&mut headers, request.headers())?;

        let mut builder = self
            .client
            .request(request.method().into(), url.clone())
            .headers(headers);

        if let Some(body) = request.body() {
            builder = builder.body(body.to_owned());
        }

        debug!(method = %request.method(), %url, "sending request");
        let response = builder.send().map_err(transport_error)?;

        let status_code = response.status().as_u16();
        let body = response.text().map_err(transport_error)?;

        Ok(ResponseData { status_code, body })
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}
