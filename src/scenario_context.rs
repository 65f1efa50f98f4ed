use crate::{
    assertions,
    data::{HttpMethod, ResponseData},
    error::Error,
    fixtures::FixtureStore,
    harness_configuration::HarnessConfiguration,
    http_client::HttpClient,
    http_request::HttpRequest,
    messaging::MessagePublisher,
    polling::{self, Clock, SystemClock},
};
use std::{sync::Arc, time::Duration};
use tracing::debug;

/// Status the front-end answers with once it is ready.
pub const READY_STATUS: u16 = 200;

const NO_REQUEST: &str = "No request has been prepared";
const NO_RESPONSE: &str = "No request has been sent yet";
const NO_BROKER: &str = "No message broker is configured";

/// State of one running scenario: the request being built, the last response
/// and the collaborators the steps talk to.
#[derive(Debug)]
pub struct ScenarioContext {
    configuration: HarnessConfiguration,
    fixtures: FixtureStore,
    http_client: Arc<dyn HttpClient + Send + Sync>,
    publisher: Arc<dyn MessagePublisher + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    request: Option<HttpRequest>,
    response: Option<ResponseData>,
}

impl ScenarioContext {
    pub fn new(
        configuration: HarnessConfiguration,
        http_client: Arc<dyn HttpClient + Send + Sync>,
        publisher: Arc<dyn MessagePublisher + Send + Sync>,
    ) -> Self {
        Self {
            fixtures: FixtureStore::new(configuration.resource_path()),
            configuration,
            http_client,
            publisher,
            clock: Arc::new(SystemClock),
            request: None,
            response: None,
        }
    }

    pub fn set_clock(&mut self, clock: Arc<dyn Clock + Send + Sync>) {
        self.clock = clock;
    }

    pub fn configuration(&self) -> &HarnessConfiguration {
        &self.configuration
    }

    pub fn request(&self) -> Option<&HttpRequest> {
        self.request.as_ref()
    }

    pub fn response(&self) -> Option<&ResponseData> {
        self.response.as_ref()
    }

    pub fn frontend_running(&self) -> Result<(), Error> {
        let port = self.configuration.frontend_port();
        debug!(port, "front-end port");

        if port == 0 {
            return Err(Error::assertion(
                "Front-end port",
                "a non-zero port",
                port,
            ));
        }

        Ok(())
    }

    /// Publishes the Eiffel event fixture to the configured exchange.
    pub fn publish_event(&self) -> Result<(), Error> {
        let broker = self
            .configuration
            .broker()
            .ok_or(Error::MissingState(NO_BROKER))?;
        let event = self.fixtures.event()?;

        debug!(exchange = %broker.exchange, "sending Eiffel events for aggregation");
        let accepted = self
            .publisher
            .publish(&event, &broker.exchange, &broker.routing_key)?;
        if !accepted {
            return Err(Error::assertion("Event publication", true, false));
        }
        debug!("Eiffel events sent");

        Ok(())
    }

    pub fn prepare_request(&mut self, method: &str, endpoint: &str) -> Result<(), Error> {
        debug!(method, endpoint, "preparing request");
        let mut request = HttpRequest::new(method.parse::<HttpMethod>()?);
        request
            .set_host(self.configuration.frontend_host())
            .set_port(self.configuration.frontend_port())
            .set_endpoint(endpoint);

        self.request = Some(request);
        Ok(())
    }

    pub fn append_to_endpoint(&mut self, suffix: &str) -> Result<(), Error> {
        let request = self.request_mut()?;
        let endpoint = format!("{}{}", request.endpoint(), suffix);
        request.set_endpoint(endpoint);
        Ok(())
    }

    pub fn add_param(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.request_mut()?.add_param(key, value);
        Ok(())
    }

    pub fn set_body_from_file(&mut self, filename: &str) -> Result<(), Error> {
        let body = self.fixtures.body(filename)?;
        self.request_mut()?
            .add_header("Content-type", "application/json")
            .set_body(body);
        Ok(())
    }

    pub fn prepare_aggregation(
        &mut self,
        rules_file: &str,
        events_file: &str,
    ) -> Result<(), Error> {
        let body = self.fixtures.aggregation_body(rules_file, events_file)?;
        self.request_mut()?.set_body(body);
        Ok(())
    }

    pub fn use_credentials(&mut self, username: &str, password: &str) -> Result<(), Error> {
        self.request_mut()?.set_basic_auth(username, password);
        Ok(())
    }

    pub fn send_request(&mut self) -> Result<&ResponseData, Error> {
        let request = self.request.as_ref().ok_or(Error::MissingState(NO_REQUEST))?;
        let response = request.perform_request(self.http_client.as_ref())?;
        debug!(status = response.status_code, "response received");

        Ok(self.response.insert(response))
    }

    /// Resends the request while it answers `stop_code`, for at most `timeout`,
    /// then requires the front-end to have answered with [`READY_STATUS`].
    pub fn send_until_status_changes(
        &mut self,
        timeout: Duration,
        stop_code: u16,
    ) -> Result<(), Error> {
        let request = self.request.as_ref().ok_or(Error::MissingState(NO_REQUEST))?;
        let policy = self.configuration.retry_policy(timeout);

        let outcome = polling::poll_while_status(
            request,
            stop_code,
            &policy,
            self.http_client.as_ref(),
            self.clock.as_ref(),
        )?;
        debug!(
            attempts = outcome.attempts,
            status = outcome.response.status_code,
            "polling finished"
        );

        let response = self.response.insert(outcome.response);
        assertions::assert_status(response, READY_STATUS)
    }

    pub fn assert_response_code(&self, expected: u16) -> Result<(), Error> {
        let response = self.last_response()?;
        debug!(status = response.status_code, "response code");
        assertions::assert_status(response, expected)
    }

    pub fn assert_response_body(&self, expected: &str) -> Result<(), Error> {
        let response = self.last_response()?;
        debug!(body = %response.body, "response body");
        assertions::assert_body(response, expected)
    }

    pub fn assert_response_body_from_file(&self, filename: &str) -> Result<(), Error> {
        let expected = self.fixtures.response(filename)?;
        let response = self.last_response()?;
        debug!(body = %response.body, "response body");
        assertions::assert_body_normalized(response, &expected)
    }

    pub fn assert_response_body_contains(&self, fragment: &str) -> Result<(), Error> {
        let response = self.last_response()?;
        debug!(body = %response.body, contains = fragment, "response body");
        assertions::assert_body_contains(response, fragment)
    }

    fn request_mut(&mut self) -> Result<&mut HttpRequest, Error> {
        self.request.as_mut().ok_or(Error::MissingState(NO_REQUEST))
    }

    fn last_response(&self) -> Result<&ResponseData, Error> {
        self.response.as_ref().ok_or(Error::MissingState(NO_RESPONSE))
    }
}
