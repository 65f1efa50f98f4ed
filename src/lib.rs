mod assertions;
mod data;
mod error;
mod fixtures;
mod harness_configuration;
mod http_client;
mod http_request;
pub mod logging;
mod messaging;
mod polling;
mod scenario_context;
mod scenario_runner;
mod step_registry;
mod stub_server;
mod util;

pub use assertions::{assert_body, assert_body_contains, assert_body_normalized, assert_status};
pub use data::{HttpMethod, RecordedRequest, ResponseData};
pub use error::{Error, Result};
pub use fixtures::FixtureStore;
pub use harness_configuration::{BrokerConfiguration, HarnessConfiguration};
pub use http_client::{HttpClient, ReqwestHttpClient};
pub use http_request::HttpRequest;
pub use messaging::{MessagePublisher, PublishedMessage, RecordingPublisher};
pub use polling::{poll_while_status, Clock, PollOutcome, RetryPolicy, SystemClock};
pub use scenario_context::{ScenarioContext, READY_STATUS};
pub use scenario_runner::{Feature, FeatureReport, Scenario, ScenarioOutcome, ScenarioRunner};
pub use step_registry::{StepDefinition, StepHandler, StepRegistry};
pub use stub_server::StubFrontend;
pub use util::basic_auth_value;
