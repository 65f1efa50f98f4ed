//! Table of step patterns and the handlers they dispatch to.

use crate::{error::Error, scenario_context::ScenarioContext};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::{fmt, str::FromStr, time::Duration};
use tracing::trace;

pub type StepHandler = fn(&mut ScenarioContext, &Captures) -> Result<(), Error>;

/// Longest wait the polling step accepts.
const MAX_WAIT_SECONDS: u64 = 24 * 60 * 60;

lazy_static! {
    static ref KEYWORD_REGEX: Regex = Regex::new(r"^\s*(?:Given|When|Then|And|But|\*)\s+").unwrap();
    static ref FRONTEND_STEPS: StepRegistry = frontend_steps().unwrap();
}

#[derive(Clone)]
pub struct StepDefinition {
    pattern: Regex,
    handler: StepHandler,
}

impl StepDefinition {
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: Vec<StepDefinition>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// The step vocabulary for driving the front-end.
    pub fn frontend() -> Self {
        FRONTEND_STEPS.clone()
    }

    /// Adds a step. The pattern is anchored at both ends.
    pub fn register(&mut self, pattern: &str, handler: StepHandler) -> Result<&mut Self, Error> {
        let anchored = format!(
            "^{}$",
            pattern.trim_start_matches('^').trim_end_matches('$')
        );
        self.steps.push(StepDefinition {
            pattern: Regex::new(&anchored)?,
            handler,
        });
        Ok(self)
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Runs the first step whose pattern matches `step`. A leading Gherkin
    /// keyword is ignored.
    pub fn dispatch(&self, context: &mut ScenarioContext, step: &str) -> Result<(), Error> {
        let text = strip_keyword(step);

        for definition in &self.steps {
            if let Some(captures) = definition.pattern.captures(text) {
                trace!(step = text, pattern = definition.pattern(), "dispatching step");
                return (definition.handler)(context, &captures);
            }
        }

        Err(Error::UnknownStep(text.into()))
    }
}

pub fn strip_keyword(step: &str) -> &str {
    match KEYWORD_REGEX.find(step) {
        Some(keyword) => step[keyword.end()..].trim_end(),
        None => step.trim(),
    }
}

fn text<'t>(captures: &Captures<'t>, index: usize) -> &'t str {
    captures.get(index).map_or("", |m| m.as_str())
}

fn number<T: FromStr>(captures: &Captures, index: usize) -> Result<T, Error> {
    let value = text(captures, index);
    value.parse().map_err(|_| Error::InvalidStepArgument {
        value: value.into(),
        reason: String::from("not a valid number"),
    })
}

fn frontend_steps() -> Result<StepRegistry, Error> {
    let mut registry = StepRegistry::new();

    registry
        .register(r"frontend is up and running", |context, _| {
            context.frontend_running()
        })?
        .register(r"an aggregated object is created", |context, _| {
            context.publish_event()
        })?
        .register(r"a '(\w+)' request is prepared for REST API '(.*)'", |context, captures| {
            context.prepare_request(text(captures, 1), text(captures, 2))
        })?
        .register(r"'(.*)' is appended to endpoint", |context, captures| {
            context.append_to_endpoint(text(captures, 1))
        })?
        .register(r"param key '(.*)' with value '(.*)' is added", |context, captures| {
            context.add_param(text(captures, 1), text(captures, 2))
        })?
        .register(r"body is set to file '(.*)'", |context, captures| {
            context.set_body_from_file(text(captures, 1))
        })?
        .register(
            r"aggregation is prepared with rules file '(.*)' and events file '(.*)'",
            |context, captures| context.prepare_aggregation(text(captures, 1), text(captures, 2)),
        )?
        .register(
            r#"username "(\w+)" and password "(\w+)" is used as credentials"#,
            |context, captures| context.use_credentials(text(captures, 1), text(captures, 2)),
        )?
        .register(r"request is sent", |context, _| {
            context.send_request().map(|_| ())
        })?
        .register(
            r"request is sent for (\d+) seconds until reponse code no longer matches (\d+)",
            |context, captures| {
                let seconds: u64 = number(captures, 1)?;
                if seconds > MAX_WAIT_SECONDS {
                    return Err(Error::InvalidStepArgument {
                        value: seconds.to_string(),
                        reason: format!("waits are limited to {} seconds", MAX_WAIT_SECONDS),
                    });
                }
                let stop_code: u16 = number(captures, 2)?;
                context.send_until_status_changes(Duration::from_secs(seconds), stop_code)
            },
        )?
        .register(r"response code (\d+) is received", |context, captures| {
            context.assert_response_code(number(captures, 1)?)
        })?
        .register(r"response body '(.*)' is received", |context, captures| {
            context.assert_response_body(text(captures, 1))
        })?
        .register(r"response body from file '(.*)' is received", |context, captures| {
            context.assert_response_body_from_file(text(captures, 1))
        })?
        .register(r"response body contains '(.*)'", |context, captures| {
            context.assert_response_body_contains(text(captures, 1))
        })?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::ResponseData, harness_configuration::HarnessConfiguration,
        http_client::HttpClient, http_request::HttpRequest, messaging::RecordingPublisher,
    };
    use std::sync::Arc;

    #[derive(Debug)]
    struct StatusEndpoint;

    impl HttpClient for StatusEndpoint {
        fn make_request(&self, request: &HttpRequest) -> Result<ResponseData, Error> {
            match request.endpoint() {
                "/status" => Ok(ResponseData::new(200, "{\"status\":\"ready\"}")),
                _ => Ok(ResponseData::new(404, "")),
            }
        }
    }

    fn context() -> ScenarioContext {
        let mut configuration = HarnessConfiguration::new();
        configuration.set_frontend_port(8080);
        ScenarioContext::new(
            configuration,
            Arc::new(StatusEndpoint),
            Arc::new(RecordingPublisher::new()),
        )
    }

    #[test]
    fn strips_gherkin_keywords() {
        assert_eq!(
            strip_keyword("Given frontend is up and running"),
            "frontend is up and running"
        );
        assert_eq!(strip_keyword("  And request is sent  "), "request is sent");
        assert_eq!(strip_keyword("request is sent"), "request is sent");
        assert_eq!(strip_keyword("Andrew is here"), "Andrew is here");
    }

    #[test]
    fn status_scenario_passes_200_and_fails_404() {
        let registry = StepRegistry::frontend();
        let mut context = context();

        registry
            .dispatch(&mut context, "When a 'GET' request is prepared for REST API '/status'")
            .unwrap();
        registry.dispatch(&mut context, "And request is sent").unwrap();
        registry
            .dispatch(&mut context, "Then response code 200 is received")
            .unwrap();
        registry
            .dispatch(&mut context, "And response body contains 'ready'")
            .unwrap();

        let error = registry
            .dispatch(&mut context, "Then response code 404 is received")
            .unwrap_err();
        assert!(error.is_assertion_failure());
    }

    #[test]
    fn unmatched_text_is_an_unknown_step() {
        let registry = StepRegistry::frontend();
        let mut context = context();

        assert!(matches!(
            registry.dispatch(&mut context, "Given the moon is full"),
            Err(Error::UnknownStep(step)) if step == "the moon is full"
        ));
    }

    #[test]
    fn patterns_match_the_whole_step() {
        let registry = StepRegistry::frontend();
        let mut context = context();

        assert!(matches!(
            registry.dispatch(&mut context, "When request is sent twice"),
            Err(Error::UnknownStep(_))
        ));
    }

    #[test]
    fn custom_steps_can_be_registered() {
        let mut registry = StepRegistry::new();
        registry
            .register(r"^port is (\d+)$", |context, captures| {
                let port: u16 = number(captures, 1)?;
                if context.configuration().frontend_port() == port {
                    Ok(())
                } else {
                    Err(Error::assertion("Port", port, context.configuration().frontend_port()))
                }
            })
            .unwrap();

        let mut context = context();
        registry.dispatch(&mut context, "Then port is 8080").unwrap();
        assert!(registry.dispatch(&mut context, "Then port is 1").is_err());
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        let mut registry = StepRegistry::new();

        assert!(matches!(
            registry.register("(unclosed", |_, _| Ok(())),
            Err(Error::InvalidStepPattern(_))
        ));
    }

    #[test]
    fn overlong_waits_are_rejected_before_polling() {
        let registry = StepRegistry::frontend();
        let mut context = context();
        registry
            .dispatch(&mut context, "When a 'GET' request is prepared for REST API '/missing'")
            .unwrap();

        let result = registry.dispatch(
            &mut context,
            "And request is sent for 18446744073709551615 seconds until reponse code no longer matches 404",
        );

        assert!(matches!(result, Err(Error::InvalidStepArgument { .. })));
        assert!(context.response().is_none());
    }

    #[test]
    fn frontend_table_covers_the_whole_vocabulary() {
        assert_eq!(StepRegistry::frontend().steps().len(), 14);
    }
}
