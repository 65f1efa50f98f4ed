//! Parses Gherkin feature text and runs its scenarios against the step table.

use crate::{
    error::Error,
    harness_configuration::HarnessConfiguration,
    http_client::{HttpClient, ReqwestHttpClient},
    messaging::MessagePublisher,
    polling::{Clock, SystemClock},
    scenario_context::ScenarioContext,
    step_registry::StepRegistry,
};
use gherkin::GherkinEnv;
use std::{fs, io, path::Path, sync::Arc};
use tracing::{debug, info, warn};

/// Scenarios carrying one of these tags publish events and need a broker.
pub const BROKER_TAGS: [&str; 2] = ["QueryByIdScenario", "QueryFreestyleScenario"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    /// Tags without their leading `@`.
    pub tags: Vec<String>,
    pub steps: Vec<String>,
}

impl Scenario {
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim_start_matches('@');
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    pub scenarios: Vec<Scenario>,
}

impl Feature {
    /// Parses Gherkin feature text into runnable scenarios.
    ///
    /// Background steps are prepended to every scenario, rules are flattened
    /// into their scenarios and tags are inherited from the feature and rule.
    /// Scenario outlines and steps carrying a doc string or data table have no
    /// handler to run them and are rejected.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let feature = gherkin::Feature::parse(text, GherkinEnv::default())
            .map_err(|e| Error::FeatureSyntax(e.to_string()))?;

        let background = background_steps(feature.background.as_ref())?;
        let mut scenarios = feature
            .scenarios
            .iter()
            .map(|scenario| scenario_from(scenario, &feature.tags, &background))
            .collect::<Result<Vec<_>, _>>()?;

        for rule in &feature.rules {
            let mut tags = feature.tags.clone();
            tags.extend(rule.tags.iter().cloned());
            let mut steps = background.clone();
            steps.extend(background_steps(rule.background.as_ref())?);

            for scenario in &rule.scenarios {
                scenarios.push(scenario_from(scenario, &tags, &steps)?);
            }
        }

        debug!(feature = %feature.name, scenarios = scenarios.len(), "parsed feature");
        Ok(Self {
            name: feature.name.trim().to_owned(),
            scenarios,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::ResourceNotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Io(e),
        })?;
        Self::parse(&text)
    }
}

fn scenario_from(
    scenario: &gherkin::Scenario,
    inherited_tags: &[String],
    background: &[String],
) -> Result<Scenario, Error> {
    if !scenario.examples.is_empty() {
        return Err(Error::FeatureSyntax(format!(
            "line {}: scenario outline \"{}\" is not supported",
            scenario.position.line, scenario.name
        )));
    }

    let mut steps = background.to_vec();
    steps.extend(step_lines(&scenario.steps)?);

    Ok(Scenario {
        name: scenario.name.trim().to_owned(),
        tags: inherited_tags.iter().chain(&scenario.tags).cloned().collect(),
        steps,
    })
}

fn background_steps(background: Option<&gherkin::Background>) -> Result<Vec<String>, Error> {
    background.map_or_else(|| Ok(Vec::new()), |background| step_lines(&background.steps))
}

fn step_lines(steps: &[gherkin::Step]) -> Result<Vec<String>, Error> {
    steps.iter().map(step_line).collect()
}

fn step_line(step: &gherkin::Step) -> Result<String, Error> {
    if step.docstring.is_some() || step.table.is_some() {
        return Err(Error::FeatureSyntax(format!(
            "line {}: step \"{}\" has a doc string or data table",
            step.position.line, step.value
        )));
    }

    Ok(format!("{} {}", step.keyword.trim(), step.value.trim()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOutcome {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureReport {
    pub feature: String,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl FeatureReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.passed)
    }
}

/// Runs scenarios one after another, each in a fresh [`ScenarioContext`].
#[derive(Debug)]
pub struct ScenarioRunner {
    registry: StepRegistry,
    configuration: HarnessConfiguration,
    http_client: Arc<dyn HttpClient + Send + Sync>,
    publisher: Arc<dyn MessagePublisher + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl ScenarioRunner {
    pub fn new(
        configuration: HarnessConfiguration,
        publisher: Arc<dyn MessagePublisher + Send + Sync>,
    ) -> Result<Self, Error> {
        let http_client = ReqwestHttpClient::with_timeout(configuration.request_timeout())?;

        Ok(Self {
            registry: StepRegistry::frontend(),
            configuration,
            http_client: Arc::new(http_client),
            publisher,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn set_registry(&mut self, registry: StepRegistry) {
        self.registry = registry;
    }

    pub fn set_http_client(&mut self, http_client: Arc<dyn HttpClient + Send + Sync>) {
        self.http_client = http_client;
    }

    pub fn set_clock(&mut self, clock: Arc<dyn Clock + Send + Sync>) {
        self.clock = clock;
    }

    pub fn run_feature_file<P: AsRef<Path>>(&self, path: P) -> Result<FeatureReport, Error> {
        Ok(self.run_feature(&Feature::load(path)?))
    }

    pub fn run_feature(&self, feature: &Feature) -> FeatureReport {
        info!(feature = %feature.name, scenarios = feature.scenarios.len(), "running feature");

        FeatureReport {
            feature: feature.name.clone(),
            outcomes: feature
                .scenarios
                .iter()
                .map(|scenario| self.run_scenario(scenario))
                .collect(),
        }
    }

    /// Runs every step of `scenario` until the first failure; the remaining
    /// steps are skipped.
    pub fn run_scenario(&self, scenario: &Scenario) -> ScenarioOutcome {
        info!(scenario = %scenario.name, "running scenario");
        let steps_total = scenario.steps.len();
        let mut steps_run = 0;

        let result = self.before_scenario(scenario).and_then(|mut context| {
            for step in &scenario.steps {
                steps_run += 1;
                self.registry
                    .dispatch(&mut context, step)
                    .map_err(|e| format!("Step \"{}\" failed: {}", step, e))?;
            }
            Ok(())
        });

        match result {
            Ok(()) => {
                info!(scenario = %scenario.name, "scenario passed");
                ScenarioOutcome {
                    name: scenario.name.clone(),
                    passed: true,
                    steps_run,
                    steps_total,
                    error: None,
                }
            }
            Err(error) => {
                warn!(
                    scenario = %scenario.name,
                    %error,
                    skipped = steps_total - steps_run,
                    "scenario failed"
                );
                ScenarioOutcome {
                    name: scenario.name.clone(),
                    passed: false,
                    steps_run,
                    steps_total,
                    error: Some(error),
                }
            }
        }
    }

    fn before_scenario(&self, scenario: &Scenario) -> Result<ScenarioContext, String> {
        let needs_broker = BROKER_TAGS.iter().any(|tag| scenario.has_tag(tag));
        if needs_broker && self.configuration.broker().is_none() {
            return Err(Error::Configuration(String::from(
                "scenario publishes events but no message broker is configured",
            ))
            .to_string());
        }

        let mut context = ScenarioContext::new(
            self.configuration.clone(),
            self.http_client.clone(),
            self.publisher.clone(),
        );
        context.set_clock(self.clock.clone());
        Ok(context)
    }
}
