//! File-backed payloads used as step inputs.

use crate::error::Error;
use serde_json::{json, Value};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::debug;

pub const DEFAULT_RESOURCE_PATH: &str = "src/integrationtest/resources/";
pub const BODIES_PATH: &str = "bodies";
pub const RESPONSES_PATH: &str = "responses";
pub const EIFFEL_EVENT_FILE: &str = "eiffel_event.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureStore {
    root: PathBuf,
}

impl FixtureStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn body(&self, filename: &str) -> Result<String, Error> {
        Self::read(self.root.join(BODIES_PATH).join(filename))
    }

    pub fn response(&self, filename: &str) -> Result<String, Error> {
        Self::read(self.root.join(RESPONSES_PATH).join(filename))
    }

    pub fn event(&self) -> Result<String, Error> {
        Self::read(self.root.join(EIFFEL_EVENT_FILE))
    }

    /// Builds the body of an aggregation request from a rules file and an
    /// events file, both of which must hold JSON arrays.
    pub fn aggregation_body(&self, rules_file: &str, events_file: &str) -> Result<String, Error> {
        let rules = self.json_array(BODIES_PATH, rules_file)?;
        let events = self.json_array(BODIES_PATH, events_file)?;

        Ok(json!({
            "listRulesJson": rules,
            "listEventsJson": events,
        })
        .to_string())
    }

    fn json_array(&self, directory: &str, filename: &str) -> Result<Value, Error> {
        let path = self.root.join(directory).join(filename);
        let content = Self::read(&path)?;

        match serde_json::from_str::<Value>(&content) {
            Ok(value @ Value::Array(_)) => Ok(value),
            Ok(_) => Err(Error::InvalidFixture {
                path,
                reason: String::from("expected a JSON array"),
            }),
            Err(e) => Err(Error::InvalidFixture {
                path,
                reason: e.to_string(),
            }),
        }
    }

    fn read<P: AsRef<Path>>(path: P) -> Result<String, Error> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading fixture");

        fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::ResourceNotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Io(e),
        })
    }
}

impl Default for FixtureStore {
    fn default() -> Self {
        Self::new(DEFAULT_RESOURCE_PATH)
    }
}
