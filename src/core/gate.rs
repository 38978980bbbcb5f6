//! Environment tag gate.
//!
//! Tag requirements only make sense on a DigitalOcean droplet: the local
//! metadata service must answer and identify the host as a droplet, and the
//! droplet must carry every required tag. Anything else fails closed.

use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::{Error, Result, TagsNotSatisfiedDetails};

/// Field whose presence marks the metadata as a droplet's.
pub const ENVIRONMENT_ID_FIELD: &str = "droplet_id";
pub const TAGS_FIELD: &str = "tags";

const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of environment metadata. `None` means "not available here".
pub trait MetadataProvider {
    fn fetch(&self) -> Option<Value>;
}

/// Reads the droplet metadata endpoint.
pub struct DropletMetadata {
    url: String,
}

impl DropletMetadata {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    fn request(&self) -> Result<Value> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("wpkeeper/{}", env!("CARGO_PKG_VERSION")))
            .timeout(METADATA_TIMEOUT)
            .build()
            .map_err(|e| Error::internal_io(e.to_string(), Some("create HTTP client".to_string())))?;

        client
            .get(&self.url)
            .send()
            .map_err(|e| Error::internal_io(e.to_string(), Some("query droplet metadata".to_string())))?
            .json()
            .map_err(|e| Error::internal_json(e.to_string(), Some("parse droplet metadata".to_string())))
    }
}

impl MetadataProvider for DropletMetadata {
    fn fetch(&self) -> Option<Value> {
        match self.request() {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("Issue loading DO Metadata v1 JSON: {}", err.details);
                None
            }
        }
    }
}

/// Flatten `-t a,b -t c` style groups into a de-duplicated tag set.
///
/// Returns `None` when no group was given at all, which disables the gate.
pub fn required_tags(groups: Option<Vec<String>>) -> Option<BTreeSet<String>> {
    groups.map(|groups| {
        groups
            .iter()
            .flat_map(|group| group.split(','))
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    })
}

/// Pass or fail the run against the environment's tags.
pub fn authorize(
    required: Option<&BTreeSet<String>>,
    provider: &dyn MetadataProvider,
) -> Result<()> {
    let Some(required) = required else {
        return Ok(());
    };

    let metadata = provider
        .fetch()
        .filter(|m| m.get(ENVIRONMENT_ID_FIELD).is_some_and(|id| !id.is_null()))
        .ok_or_else(|| Error::not_supported_environment(ENVIRONMENT_ID_FIELD))?;

    let present: BTreeSet<String> = metadata
        .get(TAGS_FIELD)
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if required.is_subset(&present) {
        tracing::debug!(
            "Droplet tags {:?} satisfy requirement {:?}",
            present,
            required
        );
        return Ok(());
    }

    Err(Error::tags_not_satisfied(TagsNotSatisfiedDetails {
        required: required.iter().cloned().collect(),
        missing: required.difference(&present).cloned().collect(),
        present: present.into_iter().collect(),
    }))
}
