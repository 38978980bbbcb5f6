//! Per-operation outcome records.
//!
//! Every maintenance operation returns one [`OperationReport`]: an item per
//! target touched (an installation, or a plugin/theme inside one) plus a
//! running summary.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Updated,
    Skipped,
    Error,
}

/// Individual item result within an operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReport {
    pub operation: String,
    pub items: Vec<ItemOutcome>,
    pub summary: Summary,
}

impl OperationReport {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            items: Vec::new(),
            summary: Summary::default(),
        }
    }

    pub fn record_updated(&mut self, path: &str, name: Option<&str>) {
        self.summary.succeeded += 1;
        self.push(path, name, ItemStatus::Updated, None);
    }

    pub fn record_skipped(&mut self, path: &str, name: Option<&str>) {
        self.summary.skipped += 1;
        self.push(path, name, ItemStatus::Skipped, None);
    }

    pub fn record_error(&mut self, path: &str, name: Option<&str>, error: String) {
        self.summary.failed += 1;
        self.push(path, name, ItemStatus::Error, Some(error));
    }

    pub fn has_errors(&self) -> bool {
        self.summary.failed > 0
    }

    fn push(&mut self, path: &str, name: Option<&str>, status: ItemStatus, error: Option<String>) {
        self.summary.total += 1;
        self.items.push(ItemOutcome {
            path: path.to_string(),
            name: name.map(str::to_string),
            status,
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_tracks_each_outcome() {
        let mut report = OperationReport::new("update-plugins");
        report.record_updated("/var/www/a", Some("akismet"));
        report.record_skipped("/var/www/a", Some("jetpack"));
        report.record_error("/var/www/b", Some("akismet"), "boom".to_string());

        assert_eq!(
            report.summary,
            Summary {
                total: 3,
                succeeded: 1,
                failed: 1,
                skipped: 1
            }
        );
        assert!(report.has_errors());
    }

    #[test]
    fn serializes_status_and_omits_empty_fields() {
        let mut report = OperationReport::new("update-core");
        report.record_updated("/var/www/a", None);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["items"][0]["status"], "updated");
        assert!(json["items"][0].get("name").is_none());
        assert!(json["items"][0].get("error").is_none());
        assert_eq!(json["summary"]["total"], 1);
    }
}
