use serde::{Deserialize, Serialize};

/// Run counter and latest score for one monitored service.
///
/// Field names on disk follow the established almanac layout
/// (`Name`, `LastID`, `Score`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    #[serde(rename = "Name")]
    pub name: String,
    /// Number of completed verification runs.
    #[serde(rename = "LastID")]
    pub run_count: u64,
    /// Score after the most recent run. Not clamped.
    #[serde(rename = "Score")]
    pub score: i64,
}

impl ServiceRecord {
    pub fn new(name: impl Into<String>, run_count: u64, score: i64) -> Self {
        Self {
            name: name.into(),
            run_count,
            score,
        }
    }
}

/// The full collection of service records, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Almanac(Vec<ServiceRecord>);

impl Almanac {
    pub fn new(records: Vec<ServiceRecord>) -> Self {
        Self(records)
    }

    /// Decode an almanac from raw JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Case-sensitive, exact-name lookup.
    pub fn find(&self, name: &str) -> Option<&ServiceRecord> {
        self.0.iter().find(|r| r.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut ServiceRecord> {
        self.0.iter_mut().find(|r| r.name == name)
    }

    /// Run count for `name`, or 0 if the service has never been run.
    pub fn run_count(&self, name: &str) -> u64 {
        self.find(name).map_or(0, |r| r.run_count)
    }

    /// Latest score for `name`, or 0 if the service has never been run.
    pub fn score(&self, name: &str) -> i64 {
        self.find(name).map_or(0, |r| r.score)
    }

    /// Fold one completed run into the almanac.
    ///
    /// An existing record has its counter incremented and its score
    /// overwritten; an unseen name is appended with a counter of 1.
    pub fn record(&mut self, name: &str, score: i64) {
        match self.find_mut(name) {
            Some(record) => {
                record.run_count += 1;
                record.score = score;
            }
            None => self.0.push(ServiceRecord::new(name, 1, score)),
        }
    }

    /// Records ordered by descending run count. Ties keep insertion order.
    pub fn sorted(&self) -> Vec<ServiceRecord> {
        let mut records = self.0.clone();
        records.sort_by(|a, b| b.run_count.cmp(&a.run_count));
        records
    }

    pub fn records(&self) -> &[ServiceRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
