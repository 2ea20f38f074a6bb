use crate::{DomainError, RecordData, RecordType, ReplyEntry, ResultCode};
use serde::{Deserialize, Serialize};

/// A canned answer from the `[[fake_replies]]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FakeReplyConfig {
    pub name: String,

    pub record_type: RecordType,

    #[serde(default = "default_rcode")]
    pub rcode: ResultCode,

    /// Presentation-format RDATA, one string per answer.
    #[serde(default)]
    pub answers: Vec<String>,

    #[serde(default)]
    pub ttl: u32,
}

impl FakeReplyConfig {
    pub fn entries(&self) -> Result<Vec<ReplyEntry>, DomainError> {
        self.answers
            .iter()
            .map(|a| RecordData::parse(self.record_type, a).map(|d| ReplyEntry::new(d, self.ttl)))
            .collect()
    }
}

fn default_rcode() -> ResultCode {
    ResultCode::NoError
}
