use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Episode {
    // Path relative to the source base url, or an absolute url for off-site players
    pub url: String,
    pub name: String,
    pub episode_number: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanlator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_upload: Option<DateTime<Utc>>,
}

impl Episode {
    pub fn new(url: impl Into<String>, name: impl Into<String>, episode_number: f32) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            episode_number,
            scanlator: None,
            date_upload: None,
        }
    }

    pub fn with_scanlator(mut self, scanlator: Option<String>) -> Self {
        self.scanlator = scanlator;
        self
    }

    pub fn with_date_upload(mut self, date_upload: Option<DateTime<Utc>>) -> Self {
        self.date_upload = date_upload;
        self
    }
}
