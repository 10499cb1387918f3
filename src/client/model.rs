use serde::Deserialize;

use crate::model::WfhRequest;

/// Shape shared by the services' acknowledgement and error bodies.
#[derive(Deserialize, Debug, Default)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MessageBody {
    pub fn text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .filter(|m| !m.trim().is_empty())
    }
}

#[derive(Deserialize, Debug)]
pub struct UpdateRequestResp {
    #[serde(default)]
    pub message: Option<String>,
    pub request: WfhRequest,
}
