use serde::Deserialize;

/// Response of `GET /api/contacts/check-exists`.
#[derive(Debug, Clone, Deserialize)]
pub struct NumberExists {
    #[serde(rename = "numberExists", default)]
    pub number_exists: bool,
    #[serde(rename = "chatId")]
    pub chat_id: Option<String>,
}

/// Response of `GET /api/sessions/{session}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub name: String,
    /// `WORKING`, `SCAN_QR_CODE`, `STARTING`, `STOPPED`, `FAILED`.
    pub status: String,
    pub me: Option<SessionMe>,
}

impl SessionInfo {
    pub fn is_working(&self) -> bool {
        self.status.eq_ignore_ascii_case("WORKING")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionMe {
    pub id: Option<String>,
    #[serde(rename = "pushName")]
    pub push_name: Option<String>,
}
