//! Request and response bodies of the queue HTTP API.

use serde::{Deserialize, Serialize};

use super::patient::{lenient_number, lenient_text, EsiLevel, Vitals};

/// `POST /api/submit` body.
///
/// Only `name`, `age` and `complaint` are expected by every backend; the
/// rest may be absent or null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub age: String,
    #[serde(default)]
    pub complaint: String,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub sbp: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub temp: Option<f64>,
}

impl SubmitRequest {
    pub fn vitals(&self) -> Vitals {
        Vitals {
            hr: self.hr,
            sbp: self.sbp,
            rr: self.rr,
            temp: self.temp,
        }
        .normalized()
    }
}

/// `POST /api/submit` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub status: String,
    pub esi: EsiLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
}

/// `POST /api/complete/{id}` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub success: bool,
}

/// `GET /session` response from the auth backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    #[serde(default)]
    pub logged_in: bool,
}
