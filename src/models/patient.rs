use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════
// ESI level
// ═══════════════════════════════════════════

/// Emergency Severity Index, 1 (most urgent) through 5 (least urgent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct EsiLevel(u8);

impl EsiLevel {
    pub const MOST_URGENT: EsiLevel = EsiLevel(1);
    pub const LEAST_URGENT: EsiLevel = EsiLevel(5);

    /// Returns `None` outside 1..=5.
    pub const fn new(level: u8) -> Option<Self> {
        if level >= 1 && level <= 5 {
            Some(Self(level))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// ESI 1 and 2 count towards the dashboard's critical metric.
    pub const fn is_critical(self) -> bool {
        self.0 <= 2
    }
}

impl TryFrom<u8> for EsiLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("ESI level must be between 1 and 5, got {value}"))
    }
}

impl From<EsiLevel> for u8 {
    fn from(level: EsiLevel) -> Self {
        level.0
    }
}

impl fmt::Display for EsiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ═══════════════════════════════════════════
// Status
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    #[default]
    Active,
    Completed,
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// Short label used in queue rows.
    pub fn queue_label(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Completed => "DONE",
        }
    }
}

// ═══════════════════════════════════════════
// Vitals
// ═══════════════════════════════════════════

/// Optional bedside vitals. A zero reading is treated as "not taken".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    #[serde(default, deserialize_with = "lenient_number")]
    pub hr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub sbp: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub temp: Option<f64>,
}

impl Vitals {
    /// Drops zero or non-finite readings.
    pub fn normalized(self) -> Self {
        fn keep(v: Option<f64>) -> Option<f64> {
            v.filter(|x| x.is_finite() && *x != 0.0)
        }
        Self {
            hr: keep(self.hr),
            sbp: keep(self.sbp),
            rr: keep(self.rr),
            temp: keep(self.temp),
        }
    }

    pub fn is_empty(&self) -> bool {
        let n = self.normalized();
        n.hr.is_none() && n.sbp.is_none() && n.rr.is_none() && n.temp.is_none()
    }

    /// `HR 110 • SBP 90 • Temp 38.5`, or `None` when nothing was recorded.
    pub fn display_text(&self) -> Option<String> {
        let n = self.normalized();
        let parts: Vec<String> = [("HR", n.hr), ("SBP", n.sbp), ("RR", n.rr), ("Temp", n.temp)]
            .into_iter()
            .filter_map(|(label, value)| value.map(|v| format!("{label} {v}")))
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" • "))
        }
    }
}

// ═══════════════════════════════════════════
// Patient record
// ═══════════════════════════════════════════

/// One patient in the triage queue, as persisted and as served by `/api/queue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    /// Submission time, `HH:MM:SS` local. Display only.
    #[serde(default)]
    pub time: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub age: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub vitals: Vitals,
    pub complaint: String,
    pub esi: EsiLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default)]
    pub status: PatientStatus,
}

impl PatientRecord {
    pub fn is_active(&self) -> bool {
        self.status == PatientStatus::Active
    }
}

// ═══════════════════════════════════════════
// Lenient field decoding
// ═══════════════════════════════════════════

/// Accepts a JSON number, a numeric string, an empty string or null.
///
/// Kiosk forms post raw input values, so `"120"` and `""` both show up.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| de::Error::custom(format!("not a number: {trimmed}")))
            }
        }
        Some(other) => Err(de::Error::custom(format!("expected a number, got {other}"))),
    }
}

/// Accepts a string or a number and keeps it as text.
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(s)) => Ok(s),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(de::Error::custom(format!("expected text, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn esi_rejects_out_of_range() {
        assert!(EsiLevel::new(0).is_none());
        assert!(EsiLevel::new(6).is_none());
        assert_eq!(EsiLevel::new(3).map(EsiLevel::get), Some(3));
    }

    #[test]
    fn esi_decoding_rejects_zero_and_six() {
        assert!(serde_json::from_str::<EsiLevel>("0").is_err());
        assert!(serde_json::from_str::<EsiLevel>("6").is_err());
        assert_eq!(serde_json::from_str::<EsiLevel>("2").unwrap().get(), 2);
    }

    #[test]
    fn critical_is_one_and_two() {
        assert!(EsiLevel::new(1).unwrap().is_critical());
        assert!(EsiLevel::new(2).unwrap().is_critical());
        assert!(!EsiLevel::new(3).unwrap().is_critical());
    }

    #[test]
    fn status_uses_lowercase_wire_names() {
        assert_eq!(
            serde_json::from_str::<PatientStatus>(r#""completed""#).unwrap(),
            PatientStatus::Completed
        );
        assert!(serde_json::from_str::<PatientStatus>(r#""done""#).is_err());
        assert_eq!(PatientStatus::Active.as_str(), "active");
    }

    #[test]
    fn vitals_text_skips_zero_and_missing() {
        let vitals = Vitals {
            hr: Some(110.0),
            sbp: Some(0.0),
            rr: None,
            temp: Some(38.5),
        };
        assert_eq!(vitals.display_text().as_deref(), Some("HR 110 • Temp 38.5"));
        assert!(Vitals::default().display_text().is_none());
        assert!(Vitals { hr: Some(0.0), ..Vitals::default() }.is_empty());
    }

    #[test]
    fn vitals_accept_form_strings() {
        let vitals: Vitals =
            serde_json::from_str(r#"{"hr":"120","sbp":"","rr":null,"temp":37.2}"#).unwrap();
        assert_eq!(vitals.hr, Some(120.0));
        assert_eq!(vitals.sbp, None);
        assert_eq!(vitals.rr, None);
        assert_eq!(vitals.temp, Some(37.2));
    }

    #[test]
    fn record_decodes_backend_shape() {
        let json = r#"{
            "id": "abc",
            "name": "Jane",
            "age": 29,
            "esi": 2,
            "complaint": "chest pain",
            "status": "completed",
            "time": "10:01:02"
        }"#;
        let record: PatientRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.age, "29");
        assert_eq!(record.status, PatientStatus::Completed);
        assert!(record.analysis.is_none());
        assert!(record.vitals.is_empty());
    }

    #[test]
    fn record_with_invalid_esi_fails() {
        let json = r#"{"id":"x","name":"A","complaint":"c","esi":0}"#;
        assert!(serde_json::from_str::<PatientRecord>(json).is_err());
    }
}
