use serde::{Deserialize, Serialize};

use crate::models::{SubmitRequest, Vitals};

/// Message shown when required intake fields are missing.
pub const MISSING_FIELDS_MESSAGE: &str = "Please enter name and symptoms.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("Please enter name and symptoms.")]
    MissingRequired { name: bool, complaint: bool },
}

/// Raw kiosk form contents, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeForm {
    pub name: String,
    pub age: String,
    pub sex: String,
    pub complaint: String,
    pub vitals: Vitals,
}

/// A validated intake: `name` and `complaint` are non-empty and trimmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intake {
    pub name: String,
    pub age: String,
    pub sex: String,
    pub complaint: String,
    pub vitals: Vitals,
}

/// Validate the form. Nothing is sent anywhere when this fails.
pub fn collect_intake(form: &IntakeForm) -> Result<Intake, IntakeError> {
    let name = form.name.trim();
    let complaint = form.complaint.trim();

    if name.is_empty() || complaint.is_empty() {
        return Err(IntakeError::MissingRequired {
            name: name.is_empty(),
            complaint: complaint.is_empty(),
        });
    }

    Ok(Intake {
        name: name.to_string(),
        age: form.age.trim().to_string(),
        sex: form.sex.trim().to_string(),
        complaint: complaint.to_string(),
        vitals: form.vitals.normalized(),
    })
}

impl From<&Intake> for SubmitRequest {
    fn from(intake: &Intake) -> Self {
        Self {
            name: intake.name.clone(),
            age: intake.age.clone(),
            complaint: intake.complaint.clone(),
            sex: (!intake.sex.is_empty()).then(|| intake.sex.clone()),
            hr: intake.vitals.hr,
            sbp: intake.vitals.sbp,
            rr: intake.vitals.rr,
            temp: intake.vitals.temp,
        }
    }
}

impl From<SubmitRequest> for IntakeForm {
    fn from(req: SubmitRequest) -> Self {
        let vitals = req.vitals();
        Self {
            name: req.name,
            age: req.age,
            sex: req.sex.unwrap_or_default(),
            complaint: req.complaint,
            vitals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, complaint: &str) -> IntakeForm {
        IntakeForm {
            name: name.into(),
            age: "29".into(),
            sex: "F".into(),
            complaint: complaint.into(),
            vitals: Vitals::default(),
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = collect_intake(&form("  ", "fever")).unwrap_err();
        assert_eq!(
            err,
            IntakeError::MissingRequired {
                name: true,
                complaint: false
            }
        );
        assert_eq!(err.to_string(), MISSING_FIELDS_MESSAGE);
    }

    #[test]
    fn empty_complaint_is_rejected() {
        assert!(collect_intake(&form("Jane", "")).is_err());
    }

    #[test]
    fn fields_are_trimmed() {
        let intake = collect_intake(&form(" Jane ", " fever \n")).unwrap();
        assert_eq!(intake.name, "Jane");
        assert_eq!(intake.complaint, "fever");
    }

    #[test]
    fn submit_request_drops_empty_sex_and_zero_vitals() {
        let mut f = form("Jane", "fever");
        f.sex.clear();
        f.vitals.hr = Some(0.0);
        f.vitals.temp = Some(38.4);
        let req = SubmitRequest::from(&collect_intake(&f).unwrap());
        assert_eq!(req.sex, None);
        assert_eq!(req.hr, None);
        assert_eq!(req.temp, Some(38.4));
    }
}
