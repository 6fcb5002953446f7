//! Access Control Policy
//! Mission: Decide who may touch which patient data, and which fields may change
//!
//! Every decision takes the role from the verified [`Principal`], never from
//! the request body. Decisions are stateless per request.

use crate::auth::models::{Principal, Role};
use crate::directory::models::{
    Gender, PatientPatch, PatientStatus, SubResourceKind, VitalsReading,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    fn verb(&self) -> &'static str {
        match self {
            Action::Read => "view",
            Action::Create => "add",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    fn is_write(&self) -> bool {
        !matches!(self, Action::Read)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Top-level patient profile fields
    Profile,
    /// One of the patient's owned collections
    Collection(SubResourceKind),
    /// Cross-patient search
    PatientDirectory,
    DoctorProfile,
}

impl Resource {
    fn noun(&self) -> &'static str {
        match self {
            Resource::Profile => "patient profiles",
            Resource::Collection(SubResourceKind::Vitals) => "vitals",
            Resource::Collection(SubResourceKind::Prescriptions) => "prescriptions",
            Resource::Collection(SubResourceKind::Histories) => "medical histories",
            Resource::Collection(SubResourceKind::Allergies) => "allergies",
            Resource::PatientDirectory => "the patient directory",
            Resource::DoctorProfile => "doctor profiles",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reason {
    NotOwner,
    DoctorsOnly,
}

/// A denied authorization decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forbidden {
    pub action: Action,
    pub resource: Resource,
    reason: Reason,
}

impl Forbidden {
    pub fn not_owner(action: Action, resource: Resource) -> Self {
        Self {
            action,
            resource,
            reason: Reason::NotOwner,
        }
    }

    pub fn doctors_only(action: Action, resource: Resource) -> Self {
        Self {
            action,
            resource,
            reason: Reason::DoctorsOnly,
        }
    }
}

impl fmt::Display for Forbidden {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            Reason::NotOwner => write!(f, "Unauthorized access"),
            Reason::DoctorsOnly => write!(
                f,
                "Only doctors can {} {}",
                self.action.verb(),
                self.resource.noun()
            ),
        }
    }
}

impl std::error::Error for Forbidden {}

/// Authorize an action on data owned by the patient `patient_id`.
///
/// Doctors may act on any patient. A patient may act only on their own
/// record, and may not write clinician-authored collections even there.
pub fn authorize(
    principal: &Principal,
    action: Action,
    resource: Resource,
    patient_id: &Uuid,
) -> Result<(), Forbidden> {
    let decision = match principal.role {
        Role::Doctor => Ok(()),
        Role::Patient if principal.id != *patient_id => Err(Forbidden::not_owner(action, resource)),
        Role::Patient => match resource {
            Resource::Collection(kind) if kind.is_clinician_authored() && action.is_write() => {
                Err(Forbidden::doctors_only(action, resource))
            }
            Resource::Profile | Resource::Collection(_) => Ok(()),
            Resource::PatientDirectory | Resource::DoctorProfile => {
                Err(Forbidden::doctors_only(action, resource))
            }
        },
    };

    if let Err(denied) = &decision {
        debug!(
            principal = %principal.id,
            role = principal.role.as_str(),
            patient = %patient_id,
            "Denied: {}",
            denied
        );
    }
    decision
}

/// Authorize an action that only doctors may perform
pub fn require_doctor(
    principal: &Principal,
    action: Action,
    resource: Resource,
) -> Result<(), Forbidden> {
    if principal.is_doctor() {
        return Ok(());
    }
    debug!(principal = %principal.id, ?resource, "Denied: doctors only");
    Err(Forbidden::doctors_only(action, resource))
}

/// Vitals that are not a complete reading
#[derive(Debug, Clone, PartialEq)]
pub enum VitalsError {
    Incomplete(Vec<&'static str>),
    OutOfRange(&'static str),
    BloodPressureFormat,
}

impl fmt::Display for VitalsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VitalsError::Incomplete(missing) => write!(
                f,
                "Incomplete vitals: systolic, diastolic, sugar, weight and height are required together (missing {})",
                missing.join(", ")
            ),
            VitalsError::OutOfRange(field) => {
                write!(f, "Invalid vitals data: {} must be a positive number", field)
            }
            VitalsError::BloodPressureFormat => write!(f, "Invalid blood pressure format"),
        }
    }
}

impl std::error::Error for VitalsError {}

/// Vitals fields as submitted. Nothing is applied unless they form a full reading.
///
/// Pressure and sugar may also arrive in display form: `bloodPressure` as
/// `"120/80 mmHg"` and `bloodSugar`. Explicit `systolic`/`diastolic`/`sugar`
/// win when both are sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsInput {
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    pub sugar: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub heart_rate: Option<f64>,
    pub blood_pressure: Option<String>,
    pub blood_sugar: Option<f64>,
}

impl VitalsInput {
    fn is_blank(&self) -> bool {
        self.systolic.is_none()
            && self.diastolic.is_none()
            && self.sugar.is_none()
            && self.weight.is_none()
            && self.height.is_none()
            && self.heart_rate.is_none()
            && self.blood_pressure.is_none()
            && self.blood_sugar.is_none()
    }

    /// Fold the display-form fields into the numeric ones
    fn normalized(mut self) -> Result<Self, VitalsError> {
        if let Some(raw) = self.blood_pressure.take() {
            let (systolic, diastolic) = parse_blood_pressure(&raw)?;
            self.systolic = self.systolic.or(Some(systolic));
            self.diastolic = self.diastolic.or(Some(diastolic));
        }
        self.sugar = self.sugar.or(self.blood_sugar.take());
        Ok(self)
    }

    /// `None` when no vitals were submitted at all
    pub fn coherent(self) -> Result<Option<VitalsReading>, VitalsError> {
        if self.is_blank() {
            return Ok(None);
        }
        self.into_reading().map(Some)
    }

    /// Require a complete reading
    pub fn into_reading(self) -> Result<VitalsReading, VitalsError> {
        let input = self.normalized()?;
        let fields = [
            ("systolic", input.systolic),
            ("diastolic", input.diastolic),
            ("sugar", input.sugar),
            ("weight", input.weight),
            ("height", input.height),
        ];

        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(VitalsError::Incomplete(missing));
        }

        for (name, value) in fields.iter() {
            check_positive(*name, value.unwrap_or_default())?;
        }
        if let Some(heart_rate) = input.heart_rate {
            check_positive("heartRate", heart_rate)?;
        }

        Ok(VitalsReading {
            systolic: input.systolic.unwrap_or_default(),
            diastolic: input.diastolic.unwrap_or_default(),
            sugar: input.sugar.unwrap_or_default(),
            weight: input.weight.unwrap_or_default(),
            height: input.height.unwrap_or_default(),
            heart_rate: input.heart_rate,
        })
    }
}

/// `"120/80"`, optionally followed by a unit such as `mmHg`
fn parse_blood_pressure(raw: &str) -> Result<(f64, f64), VitalsError> {
    let (systolic, rest) = raw
        .split_once('/')
        .ok_or(VitalsError::BloodPressureFormat)?;
    let diastolic = rest.split_whitespace().next().unwrap_or_default();

    match (systolic.trim().parse::<f64>(), diastolic.parse::<f64>()) {
        (Ok(systolic), Ok(diastolic)) => Ok((systolic, diastolic)),
        _ => Err(VitalsError::BloodPressureFormat),
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), VitalsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(VitalsError::OutOfRange(field))
    }
}

/// Body of `PUT /patients/:id`. Fields outside this struct are dropped by serde.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub last_visit: Option<NaiveDate>,
    pub status: Option<PatientStatus>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub blood_group: Option<String>,
    pub primary_contact: Option<String>,
    pub emergency_contact: Option<String>,
    pub current_diagnosis: Option<String>,
    #[serde(flatten)]
    pub vitals: VitalsInput,
}

/// Reduce an update request to the fields `role` may change.
///
/// Doctors get the profile allow-list; patients may only submit vitals.
/// Blank strings count as absent. A partial vitals reading rejects the
/// whole update.
pub fn filter_profile_update(
    role: Role,
    request: ProfileUpdateRequest,
) -> Result<PatientPatch, VitalsError> {
    let vitals = request.vitals.coherent()?;

    let patch = match role {
        Role::Doctor => PatientPatch {
            first_name: non_blank(request.first_name),
            last_name: non_blank(request.last_name),
            age: request.age,
            gender: request.gender,
            blood_group: non_blank(request.blood_group),
            primary_contact: non_blank(request.primary_contact),
            emergency_contact: non_blank(request.emergency_contact),
            last_visit: request.last_visit,
            status: request.status,
            current_diagnosis: non_blank(request.current_diagnosis),
            vitals,
        },
        Role::Patient => PatientPatch {
            vitals,
            ..Default::default()
        },
    };

    Ok(patch)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            role,
        }
    }

    const CLINICAL: [SubResourceKind; 3] = [
        SubResourceKind::Prescriptions,
        SubResourceKind::Histories,
        SubResourceKind::Allergies,
    ];

    fn full_vitals() -> VitalsInput {
        VitalsInput {
            systolic: Some(120.0),
            diastolic: Some(80.0),
            sugar: Some(90.0),
            weight: Some(70.0),
            height: Some(172.0),
            heart_rate: None,
            ..Default::default()
        }
    }

    #[test]
    fn test_doctor_may_do_anything_to_any_patient() {
        let doctor = principal(Role::Doctor);
        let patient_id = Uuid::new_v4();

        for action in [Action::Read, Action::Create, Action::Update, Action::Delete] {
            assert!(authorize(&doctor, action, Resource::Profile, &patient_id).is_ok());
            for kind in CLINICAL {
                assert!(authorize(&doctor, action, Resource::Collection(kind), &patient_id).is_ok());
            }
        }
    }

    #[test]
    fn test_patient_reads_own_record_only() {
        let patient = principal(Role::Patient);
        let own = patient.id;
        let other = Uuid::new_v4();

        assert!(authorize(&patient, Action::Read, Resource::Profile, &own).is_ok());
        assert!(authorize(&patient, Action::Update, Resource::Profile, &own).is_ok());

        let denied = authorize(&patient, Action::Read, Resource::Profile, &other).unwrap_err();
        assert_eq!(denied.to_string(), "Unauthorized access");

        for kind in CLINICAL {
            assert!(authorize(&patient, Action::Read, Resource::Collection(kind), &own).is_ok());
            assert!(authorize(&patient, Action::Read, Resource::Collection(kind), &other).is_err());
        }
    }

    #[test]
    fn test_patient_cannot_write_clinician_authored_data() {
        let patient = principal(Role::Patient);
        let own = patient.id;

        for kind in CLINICAL {
            for action in [Action::Create, Action::Update, Action::Delete] {
                assert!(authorize(&patient, action, Resource::Collection(kind), &own).is_err());
            }
        }

        let denied = authorize(
            &patient,
            Action::Create,
            Resource::Collection(SubResourceKind::Prescriptions),
            &own,
        )
        .unwrap_err();
        assert_eq!(denied.to_string(), "Only doctors can add prescriptions");
    }

    #[test]
    fn test_patient_manages_own_vitals() {
        let patient = principal(Role::Patient);
        let vitals = Resource::Collection(SubResourceKind::Vitals);

        assert!(authorize(&patient, Action::Create, vitals, &patient.id).is_ok());
        assert!(authorize(&patient, Action::Delete, vitals, &patient.id).is_ok());
        assert!(authorize(&patient, Action::Create, vitals, &Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_require_doctor() {
        assert!(require_doctor(
            &principal(Role::Doctor),
            Action::Read,
            Resource::PatientDirectory
        )
        .is_ok());

        let denied = require_doctor(
            &principal(Role::Patient),
            Action::Update,
            Resource::DoctorProfile,
        )
        .unwrap_err();
        assert_eq!(denied.to_string(), "Only doctors can update doctor profiles");
    }

    #[test]
    fn test_vitals_require_full_reading() {
        let reading = full_vitals().into_reading().unwrap();
        assert_eq!(reading.systolic, 120.0);
        assert_eq!(reading.height, 172.0);

        let partial = VitalsInput {
            weight: None,
            height: None,
            ..full_vitals()
        };
        assert_eq!(
            partial.into_reading().unwrap_err(),
            VitalsError::Incomplete(vec!["weight", "height"])
        );

        let three_of_four = VitalsInput {
            sugar: None,
            ..full_vitals()
        };
        assert!(three_of_four.coherent().is_err());

        assert_eq!(VitalsInput::default().coherent().unwrap(), None);
    }

    #[test]
    fn test_vitals_reject_non_positive_values() {
        let negative = VitalsInput {
            diastolic: Some(-80.0),
            ..full_vitals()
        };
        assert_eq!(
            negative.into_reading().unwrap_err(),
            VitalsError::OutOfRange("diastolic")
        );

        let bad_pulse = VitalsInput {
            heart_rate: Some(f64::NAN),
            ..full_vitals()
        };
        assert_eq!(
            bad_pulse.into_reading().unwrap_err(),
            VitalsError::OutOfRange("heartRate")
        );
    }

    #[test]
    fn test_display_form_vitals_are_accepted() {
        let request: ProfileUpdateRequest = serde_json::from_value(serde_json::json!({
            "bloodPressure": "120/80 mmHg",
            "bloodSugar": 90,
            "heartRate": 72,
            "weight": 70,
            "height": 172
        }))
        .unwrap();

        let patch = filter_profile_update(Role::Patient, request).unwrap();
        let reading = patch.vitals.unwrap();
        assert_eq!(reading.systolic, 120.0);
        assert_eq!(reading.diastolic, 80.0);
        assert_eq!(reading.sugar, 90.0);
        assert_eq!(reading.heart_rate, Some(72.0));
    }

    #[test]
    fn test_blood_pressure_format() {
        assert_eq!(parse_blood_pressure("118/76").unwrap(), (118.0, 76.0));
        assert_eq!(parse_blood_pressure("130/85 mmHg").unwrap(), (130.0, 85.0));
        assert_eq!(parse_blood_pressure(" 130 / 85 mmHg").unwrap(), (130.0, 85.0));

        for bad in ["", "120", "high/low", "/80", "120/"] {
            assert_eq!(
                parse_blood_pressure(bad).unwrap_err(),
                VitalsError::BloodPressureFormat,
                "{:?}",
                bad
            );
        }

        let garbled = VitalsInput {
            blood_pressure: Some("one-twenty".to_string()),
            ..full_vitals()
        };
        assert_eq!(
            garbled.into_reading().unwrap_err().to_string(),
            "Invalid blood pressure format"
        );
    }

    #[test]
    fn test_doctor_update_keeps_allow_listed_fields() {
        let request: ProfileUpdateRequest = serde_json::from_value(serde_json::json!({
            "firstName": "Ada",
            "lastName": "  ",
            "status": "Inactive",
            "currentDiagnosis": "Asthma",
            "lastVisit": "2024-03-01",
            "email": "hijack@example.com",
            "role": "doctor",
            "passwordHash": "x"
        }))
        .unwrap();

        let patch = filter_profile_update(Role::Doctor, request).unwrap();
        assert_eq!(patch.first_name.as_deref(), Some("Ada"));
        assert!(patch.last_name.is_none());
        assert_eq!(patch.status, Some(PatientStatus::Inactive));
        assert_eq!(patch.current_diagnosis.as_deref(), Some("Asthma"));
        assert_eq!(patch.last_visit, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!(patch.vitals.is_none());
    }

    #[test]
    fn test_patient_update_only_applies_vitals() {
        let request: ProfileUpdateRequest = serde_json::from_value(serde_json::json!({
            "firstName": "Mallory",
            "currentDiagnosis": "Self-diagnosed",
            "systolic": 120,
            "diastolic": 80,
            "sugar": 90,
            "weight": 70,
            "height": 172
        }))
        .unwrap();

        let patch = filter_profile_update(Role::Patient, request).unwrap();
        assert!(patch.first_name.is_none());
        assert!(patch.current_diagnosis.is_none());
        assert_eq!(patch.vitals, Some(full_vitals().into_reading().unwrap()));

        let nothing = filter_profile_update(Role::Patient, ProfileUpdateRequest::default()).unwrap();
        assert!(nothing.is_empty());
    }

    #[test]
    fn test_partial_vitals_reject_whole_update() {
        let request: ProfileUpdateRequest = serde_json::from_value(serde_json::json!({
            "firstName": "Ada",
            "systolic": 120,
            "diastolic": 80,
            "sugar": 90
        }))
        .unwrap();

        assert!(matches!(
            filter_profile_update(Role::Doctor, request),
            Err(VitalsError::Incomplete(_))
        ));
    }
}
