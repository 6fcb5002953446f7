//! Directory Models
//! Mission: Doctor and patient records with their owned clinical sub-resources

use crate::auth::models::Role;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Fields shared by every identity, whatever the role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityCore {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentityCore {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Role-specific payload. The role of an identity is the variant it carries.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleProfile {
    Doctor(DoctorProfile),
    Patient(PatientProfile),
}

impl RoleProfile {
    pub fn empty(role: Role) -> Self {
        match role {
            Role::Doctor => RoleProfile::Doctor(DoctorProfile::default()),
            Role::Patient => RoleProfile::Patient(PatientProfile::default()),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            RoleProfile::Doctor(_) => Role::Doctor,
            RoleProfile::Patient(_) => Role::Patient,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Identity {
    pub core: IdentityCore,
    pub profile: RoleProfile,
}

impl Identity {
    pub fn role(&self) -> Role {
        self.profile.role()
    }
}

/// Input for creating an identity; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    pub specialty: Option<String>, // e.g. Cardiologist
    #[serde(default)]
    pub qualifications: Vec<String>, // e.g. ["MD", "FACC"]
    #[serde(default)]
    pub experience: u32, // years
    pub avatar: Option<String>,
}

impl DoctorProfile {
    pub fn apply(&mut self, patch: DoctorPatch) {
        if let Some(specialty) = patch.specialty {
            self.specialty = Some(specialty);
        }
        if let Some(qualifications) = patch.qualifications {
            self.qualifications = qualifications;
        }
        if let Some(experience) = patch.experience {
            self.experience = experience;
        }
        if let Some(avatar) = patch.avatar {
            self.avatar = Some(avatar);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatientStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentInfo {
    #[serde(default)]
    pub current_diagnosis: String,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub blood_group: Option<String>,
    pub primary_contact: Option<String>,
    pub emergency_contact: Option<String>,
    pub last_visit: Option<NaiveDate>,
    #[serde(default)]
    pub status: PatientStatus,

    // Current vitals, refreshed from the latest reading
    pub blood_pressure: Option<String>, // "120/80 mmHg"
    pub heart_rate: Option<f64>,
    pub blood_sugar: Option<f64>, // mg/dL
    pub weight: Option<f64>,      // kg
    pub height: Option<f64>,      // cm

    #[serde(default)]
    pub treatment_info: TreatmentInfo,
}

impl PatientProfile {
    /// Apply an already-filtered patch. Setting a diagnosis stamps
    /// `treatment_info.last_updated`.
    pub fn apply(&mut self, patch: &PatientPatch, now: DateTime<Utc>) {
        if let Some(age) = patch.age {
            self.age = Some(age);
        }
        if let Some(gender) = patch.gender {
            self.gender = Some(gender);
        }
        if let Some(blood_group) = &patch.blood_group {
            self.blood_group = Some(blood_group.clone());
        }
        if let Some(primary_contact) = &patch.primary_contact {
            self.primary_contact = Some(primary_contact.clone());
        }
        if let Some(emergency_contact) = &patch.emergency_contact {
            self.emergency_contact = Some(emergency_contact.clone());
        }
        if let Some(last_visit) = patch.last_visit {
            self.last_visit = Some(last_visit);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(diagnosis) = &patch.current_diagnosis {
            self.treatment_info.current_diagnosis = diagnosis.clone();
            self.treatment_info.last_updated = Some(now);
        }
        if let Some(reading) = &patch.vitals {
            self.record_vitals(reading);
        }
    }

    pub fn record_vitals(&mut self, reading: &VitalsReading) {
        self.blood_pressure = Some(format!(
            "{}/{} mmHg",
            reading.systolic, reading.diastolic
        ));
        self.blood_sugar = Some(reading.sugar);
        self.weight = Some(reading.weight);
        self.height = Some(reading.height);
        if let Some(heart_rate) = reading.heart_rate {
            self.heart_rate = Some(heart_rate);
        }
    }
}

/// Profile changes that survived field filtering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub blood_group: Option<String>,
    pub primary_contact: Option<String>,
    pub emergency_contact: Option<String>,
    pub last_visit: Option<NaiveDate>,
    pub status: Option<PatientStatus>,
    pub current_diagnosis: Option<String>,
    pub vitals: Option<VitalsReading>,
}

impl PatientPatch {
    pub fn is_empty(&self) -> bool {
        *self == PatientPatch::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DoctorPatch {
    pub specialty: Option<String>,
    pub qualifications: Option<Vec<String>>,
    pub experience: Option<u32>,
    pub avatar: Option<String>,
}

/// A complete, coherent vitals reading
#[derive(Debug, Clone, PartialEq)]
pub struct VitalsReading {
    pub systolic: f64,
    pub diastolic: f64,
    pub sugar: f64,
    pub weight: f64,
    pub height: f64,
    pub heart_rate: Option<f64>,
}

impl VitalsReading {
    pub fn into_entry(self, now: DateTime<Utc>) -> VitalsEntry {
        VitalsEntry {
            id: Uuid::new_v4(),
            date: now,
            systolic: self.systolic,
            diastolic: self.diastolic,
            sugar: self.sugar,
            weight: self.weight,
            height: self.height,
            heart_rate: self.heart_rate,
        }
    }
}

/// Kinds of patient-owned sub-resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubResourceKind {
    Vitals,
    Prescriptions,
    Histories,
    Allergies,
}

impl SubResourceKind {
    /// Storage discriminator and JSON collection key
    pub fn as_str(&self) -> &'static str {
        match self {
            SubResourceKind::Vitals => "vitals",
            SubResourceKind::Prescriptions => "prescriptions",
            SubResourceKind::Histories => "histories",
            SubResourceKind::Allergies => "allergies",
        }
    }

    /// JSON key for a single created entry
    pub fn entry_key(&self) -> &'static str {
        match self {
            SubResourceKind::Vitals => "vitals",
            SubResourceKind::Prescriptions => "prescription",
            SubResourceKind::Histories => "history",
            SubResourceKind::Allergies => "allergy",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubResourceKind::Vitals => "Vitals",
            SubResourceKind::Prescriptions => "Prescription",
            SubResourceKind::Histories => "Medical history",
            SubResourceKind::Allergies => "Allergy",
        }
    }

    /// Written by clinicians only
    pub fn is_clinician_authored(&self) -> bool {
        !matches!(self, SubResourceKind::Vitals)
    }
}

/// An entry owned by exactly one patient, keyed by an id unique within that patient.
pub trait SubResource: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: SubResourceKind;

    fn id(&self) -> Uuid;
    fn recorded_at(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsEntry {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub systolic: f64,
    pub diastolic: f64,
    pub sugar: f64,
    pub weight: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
}

impl SubResource for VitalsEntry {
    const KIND: SubResourceKind = SubResourceKind::Vitals;

    fn id(&self) -> Uuid {
        self.id
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.date
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timing {
    #[serde(rename = "Before meals")]
    BeforeMeals,
    #[serde(rename = "After meals")]
    AfterMeals,
    #[serde(rename = "With meals")]
    WithMeals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Uuid,
    pub medicine: String,
    pub dosage: String,
    pub timing: Timing,
    pub frequency: u32,
    pub instructions: Option<String>,
    pub times: Vec<String>, // "HH:MM"
    pub created_at: DateTime<Utc>,
}

impl SubResource for Prescription {
    const KIND: SubResourceKind = SubResourceKind::Prescriptions;

    fn id(&self) -> Uuid {
        self.id
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub condition: String,
    pub year: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SubResource for HistoryEntry {
    const KIND: SubResourceKind = SubResourceKind::Histories;

    fn id(&self) -> Uuid {
        self.id
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allergy {
    pub id: Uuid,
    pub name: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

impl SubResource for Allergy {
    const KIND: SubResourceKind = SubResourceKind::Allergies;

    fn id(&self) -> Uuid {
        self.id
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Full patient view: profile plus every owned collection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    #[serde(flatten)]
    pub core: IdentityCore,
    pub role: Role,
    #[serde(flatten)]
    pub profile: PatientProfile,
    pub vitals: Vec<VitalsEntry>,
    pub prescriptions: Vec<Prescription>,
    pub histories: Vec<HistoryEntry>,
    pub allergies: Vec<Allergy>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRecord {
    #[serde(flatten)]
    pub core: IdentityCore,
    pub role: Role,
    #[serde(flatten)]
    pub profile: DoctorProfile,
}

/// Row returned by patient search
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub last_visit: Option<NaiveDate>,
    pub last_updated: Option<DateTime<Utc>>,
    pub status: PatientStatus,
}
