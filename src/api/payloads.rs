//! Sub-resource Request Payloads
//! Mission: Validate submitted entries before anything touches storage

use crate::directory::models::{
    Allergy, HistoryEntry, Prescription, Severity, SubResource, Timing,
};
use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

/// A submitted entry that becomes a stored sub-resource once validated
pub trait NewEntry: DeserializeOwned + Send + 'static {
    type Entry: SubResource;

    fn into_entry(self, now: DateTime<Utc>) -> Result<Self::Entry, ApiError>;
}

#[derive(Debug, Deserialize)]
pub struct NewPrescription {
    #[serde(default)]
    pub medicine: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub timing: String,
    pub frequency: Option<u32>,
    pub instructions: Option<String>,
    #[serde(default)]
    pub times: Vec<String>,
}

impl NewEntry for NewPrescription {
    type Entry = Prescription;

    fn into_entry(self, now: DateTime<Utc>) -> Result<Prescription, ApiError> {
        let medicine = self.medicine.trim();
        let dosage = self.dosage.trim();
        let frequency = self.frequency.unwrap_or(0);

        if medicine.is_empty() || dosage.is_empty() || frequency == 0 || self.times.is_empty() {
            return Err(ApiError::validation(
                "Please provide all required fields, including at least one time.",
            ));
        }

        let timing = parse_timing(&self.timing).ok_or_else(|| {
            ApiError::validation("Timing must be one of: Before meals, After meals, With meals")
        })?;

        for time in &self.times {
            if !is_clock_time(time) {
                return Err(ApiError::validation(format!(
                    "Invalid time format: {}. Expected \"HH:MM\".",
                    time
                )));
            }
        }

        Ok(Prescription {
            id: Uuid::new_v4(),
            medicine: medicine.to_string(),
            dosage: dosage.to_string(),
            timing,
            frequency,
            instructions: self
                .instructions
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            times: self.times,
            created_at: now,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NewHistory {
    #[serde(default)]
    pub condition: String,
    pub year: Option<String>,
}

impl NewEntry for NewHistory {
    type Entry = HistoryEntry;

    fn into_entry(self, now: DateTime<Utc>) -> Result<HistoryEntry, ApiError> {
        let condition = self.condition.trim();
        if condition.is_empty() {
            return Err(ApiError::validation("Condition is required"));
        }

        Ok(HistoryEntry {
            id: Uuid::new_v4(),
            condition: condition.to_string(),
            year: self
                .year
                .map(|y| y.trim().to_string())
                .filter(|y| !y.is_empty()),
            created_at: now,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NewAllergy {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub severity: String,
}

impl NewEntry for NewAllergy {
    type Entry = Allergy;

    fn into_entry(self, now: DateTime<Utc>) -> Result<Allergy, ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("Allergy name is required"));
        }

        let severity = match self.severity.trim().to_lowercase().as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => {
                return Err(ApiError::validation(
                    "Severity must be one of: High, Medium, Low",
                ))
            }
        };

        Ok(Allergy {
            id: Uuid::new_v4(),
            name: name.to_string(),
            severity,
            created_at: now,
        })
    }
}

fn parse_timing(raw: &str) -> Option<Timing> {
    match raw.trim().to_lowercase().as_str() {
        "before meals" => Some(Timing::BeforeMeals),
        "after meals" => Some(Timing::AfterMeals),
        "with meals" => Some(Timing::WithMeals),
        _ => None,
    }
}

/// 24h "HH:MM"
fn is_clock_time(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    let digits = |a: u8, b: u8| -> Option<u32> {
        if a.is_ascii_digit() && b.is_ascii_digit() {
            Some(u32::from(a - b'0') * 10 + u32::from(b - b'0'))
        } else {
            None
        }
    };
    matches!(
        (digits(bytes[0], bytes[1]), digits(bytes[3], bytes[4])),
        (Some(h), Some(m)) if h < 24 && m < 60
    )
}
