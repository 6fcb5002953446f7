//! Identity Storage
//! Mission: Persist doctors, patients and their owned sub-resources in SQLite

use crate::auth::models::Role;
use crate::directory::models::{
    DoctorPatch, DoctorProfile, DoctorRecord, Identity, IdentityCore, NewIdentity, PatientPatch,
    PatientProfile, PatientRecord, PatientSummary, RoleProfile, SubResource, VitalsEntry,
    VitalsReading,
};
use anyhow::{anyhow, Context};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

/// Directory errors
#[derive(Debug)]
pub enum DirectoryError {
    DuplicateEmail,
    Storage(anyhow::Error),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::DuplicateEmail => write!(f, "Email is already registered"),
            DirectoryError::Storage(e) => write!(f, "Storage failure: {:#}", e),
        }
    }
}

impl std::error::Error for DirectoryError {}

impl From<rusqlite::Error> for DirectoryError {
    fn from(e: rusqlite::Error) -> Self {
        DirectoryError::Storage(e.into())
    }
}

impl From<serde_json::Error> for DirectoryError {
    fn from(e: serde_json::Error) -> Self {
        DirectoryError::Storage(e.into())
    }
}

impl From<anyhow::Error> for DirectoryError {
    fn from(e: anyhow::Error) -> Self {
        DirectoryError::Storage(e)
    }
}

pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// Result of a remove-by-id on a patient's sub-resource list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    PatientMissing,
    EntryMissing,
}

/// Identity directory with SQLite backend
pub struct Directory {
    conn: Mutex<Connection>,
}

impl Directory {
    /// Open (or create) the directory database and initialize the schema
    pub fn open(db_path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open directory database at {}", db_path))?;
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Cheap liveness check for the health endpoint
    pub fn ping(&self) -> bool {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    /// Create a new identity. Email uniqueness is enforced by the schema.
    pub fn create_identity(&self, new: NewIdentity) -> DirectoryResult<Identity> {
        let now = Utc::now();
        let identity = Identity {
            core: IdentityCore {
                id: Uuid::new_v4(),
                first_name: new.first_name,
                last_name: new.last_name,
                email: normalize_email(&new.email),
                password_hash: new.password_hash,
                created_at: now,
                updated_at: now,
            },
            profile: RoleProfile::empty(new.role),
        };

        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO identities
                (id, role, first_name, last_name, email, password_hash, profile, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                identity.core.id.to_string(),
                identity.role().as_str(),
                identity.core.first_name,
                identity.core.last_name,
                identity.core.email,
                identity.core.password_hash,
                profile_json(&identity.profile)?,
                ts(&identity.core.created_at),
                ts(&identity.core.updated_at),
            ],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(DirectoryError::DuplicateEmail);
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            "✅ Created {} {} ({})",
            identity.role().as_str(),
            identity.core.id,
            identity.core.email
        );

        Ok(identity)
    }

    /// Get identity by email (the login handle)
    pub fn find_by_email(&self, email: &str) -> DirectoryResult<Option<Identity>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM identities WHERE email = ?1",
            IDENTITY_COLUMNS
        ))?;

        let row = match stmt.query_row(params![normalize_email(email)], IdentityRow::from_row) {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        row.into_identity().map(Some)
    }

    /// Patient profile with every owned collection
    pub fn get_patient(&self, id: &Uuid) -> DirectoryResult<Option<PatientRecord>> {
        let conn = self.conn.lock();
        load_patient_record(&conn, id)
    }

    pub fn get_doctor(&self, id: &Uuid) -> DirectoryResult<Option<DoctorRecord>> {
        let conn = self.conn.lock();
        let Some(identity) = load_identity(&conn, id)? else {
            return Ok(None);
        };
        match identity.profile {
            RoleProfile::Doctor(profile) => Ok(Some(DoctorRecord {
                core: identity.core,
                role: Role::Doctor,
                profile,
            })),
            RoleProfile::Patient(_) => Ok(None),
        }
    }

    /// Apply a filtered profile patch. A vitals reading in the patch is
    /// appended in the same transaction.
    pub fn update_patient(
        &self,
        id: &Uuid,
        patch: &PatientPatch,
    ) -> DirectoryResult<Option<PatientRecord>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let Some(identity) = load_identity(&tx, id)? else {
            return Ok(None);
        };
        let RoleProfile::Patient(mut profile) = identity.profile else {
            return Ok(None);
        };
        let mut core = identity.core;

        let now = Utc::now();
        if let Some(first_name) = &patch.first_name {
            core.first_name = first_name.clone();
        }
        if let Some(last_name) = &patch.last_name {
            core.last_name = last_name.clone();
        }
        profile.apply(patch, now);

        tx.execute(
            "UPDATE identities SET first_name = ?2, last_name = ?3, profile = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                id.to_string(),
                core.first_name,
                core.last_name,
                serde_json::to_string(&profile)?,
                ts(&now),
            ],
        )?;

        if let Some(reading) = &patch.vitals {
            insert_entry(&tx, id, &reading.clone().into_entry(now))?;
        }

        tx.commit()?;
        debug!("Updated patient profile {}", id);

        load_patient_record(&conn, id)
    }

    pub fn update_doctor(
        &self,
        id: &Uuid,
        patch: DoctorPatch,
    ) -> DirectoryResult<Option<DoctorRecord>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let Some(identity) = load_identity(&tx, id)? else {
            return Ok(None);
        };
        let RoleProfile::Doctor(mut profile) = identity.profile else {
            return Ok(None);
        };
        profile.apply(patch);

        let mut core = identity.core;
        core.updated_at = Utc::now();
        tx.execute(
            "UPDATE identities SET profile = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                id.to_string(),
                serde_json::to_string(&profile)?,
                ts(&core.updated_at)
            ],
        )?;
        tx.commit()?;

        Ok(Some(DoctorRecord {
            core,
            role: Role::Doctor,
            profile,
        }))
    }

    /// Case-insensitive name substring search, or exact id match
    pub fn search_patients(&self, query: &str) -> DirectoryResult<Vec<PatientSummary>> {
        let query = query.trim();
        let pattern = format!("%{}%", escape_like(query));
        let exact_id = Uuid::parse_str(query)
            .map(|id| id.to_string())
            .unwrap_or_default();

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM identities
             WHERE role = 'patient'
               AND (first_name LIKE ?1 ESCAPE '\\' OR last_name LIKE ?1 ESCAPE '\\' OR id = ?2)
             ORDER BY last_name, first_name",
            IDENTITY_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![pattern, exact_id], IdentityRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let identity = row.into_identity()?;
            if let RoleProfile::Patient(profile) = identity.profile {
                out.push(PatientSummary {
                    id: identity.core.id,
                    first_name: identity.core.first_name,
                    last_name: identity.core.last_name,
                    last_visit: profile.last_visit,
                    last_updated: profile.treatment_info.last_updated,
                    status: profile.status,
                });
            }
        }
        Ok(out)
    }

    /// Atomically append an entry to a patient's collection.
    /// Returns false when the patient does not exist.
    pub fn append<T: SubResource>(&self, patient_id: &Uuid, entry: &T) -> DirectoryResult<bool> {
        let conn = self.conn.lock();
        let appended = insert_entry(&conn, patient_id, entry)?;
        if appended {
            debug!(
                "Appended {} {} to patient {}",
                T::KIND.as_str(),
                entry.id(),
                patient_id
            );
        }
        Ok(appended)
    }

    /// Append a vitals reading and refresh the patient's current vitals together
    pub fn record_vitals(
        &self,
        patient_id: &Uuid,
        reading: VitalsReading,
    ) -> DirectoryResult<Option<VitalsEntry>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let Some(identity) = load_identity(&tx, patient_id)? else {
            return Ok(None);
        };
        let RoleProfile::Patient(mut profile) = identity.profile else {
            return Ok(None);
        };

        let now = Utc::now();
        profile.record_vitals(&reading);
        let entry = reading.into_entry(now);

        tx.execute(
            "UPDATE identities SET profile = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                patient_id.to_string(),
                serde_json::to_string(&profile)?,
                ts(&now)
            ],
        )?;
        insert_entry(&tx, patient_id, &entry)?;
        tx.commit()?;

        Ok(Some(entry))
    }

    /// Entries of one kind, oldest first. None when the patient does not exist.
    pub fn list<T: SubResource>(&self, patient_id: &Uuid) -> DirectoryResult<Option<Vec<T>>> {
        let conn = self.conn.lock();
        if !patient_exists(&conn, patient_id)? {
            return Ok(None);
        }
        list_entries(&conn, patient_id).map(Some)
    }

    /// Atomically remove an entry by id
    pub fn remove<T: SubResource>(
        &self,
        patient_id: &Uuid,
        entry_id: &Uuid,
    ) -> DirectoryResult<RemoveOutcome> {
        let conn = self.conn.lock();
        if !patient_exists(&conn, patient_id)? {
            return Ok(RemoveOutcome::PatientMissing);
        }

        let rows_affected = conn.execute(
            "DELETE FROM sub_resources WHERE patient_id = ?1 AND kind = ?2 AND id = ?3",
            params![
                patient_id.to_string(),
                T::KIND.as_str(),
                entry_id.to_string()
            ],
        )?;

        if rows_affected == 0 {
            return Ok(RemoveOutcome::EntryMissing);
        }

        info!(
            "🗑️  Removed {} {} from patient {}",
            T::KIND.as_str(),
            entry_id,
            patient_id
        );
        Ok(RemoveOutcome::Removed)
    }
}

const IDENTITY_COLUMNS: &str =
    "id, role, first_name, last_name, email, password_hash, profile, created_at, updated_at";

/// Initialize database schema
fn init_db(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .context("Failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS identities (
            id TEXT PRIMARY KEY,
            role TEXT NOT NULL CHECK (role IN ('doctor', 'patient')),
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            profile TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // Owned child collections, keyed by an id unique within the parent
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sub_resources (
            patient_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            id TEXT NOT NULL,
            body TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            PRIMARY KEY (patient_id, kind, id),
            FOREIGN KEY (patient_id) REFERENCES identities(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sub_resources_listing
         ON sub_resources(patient_id, kind, recorded_at)",
        [],
    )?;

    Ok(())
}

struct IdentityRow {
    id: String,
    role: String,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    profile: String,
    created_at: String,
    updated_at: String,
}

impl IdentityRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            role: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            email: row.get(4)?,
            password_hash: row.get(5)?,
            profile: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_identity(self) -> DirectoryResult<Identity> {
        let id = Uuid::parse_str(&self.id).context("Corrupt identity id")?;
        let role = Role::from_str(&self.role)
            .ok_or_else(|| anyhow!("Unknown role '{}' on identity {}", self.role, id))?;
        let profile = match role {
            Role::Doctor => {
                RoleProfile::Doctor(serde_json::from_str::<DoctorProfile>(&self.profile)?)
            }
            Role::Patient => {
                RoleProfile::Patient(serde_json::from_str::<PatientProfile>(&self.profile)?)
            }
        };

        Ok(Identity {
            core: IdentityCore {
                id,
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                password_hash: self.password_hash,
                created_at: parse_ts(&self.created_at)?,
                updated_at: parse_ts(&self.updated_at)?,
            },
            profile,
        })
    }
}

fn load_identity(conn: &Connection, id: &Uuid) -> DirectoryResult<Option<Identity>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM identities WHERE id = ?1", IDENTITY_COLUMNS),
            params![id.to_string()],
            IdentityRow::from_row,
        )
        .optional()?;

    row.map(IdentityRow::into_identity).transpose()
}

fn load_patient_record(conn: &Connection, id: &Uuid) -> DirectoryResult<Option<PatientRecord>> {
    let Some(identity) = load_identity(conn, id)? else {
        return Ok(None);
    };
    let RoleProfile::Patient(profile) = identity.profile else {
        return Ok(None);
    };

    Ok(Some(PatientRecord {
        core: identity.core,
        role: Role::Patient,
        profile,
        vitals: list_entries(conn, id)?,
        prescriptions: list_entries(conn, id)?,
        histories: list_entries(conn, id)?,
        allergies: list_entries(conn, id)?,
    }))
}

fn patient_exists(conn: &Connection, id: &Uuid) -> DirectoryResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM identities WHERE id = ?1 AND role = 'patient'",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Single-statement append guarded on the parent existing
fn insert_entry<T: SubResource>(
    conn: &Connection,
    patient_id: &Uuid,
    entry: &T,
) -> DirectoryResult<bool> {
    let rows_affected = conn.execute(
        "INSERT INTO sub_resources (patient_id, kind, id, body, recorded_at)
         SELECT ?1, ?2, ?3, ?4, ?5
         WHERE EXISTS (SELECT 1 FROM identities WHERE id = ?1 AND role = 'patient')",
        params![
            patient_id.to_string(),
            T::KIND.as_str(),
            entry.id().to_string(),
            serde_json::to_string(entry)?,
            ts(&entry.recorded_at()),
        ],
    )?;
    Ok(rows_affected == 1)
}

fn list_entries<T: SubResource>(conn: &Connection, patient_id: &Uuid) -> DirectoryResult<Vec<T>> {
    let mut stmt = conn.prepare(
        "SELECT body FROM sub_resources
         WHERE patient_id = ?1 AND kind = ?2
         ORDER BY recorded_at, rowid",
    )?;

    let bodies = stmt
        .query_map(params![patient_id.to_string(), T::KIND.as_str()], |row| {
            row.get::<_, String>(0)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    bodies
        .iter()
        .map(|body| serde_json::from_str::<T>(body).map_err(DirectoryError::from))
        .collect()
}

fn profile_json(profile: &RoleProfile) -> DirectoryResult<String> {
    let json = match profile {
        RoleProfile::Doctor(p) => serde_json::to_string(p)?,
        RoleProfile::Patient(p) => serde_json::to_string(p)?,
    };
    Ok(json)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// Fixed-width so lexical order matches time order
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Corrupt timestamp '{}'", s))?
        .with_timezone(&Utc))
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::models::{Allergy, HistoryEntry, Prescription, Severity, Timing};
    use tempfile::NamedTempFile;

    fn create_test_directory() -> (Directory, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let directory = Directory::open(db_path).unwrap();
        (directory, temp_file)
    }

    fn new_identity(email: &str, role: Role) -> NewIdentity {
        NewIdentity {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role,
        }
    }

    fn reading() -> VitalsReading {
        VitalsReading {
            systolic: 118.0,
            diastolic: 76.0,
            sugar: 101.0,
            weight: 64.5,
            height: 168.0,
            heart_rate: Some(72.0),
        }
    }

    fn allergy(name: &str) -> Allergy {
        Allergy {
            id: Uuid::new_v4(),
            name: name.to_string(),
            severity: Severity::Medium,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_and_find_by_email() {
        let (directory, _temp) = create_test_directory();

        let created = directory
            .create_identity(new_identity("Jane@Example.com ", Role::Patient))
            .unwrap();
        assert_eq!(created.core.email, "jane@example.com");
        assert_eq!(created.role(), Role::Patient);

        let found = directory.find_by_email("JANE@example.com").unwrap().unwrap();
        assert_eq!(found.core.id, created.core.id);
        assert_eq!(found.role(), Role::Patient);

        assert!(directory.find_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected_across_roles() {
        let (directory, _temp) = create_test_directory();

        directory
            .create_identity(new_identity("dup@example.com", Role::Doctor))
            .unwrap();
        let err = directory
            .create_identity(new_identity("dup@example.com", Role::Patient))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::DuplicateEmail));
    }

    #[test]
    fn test_patient_and_doctor_lookups_are_role_scoped() {
        let (directory, _temp) = create_test_directory();

        let doctor = directory
            .create_identity(new_identity("doc@example.com", Role::Doctor))
            .unwrap();
        let patient = directory
            .create_identity(new_identity("pat@example.com", Role::Patient))
            .unwrap();

        assert!(directory.get_patient(&patient.core.id).unwrap().is_some());
        assert!(directory.get_patient(&doctor.core.id).unwrap().is_none());
        assert!(directory.get_doctor(&doctor.core.id).unwrap().is_some());
        assert!(directory.get_doctor(&patient.core.id).unwrap().is_none());
    }

    #[test]
    fn test_append_list_remove_round() {
        let (directory, _temp) = create_test_directory();
        let patient = directory
            .create_identity(new_identity("pat@example.com", Role::Patient))
            .unwrap();
        let id = patient.core.id;

        let first = allergy("Penicillin");
        let second = allergy("Peanuts");
        assert!(directory.append(&id, &first).unwrap());
        assert!(directory.append(&id, &second).unwrap());

        let listed: Vec<Allergy> = directory.list(&id).unwrap().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Penicillin");

        // Kinds do not bleed into each other
        let histories: Vec<HistoryEntry> = directory.list(&id).unwrap().unwrap();
        assert!(histories.is_empty());

        assert_eq!(
            directory.remove::<Allergy>(&id, &first.id).unwrap(),
            RemoveOutcome::Removed
        );
        assert_eq!(
            directory.remove::<Allergy>(&id, &first.id).unwrap(),
            RemoveOutcome::EntryMissing
        );
        // Right id, wrong kind
        assert_eq!(
            directory.remove::<Prescription>(&id, &second.id).unwrap(),
            RemoveOutcome::EntryMissing
        );

        let listed: Vec<Allergy> = directory.list(&id).unwrap().unwrap();
        assert_eq!(listed, vec![second]);
    }

    #[test]
    fn test_append_to_missing_patient_is_noop() {
        let (directory, _temp) = create_test_directory();
        let doctor = directory
            .create_identity(new_identity("doc@example.com", Role::Doctor))
            .unwrap();

        let prescription = Prescription {
            id: Uuid::new_v4(),
            medicine: "Metformin".to_string(),
            dosage: "500mg".to_string(),
            timing: Timing::WithMeals,
            frequency: 2,
            instructions: None,
            times: vec!["08:00".to_string(), "20:00".to_string()],
            created_at: Utc::now(),
        };

        assert!(!directory.append(&Uuid::new_v4(), &prescription).unwrap());
        // Doctors do not own clinical collections
        assert!(!directory.append(&doctor.core.id, &prescription).unwrap());
        assert!(directory
            .list::<Prescription>(&doctor.core.id)
            .unwrap()
            .is_none());
        assert_eq!(
            directory
                .remove::<Prescription>(&Uuid::new_v4(), &prescription.id)
                .unwrap(),
            RemoveOutcome::PatientMissing
        );
    }

    #[test]
    fn test_record_vitals_updates_current_values() {
        let (directory, _temp) = create_test_directory();
        let patient = directory
            .create_identity(new_identity("pat@example.com", Role::Patient))
            .unwrap();
        let id = patient.core.id;

        let entry = directory.record_vitals(&id, reading()).unwrap().unwrap();
        assert_eq!(entry.systolic, 118.0);

        let record = directory.get_patient(&id).unwrap().unwrap();
        assert_eq!(record.vitals, vec![entry]);
        assert_eq!(record.profile.blood_pressure.as_deref(), Some("118/76 mmHg"));
        assert_eq!(record.profile.heart_rate, Some(72.0));

        assert!(directory
            .record_vitals(&Uuid::new_v4(), reading())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_update_patient_applies_patch() {
        let (directory, _temp) = create_test_directory();
        let patient = directory
            .create_identity(new_identity("pat@example.com", Role::Patient))
            .unwrap();
        let id = patient.core.id;

        let patch = PatientPatch {
            first_name: Some("Renamed".to_string()),
            current_diagnosis: Some("Type 2 diabetes".to_string()),
            vitals: Some(reading()),
            ..Default::default()
        };
        let record = directory.update_patient(&id, &patch).unwrap().unwrap();

        assert_eq!(record.core.first_name, "Renamed");
        assert_eq!(record.core.last_name, "User");
        assert_eq!(
            record.profile.treatment_info.current_diagnosis,
            "Type 2 diabetes"
        );
        assert!(record.profile.treatment_info.last_updated.is_some());
        assert_eq!(record.vitals.len(), 1);

        assert!(directory
            .update_patient(&Uuid::new_v4(), &patch)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_update_doctor_profile() {
        let (directory, _temp) = create_test_directory();
        let doctor = directory
            .create_identity(new_identity("doc@example.com", Role::Doctor))
            .unwrap();

        let record = directory
            .update_doctor(
                &doctor.core.id,
                DoctorPatch {
                    specialty: Some("Cardiologist".to_string()),
                    qualifications: Some(vec!["MD".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(record.profile.specialty.as_deref(), Some("Cardiologist"));
        assert_eq!(record.profile.qualifications, vec!["MD".to_string()]);

        let reloaded = directory.get_doctor(&doctor.core.id).unwrap().unwrap();
        assert_eq!(reloaded.profile, record.profile);
    }

    #[test]
    fn test_search_patients() {
        let (directory, _temp) = create_test_directory();
        let mut alice = new_identity("alice@example.com", Role::Patient);
        alice.first_name = "Alice".to_string();
        alice.last_name = "Smith".to_string();
        let alice = directory.create_identity(alice).unwrap();

        let mut bob = new_identity("bob@example.com", Role::Patient);
        bob.first_name = "Bob".to_string();
        bob.last_name = "Jones".to_string();
        directory.create_identity(bob).unwrap();

        let mut doctor = new_identity("smithdoc@example.com", Role::Doctor);
        doctor.last_name = "Smithson".to_string();
        directory.create_identity(doctor).unwrap();

        let hits = directory.search_patients("smi").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].first_name, "Alice");

        let by_id = directory
            .search_patients(&alice.core.id.to_string())
            .unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].id, alice.core.id);

        // LIKE wildcards in the query are literal
        assert!(directory.search_patients("%").unwrap().is_empty());
    }

    #[test]
    fn test_ping() {
        let (directory, _temp) = create_test_directory();
        assert!(directory.ping());
    }
}
