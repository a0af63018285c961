use std::collections::HashMap;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::PostgrestClient;
use shared_models::error::AppError;

use crate::models::{
    AssignedDoctor, Assignment, AssignmentWithParties, CreateAssignmentRequest, DoctorSummary,
    PatientSummary,
};

/// Directory fields returned alongside an assignment in the per-patient view.
#[derive(Debug, serde::Deserialize)]
struct DoctorDirectoryRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    specialization: String,
    email: String,
    phone_number: String,
}

pub struct AssignmentService {
    store: PostgrestClient,
}

impl AssignmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
        }
    }

    /// Ownership gate: the caller must own the referenced patient. Absence
    /// and foreign ownership are deliberately the same error.
    async fn require_owned_patient(
        &self,
        patient_id: Uuid,
        owner_user_id: Uuid,
    ) -> Result<(), AppError> {
        let path = format!(
            "/rest/v1/patients?id=eq.{}&owner_user_id=eq.{}&select=id",
            patient_id, owner_user_id
        );
        let rows: Vec<Value> = self.store.select(&path).await?;

        if rows.is_empty() {
            return Err(AppError::NotFound(
                "Patient not found or you do not have permission".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn assign_doctor(
        &self,
        request: CreateAssignmentRequest,
        owner_user_id: Uuid,
    ) -> Result<Assignment, AppError> {
        debug!(
            "Assigning doctor {} to patient {} for user {}",
            request.doctor_id, request.patient_id, owner_user_id
        );

        self.require_owned_patient(request.patient_id, owner_user_id)
            .await?;

        let doctor_path = format!("/rest/v1/doctors?id=eq.{}&select=id", request.doctor_id);
        let doctors: Vec<Value> = self.store.select(&doctor_path).await?;
        if doctors.is_empty() {
            return Err(AppError::NotFound("Doctor not found".to_string()));
        }

        // At most one assignment per (patient, doctor) pair. The storage
        // schema backs this with a unique constraint; this check exists to
        // produce the friendly error.
        let existing_path = format!(
            "/rest/v1/patient_doctor?patient_id=eq.{}&doctor_id=eq.{}&select=id",
            request.patient_id, request.doctor_id
        );
        let existing: Vec<Value> = self.store.select(&existing_path).await?;
        if !existing.is_empty() {
            return Err(AppError::Conflict(
                "Doctor is already assigned to this patient".to_string(),
            ));
        }

        let assignment_data = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "notes": request.notes,
            "assignment_date": Utc::now().date_naive().format("%Y-%m-%d").to_string(),
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Assignment> = self
            .store
            .insert("/rest/v1/patient_doctor", assignment_data)
            .await?;

        let assignment = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Failed to create assignment".to_string()))?;

        debug!("Assignment created successfully with ID: {}", assignment.id);
        Ok(assignment)
    }

    /// All assignments whose patient belongs to the caller, joined with both
    /// parties' summaries. Owning no patients short-circuits to an empty
    /// list without touching the assignment table.
    pub async fn list_assignments(
        &self,
        owner_user_id: Uuid,
    ) -> Result<Vec<AssignmentWithParties>, AppError> {
        debug!("Listing assignments for user: {}", owner_user_id);

        let patients_path = format!(
            "/rest/v1/patients?owner_user_id=eq.{}&select=id,first_name,last_name",
            owner_user_id
        );
        let patients: Vec<PatientSummary> = self.store.select(&patients_path).await?;

        if patients.is_empty() {
            return Ok(vec![]);
        }

        let patient_ids: Vec<String> = patients.iter().map(|p| p.id.to_string()).collect();
        let assignments_path = format!(
            "/rest/v1/patient_doctor?patient_id=in.({})",
            patient_ids.join(",")
        );
        let assignments: Vec<Assignment> = self.store.select(&assignments_path).await?;

        if assignments.is_empty() {
            return Ok(vec![]);
        }

        let doctor_ids: Vec<String> = assignments
            .iter()
            .map(|a| a.doctor_id.to_string())
            .collect();
        let doctors_path = format!(
            "/rest/v1/doctors?id=in.({})&select=id,first_name,last_name,specialization",
            doctor_ids.join(",")
        );
        let doctors: Vec<DoctorSummary> = self.store.select(&doctors_path).await?;

        let patients_by_id: HashMap<Uuid, PatientSummary> =
            patients.into_iter().map(|p| (p.id, p)).collect();
        let doctors_by_id: HashMap<Uuid, DoctorSummary> =
            doctors.into_iter().map(|d| (d.id, d)).collect();

        Ok(assignments
            .into_iter()
            .map(|assignment| AssignmentWithParties {
                patient: patients_by_id.get(&assignment.patient_id).cloned(),
                doctor: doctors_by_id.get(&assignment.doctor_id).cloned(),
                assignment,
            })
            .collect())
    }

    /// Doctors assigned to one patient, each merged with the assignment that
    /// links them. The caller must own the patient.
    pub async fn doctors_for_patient(
        &self,
        patient_id: Uuid,
        owner_user_id: Uuid,
    ) -> Result<Vec<AssignedDoctor>, AppError> {
        debug!(
            "Listing doctors for patient {} (user {})",
            patient_id, owner_user_id
        );

        self.require_owned_patient(patient_id, owner_user_id).await?;

        let assignments_path = format!("/rest/v1/patient_doctor?patient_id=eq.{}", patient_id);
        let assignments: Vec<Assignment> = self.store.select(&assignments_path).await?;

        if assignments.is_empty() {
            return Ok(vec![]);
        }

        let doctor_ids: Vec<String> = assignments
            .iter()
            .map(|a| a.doctor_id.to_string())
            .collect();
        let doctors_path = format!(
            "/rest/v1/doctors?id=in.({})&select=id,first_name,last_name,specialization,email,phone_number",
            doctor_ids.join(",")
        );
        let doctors: Vec<DoctorDirectoryRow> = self.store.select(&doctors_path).await?;

        let doctors_by_id: HashMap<Uuid, DoctorDirectoryRow> =
            doctors.into_iter().map(|d| (d.id, d)).collect();

        Ok(assignments
            .into_iter()
            .filter_map(|assignment| {
                doctors_by_id
                    .get(&assignment.doctor_id)
                    .map(|doctor| AssignedDoctor {
                        id: doctor.id,
                        first_name: doctor.first_name.clone(),
                        last_name: doctor.last_name.clone(),
                        specialization: doctor.specialization.clone(),
                        email: doctor.email.clone(),
                        phone_number: doctor.phone_number.clone(),
                        assignment_id: assignment.id,
                        assignment_date: assignment.assignment_date,
                        notes: assignment.notes,
                    })
            })
            .collect())
    }

    /// Removal is gated on the patient's owner, resolved through the
    /// referenced patient. A missing assignment is 404; an assignment whose
    /// patient belongs to someone else is 403. Assignment ids are not
    /// treated as sensitive, so the two cases stay distinguishable.
    pub async fn remove_assignment(
        &self,
        assignment_id: Uuid,
        owner_user_id: Uuid,
    ) -> Result<(), AppError> {
        debug!(
            "Removing assignment {} for user {}",
            assignment_id, owner_user_id
        );

        let path = format!("/rest/v1/patient_doctor?id=eq.{}", assignment_id);
        let result: Vec<Assignment> = self.store.select(&path).await?;
        let assignment = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))?;

        let owner_path = format!(
            "/rest/v1/patients?id=eq.{}&select=owner_user_id",
            assignment.patient_id
        );
        let owners: Vec<Value> = self.store.select(&owner_path).await?;
        let owns = owners
            .first()
            .and_then(|row| row.get("owner_user_id"))
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(|owner| owner == owner_user_id)
            .unwrap_or(false);

        if !owns {
            return Err(AppError::Forbidden(
                "You do not have permission to remove this assignment".to_string(),
            ));
        }

        let deleted: Vec<Assignment> = self.store.delete(&path).await?;
        if deleted.is_empty() {
            return Err(AppError::NotFound("Assignment not found".to_string()));
        }

        Ok(())
    }
}
