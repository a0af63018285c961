use chrono::Utc;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::PostgrestClient;
use shared_models::error::AppError;

use crate::models::{CreatePatientRequest, Patient, UpdatePatientRequest};

/// Owner-scoped patient store. Every read and write carries an
/// `owner_user_id` filter, so a foreign patient id behaves exactly like a
/// missing one.
pub struct PatientService {
    store: PostgrestClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        owner_user_id: Uuid,
    ) -> Result<Patient, AppError> {
        debug!("Creating patient record for user: {}", owner_user_id);

        let patient_data = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "date_of_birth": request.date_of_birth.format("%Y-%m-%d").to_string(),
            "gender": request.gender,
            "address": request.address,
            "phone_number": request.phone_number,
            "medical_history": request.medical_history,
            "owner_user_id": owner_user_id,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Patient> = self.store.insert("/rest/v1/patients", patient_data).await?;

        let patient = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Failed to create patient".to_string()))?;

        debug!("Patient created successfully with ID: {}", patient.id);
        Ok(patient)
    }

    pub async fn list_patients(&self, owner_user_id: Uuid) -> Result<Vec<Patient>, AppError> {
        debug!("Listing patients for user: {}", owner_user_id);

        let path = format!(
            "/rest/v1/patients?owner_user_id=eq.{}&order=created_at.desc",
            owner_user_id
        );
        self.store.select(&path).await
    }

    pub async fn get_patient(
        &self,
        patient_id: Uuid,
        owner_user_id: Uuid,
    ) -> Result<Patient, AppError> {
        debug!("Fetching patient {} for user {}", patient_id, owner_user_id);

        let path = format!(
            "/rest/v1/patients?id=eq.{}&owner_user_id=eq.{}",
            patient_id, owner_user_id
        );
        let result: Vec<Patient> = self.store.select(&path).await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        owner_user_id: Uuid,
    ) -> Result<Patient, AppError> {
        debug!("Updating patient {} for user {}", patient_id, owner_user_id);

        let update_data = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "date_of_birth": request.date_of_birth.format("%Y-%m-%d").to_string(),
            "gender": request.gender,
            "address": request.address,
            "phone_number": request.phone_number,
            "medical_history": request.medical_history,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!(
            "/rest/v1/patients?id=eq.{}&owner_user_id=eq.{}",
            patient_id, owner_user_id
        );
        let result: Vec<Patient> = self.store.update(&path, update_data).await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))
    }

    pub async fn delete_patient(
        &self,
        patient_id: Uuid,
        owner_user_id: Uuid,
    ) -> Result<(), AppError> {
        debug!("Deleting patient {} for user {}", patient_id, owner_user_id);

        let path = format!(
            "/rest/v1/patients?id=eq.{}&owner_user_id=eq.{}",
            patient_id, owner_user_id
        );
        let deleted: Vec<Patient> = self.store.delete(&path).await?;

        if deleted.is_empty() {
            return Err(AppError::NotFound("Patient not found".to_string()));
        }

        Ok(())
    }
}
