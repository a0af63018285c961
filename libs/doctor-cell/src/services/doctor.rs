use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;
use urlencoding::encode;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::PostgrestClient;
use shared_models::error::AppError;

use crate::models::{CreateDoctorRequest, Doctor, UpdateDoctorRequest};

pub struct DoctorService {
    store: PostgrestClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
        }
    }

    /// Duplicate pre-check shared by create and update. `exclude_id` skips
    /// the doctor's own row when re-checking a changed email or license.
    async fn has_duplicate(
        &self,
        license_number: &str,
        email: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let mut path = format!(
            "/rest/v1/doctors?or=(license_number.eq.{},email.eq.{})&select=id",
            encode(license_number),
            encode(email)
        );
        if let Some(id) = exclude_id {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let existing: Vec<Value> = self.store.select(&path).await?;
        Ok(!existing.is_empty())
    }

    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        owner_user_id: Uuid,
    ) -> Result<Doctor, AppError> {
        debug!("Creating doctor record for: {}", request.email);

        if self
            .has_duplicate(&request.license_number, &request.email, None)
            .await?
        {
            return Err(AppError::Conflict(
                "License number or email already in use".to_string(),
            ));
        }

        let doctor_data = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "specialization": request.specialization,
            "license_number": request.license_number,
            "email": request.email,
            "phone_number": request.phone_number,
            "owner_user_id": owner_user_id,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Doctor> = self.store.insert("/rest/v1/doctors", doctor_data).await?;

        let doctor = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Failed to create doctor".to_string()))?;

        debug!("Doctor created successfully with ID: {}", doctor.id);
        Ok(doctor)
    }

    /// The full directory, ordered by last name then first name.
    pub async fn list_doctors(&self) -> Result<Vec<Doctor>, AppError> {
        debug!("Listing doctor directory");

        self.store
            .select("/rest/v1/doctors?order=last_name.asc,first_name.asc")
            .await
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, AppError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Doctor> = self.store.select(&path).await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))
    }

    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
        owner_user_id: Uuid,
    ) -> Result<Doctor, AppError> {
        debug!("Updating doctor {} for user {}", doctor_id, owner_user_id);

        let path = format!(
            "/rest/v1/doctors?id=eq.{}&owner_user_id=eq.{}",
            doctor_id, owner_user_id
        );
        let result: Vec<Doctor> = self.store.select(&path).await?;
        let doctor = result.into_iter().next().ok_or_else(|| {
            AppError::NotFound("Doctor not found or you do not have permission".to_string())
        })?;

        // Only re-check uniqueness when the submitted email or license
        // actually differs from the stored value.
        if request.email != doctor.email || request.license_number != doctor.license_number {
            if self
                .has_duplicate(&request.license_number, &request.email, Some(doctor_id))
                .await?
            {
                return Err(AppError::Conflict(
                    "License number or email already in use".to_string(),
                ));
            }
        }

        let update_data = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "specialization": request.specialization,
            "license_number": request.license_number,
            "email": request.email,
            "phone_number": request.phone_number,
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Doctor> = self.store.update(&path, update_data).await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Failed to update doctor".to_string()))
    }

    pub async fn delete_doctor(
        &self,
        doctor_id: Uuid,
        owner_user_id: Uuid,
    ) -> Result<(), AppError> {
        debug!("Deleting doctor {} for user {}", doctor_id, owner_user_id);

        let path = format!(
            "/rest/v1/doctors?id=eq.{}&owner_user_id=eq.{}",
            doctor_id, owner_user_id
        );
        let deleted: Vec<Doctor> = self.store.delete(&path).await?;

        if deleted.is_empty() {
            return Err(AppError::NotFound(
                "Doctor not found or you do not have permission".to_string(),
            ));
        }

        Ok(())
    }
}
