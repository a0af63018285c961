use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::PostgrestClient;
use shared_models::error::AppError;

use crate::models::{BookConsultationRequest, Consultation, STATUS_CANCELLED, STATUS_SCHEDULED};

pub struct BookingService {
    store: PostgrestClient,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
        }
    }

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

    pub async fn book_consultation(
        &self,
        request: BookConsultationRequest,
        owner_user_id: Uuid,
    ) -> Result<Consultation, AppError> {
        debug!(
            "Booking consultation for patient {} with doctor {}",
            request.patient_id, request.doctor_id
        );

        self.require_owned_patient(request.patient_id, owner_user_id)
            .await?;

        let doctor_path = format!("/rest/v1/doctors?id=eq.{}&select=id", request.doctor_id);
        let doctors: Vec<Value> = self.store.select(&doctor_path).await?;
        if doctors.is_empty() {
            return Err(AppError::NotFound("Doctor not found".to_string()));
        }

        let consultation_data = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "date": request.date.format("%Y-%m-%d").to_string(),
            "time": request.time.format("%H:%M:%S").to_string(),
            "reason": request.reason,
            "status": STATUS_SCHEDULED,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Consultation> = self
            .store
            .insert("/rest/v1/consultations", consultation_data)
            .await?;

        let consultation = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Failed to book consultation".to_string()))?;

        debug!("Consultation booked with ID: {}", consultation.id);
        Ok(consultation)
    }

    /// Consultations for every patient the caller owns, newest first. Owning
    /// no patients short-circuits without a consultations lookup.
    pub async fn list_consultations(
        &self,
        owner_user_id: Uuid,
    ) -> Result<Vec<Consultation>, AppError> {
        debug!("Listing consultations for user: {}", owner_user_id);

        let patients_path = format!(
            "/rest/v1/patients?owner_user_id=eq.{}&select=id",
            owner_user_id
        );
        let patients: Vec<Value> = self.store.select(&patients_path).await?;

        if patients.is_empty() {
            return Ok(vec![]);
        }

        let patient_ids: Vec<String> = patients
            .iter()
            .filter_map(|row| row.get("id").and_then(|v| v.as_str()).map(String::from))
            .collect();

        let path = format!(
            "/rest/v1/consultations?patient_id=in.({})&order=date.desc,time.desc",
            patient_ids.join(",")
        );
        self.store.select(&path).await
    }

    /// Cancellation keeps the row and flips its status, so the schedule
    /// history survives. Same 404/403 split as assignment removal.
    pub async fn cancel_consultation(
        &self,
        consultation_id: Uuid,
        owner_user_id: Uuid,
    ) -> Result<Consultation, AppError> {
        debug!(
            "Cancelling consultation {} for user {}",
            consultation_id, owner_user_id
        );

        let path = format!("/rest/v1/consultations?id=eq.{}", consultation_id);
        let result: Vec<Consultation> = self.store.select(&path).await?;
        let consultation = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Consultation not found".to_string()))?;

        let owner_path = format!(
            "/rest/v1/patients?id=eq.{}&select=owner_user_id",
            consultation.patient_id
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
                "You do not have permission to cancel this consultation".to_string(),
            ));
        }

        let update_data = json!({
            "status": STATUS_CANCELLED,
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Consultation> = self.store.update(&path, update_data).await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Consultation not found".to_string()))
    }
}
