use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Doctors form a shared directory: readable by any authenticated user,
/// mutable only by the user who created the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub license_number: String,
    pub email: String,
    pub phone_number: String,
    pub owner_user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDoctorRequest {
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub license_number: String,
    pub email: String,
    pub phone_number: String,
}

/// Updates replace every editable attribute; there is no partial patch.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateDoctorRequest {
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub license_number: String,
    pub email: String,
    pub phone_number: String,
}
