use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One edge of the Patient-Doctor many-to-many relation. An assignment has
/// no status of its own: the row existing is the whole story. Ownership is
/// anchored on the patient side and checked through the patient's
/// `owner_user_id`, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub notes: Option<String>,
    pub assignment_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAssignmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
}

/// Listing shape for `GET /mappings`: the raw assignment joined in code with
/// both parties' summaries.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentWithParties {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub patient: Option<PatientSummary>,
    pub doctor: Option<DoctorSummary>,
}

/// Listing shape for `GET /mappings/{patient_id}`: the doctor's directory
/// fields merged with the assignment that links them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedDoctor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub email: String,
    pub phone_number: String,
    pub assignment_id: Uuid,
    pub assignment_date: NaiveDate,
    pub notes: Option<String>,
}
