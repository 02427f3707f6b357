use sqlx::FromRow;
use uuid::Uuid;

/// Database model for doctor (reference data, never mutated by the API)
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub specialty: String,
    pub room: String,
}
