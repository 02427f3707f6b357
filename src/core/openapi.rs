use utoipa::{Modify, OpenApi};

use crate::features::doctors::{dtos as doctors_dtos, handlers as doctors_handlers};
use crate::features::patients::{dtos as patients_dtos, handlers as patients_handlers};
use crate::features::queue::{dtos as queue_dtos, handlers as queue_handlers};
use crate::features::sessions::{
    dtos as sessions_dtos, handlers as sessions_handlers, models as sessions_models,
};
use crate::modules::decision::NextAction;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Patients
        patients_handlers::register_patient,
        patients_handlers::verify_otp,
        // Doctors
        doctors_handlers::list_doctors,
        doctors_handlers::get_doctor,
        // Sessions
        sessions_handlers::get_session,
        sessions_handlers::send_message,
        sessions_handlers::diagnose_session,
        // Queue
        queue_handlers::get_queue_status,
    ),
    components(
        schemas(
            Meta,
            NextAction,
            // Patients
            patients_dtos::RegisterPatientDto,
            patients_dtos::VerifyOtpDto,
            patients_dtos::PatientResponseDto,
            ApiResponse<patients_dtos::PatientResponseDto>,
            // Doctors
            doctors_dtos::DoctorResponseDto,
            doctors_dtos::DoctorDetailsDto,
            ApiResponse<Vec<doctors_dtos::DoctorResponseDto>>,
            ApiResponse<doctors_dtos::DoctorDetailsDto>,
            // Sessions
            sessions_models::MessageRole,
            sessions_models::SessionState,
            sessions_models::Vitals,
            sessions_dtos::ChatRequestDto,
            sessions_dtos::ChatResponseDto,
            sessions_dtos::DiagnoseRequestDto,
            sessions_dtos::MessageDto,
            sessions_dtos::SessionDto,
            sessions_dtos::SessionDetailDto,
            ApiResponse<sessions_dtos::SessionDto>,
            ApiResponse<sessions_dtos::SessionDetailDto>,
            ApiResponse<sessions_dtos::ChatResponseDto>,
            // Queue
            queue_dtos::TicketDto,
            queue_dtos::QueueStatusDto,
            ApiResponse<queue_dtos::QueueStatusDto>,
        )
    ),
    tags(
        (name = "patients", description = "Patient registration and code verification"),
        (name = "doctors", description = "Doctor directory"),
        (name = "sessions", description = "Triage conversation and diagnosis"),
        (name = "queue", description = "Per-doctor daily queue"),
    ),
    info(
        title = "Triana API",
        version = "0.1.0",
        description = "API documentation for Triana",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
