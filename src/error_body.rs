use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ErrorBodyDoc {
    pub code: String,
    pub message: String,
    pub trace_id: Option<String>,
}
