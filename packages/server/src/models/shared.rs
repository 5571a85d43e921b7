use serde::Serialize;

#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}
