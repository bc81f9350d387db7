use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Items per page (default 20).
    #[param(required = false)]
    pub limit: Option<u64>,
    /// Page offset (default 0).
    #[param(required = false)]
    pub offset: Option<u64>,
}

impl PaginationParams {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(20) as usize
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0) as usize
    }
}
