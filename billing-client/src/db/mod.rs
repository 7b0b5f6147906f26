pub mod dashboard_queries;
pub mod reading_queries;
