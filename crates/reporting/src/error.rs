use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("{0}")]
    Database(#[from] database::DbError),

    #[error("{0}")]
    Analytics(#[from] analytics::AnalyticsError),
}
