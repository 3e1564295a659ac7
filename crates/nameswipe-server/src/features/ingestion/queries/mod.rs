//! Ingestion queries

pub mod get_status;
pub mod subscribe_events;

pub use get_status::GetIngestionStatusQuery;
pub use subscribe_events::SubscribeEventsQuery;
