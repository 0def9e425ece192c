pub mod draft_store;
pub mod extractor_service;
pub mod meeting_service;
pub mod sync_service;
