pub mod ingest;
pub mod storage;
pub mod thumbnail;
pub mod video_service;
pub mod video_store;
