pub mod mistral_client;
pub mod stt_client;
