pub mod patient;
pub mod wire;

pub use patient::{EsiLevel, PatientRecord, PatientStatus, Vitals};
pub use wire::{CompleteResponse, SessionStatus, SubmitRequest, SubmitResponse};
