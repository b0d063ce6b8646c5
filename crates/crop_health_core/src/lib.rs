pub mod alerts;
pub mod domain;
pub mod memory;
pub mod ports;

pub use alerts::{AlertError, AlertRunSummary, AlertSettings, NotificationDispatcher, OutbreakAlert, RegionalAlertJob};
pub use domain::{DiagnosisRecord, DiagnosisStatus, Location, NewDiagnosis, RegionCluster};
pub use memory::InMemoryDiagnosisLog;
pub use ports::{DiagnosisLog, EmailChannel, PortError, PortResult, SmsChannel};
