//! Regional outbreak alerting: aggregation, thresholding, recipient dedup and
//! notification fan-out for one scheduled run.

pub mod aggregation;
pub mod dispatch;
pub mod job;
pub mod message;
pub mod phone;
pub mod recipients;
pub mod threshold;

pub use aggregation::group_clusters;
pub use dispatch::{DispatchReport, NotificationDispatcher};
pub use job::{AlertError, AlertRunSummary, AlertSettings, RegionalAlertJob};
pub use message::OutbreakAlert;
pub use phone::normalize_phone;
pub use recipients::{plan_recipients, Recipient, RecipientPlan};
pub use threshold::qualifying_clusters;
