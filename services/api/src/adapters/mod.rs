pub mod db;
pub mod mail;
pub mod sms;

pub use db::DbAdapter;
pub use mail::HttpMailAdapter;
pub use sms::TwilioSmsAdapter;
