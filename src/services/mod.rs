pub mod admin_service;
pub mod invoice_service;
pub mod notification_service;
pub mod otp_service;
pub mod outcome;
pub mod relationship_service;
pub mod statement_service;
