pub mod auth;
pub mod inquiries;
pub mod orders;
