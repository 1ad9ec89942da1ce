pub mod auth_service;
pub mod inquiry_service;
pub mod order_service;
