pub mod activity;
pub mod classroom;
pub mod notification;
pub mod principal;
pub mod profile;
pub mod role_request;
pub mod task;
