pub mod account;
pub mod meeting;
pub mod notification;
