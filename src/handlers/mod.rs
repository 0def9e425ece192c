pub mod action;
pub mod discord;
