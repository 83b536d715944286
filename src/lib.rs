//! Fluently - a Telegram bot that tutors users in spoken English.

pub mod config;
pub mod tutor;
