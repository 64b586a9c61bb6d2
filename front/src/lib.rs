#![allow(clippy::upper_case_acronyms)]

pub mod app;
pub mod config;
pub mod connection;
pub mod contract;
pub mod manifest;
pub mod poller;
pub mod provider;
pub mod retry;
pub mod sender;
pub mod toncenter_api;
pub mod view;
