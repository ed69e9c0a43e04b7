//! Mind Lantern (마음의 등불): a companion for daily Buddhist practice.
//!
//! A meditation countdown with bell cues, a 108 bows counter, a scripture
//! reader, a daily quote and a counselor backed by Gemini. Everything is
//! available from the terminal and through a local HTTP API.

pub mod api;
pub mod audio;
pub mod bows;
pub mod config;
pub mod console;
pub mod counsel;
pub mod db;
pub mod meditation;
pub mod models;
pub mod scripture;
pub mod wisdom;
