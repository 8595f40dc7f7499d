#![forbid(unsafe_code)]

pub mod aggregate;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod formats;
pub mod grammar;
pub mod logging;
pub mod markdown;
pub mod monster;
pub mod reference;
pub mod section;
pub mod shaped;
pub mod spell;
pub mod spellcasting;
pub mod text;
