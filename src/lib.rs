#![doc = include_str!("../README.md")]
pub mod command;
pub mod configuration;
pub mod driver;
pub mod error;
pub mod localiser;
pub mod logging;
pub mod messages;
pub mod navigation;
pub mod runner;
pub mod simulation;
pub mod util;
