#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! maintkit: a framework for command-line maintenance scripts.
//!
//! A script implements [`script::Job`], declares its options on an
//! [`options::OptionRegistry`] and is driven through the phases of a
//! [`script::Lifecycle`]: parse, validate, set up and execute. Output goes
//! through a [`output::Console`] whose channels keep progress lines tidy.

pub mod cli;
pub mod commands;
pub mod options;
pub mod output;
pub mod script;
pub mod store;
pub mod types;
