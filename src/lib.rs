//! Bookwise - Conversational Author and Work Information Engine
//!
//! This crate resolves natural-language questions about literary authors and
//! works against a free-text knowledge source, across conversational turns.
//! It is consumed as a library by a surrounding chat surface.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
