//! Resolver module - turning a subject name into a classified page.

mod subject;

pub use subject::{Resolution, SubjectResolver};
