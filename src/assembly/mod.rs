//! Assembly definition: agent registry, connection set, and acyclicity.
//!
//! An [`Assembly`] owns every registered agent and the directed connections
//! between them. Construction is incremental and eagerly validated: every
//! connection insertion re-checks the whole graph and rejects anything that
//! would close a cycle, so a successfully built assembly is always a DAG.
//!
//! Execution lives in [`crate::runner`]; persistence in
//! [`crate::blueprint`]. Both go through the registration API defined here.

mod builder;
mod validate;

pub use builder::{Assembly, AssemblyError};
