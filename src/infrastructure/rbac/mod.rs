//! Role-based access control infrastructure

mod engine;
mod source;

pub use engine::RbacPolicyEngine;
pub use source::{FilePolicySource, StaticPolicySource};
