//! Request-scoped services used by the gate and proxy routes.
//!
//! ARCHITECTURE
//! ============
//! Services own the decisions (who is calling, may they see this page) so
//! route handlers stay focused on HTTP plumbing.

pub mod identity;
pub mod policy;
