//! Wicker
//!
//! Wicker is the client-side cart and checkout reconciliation core of a
//! commerce storefront: a shared cart store mediated by a remote cart
//! service, a deterministic synchronization routine that converges local
//! state onto the server's cart of record, and a checkout orchestrator that
//! re-validates server state immediately before committing an order.

pub mod api;
pub mod config;
pub mod context;
pub mod domain;
pub mod identity;

mod ids;
