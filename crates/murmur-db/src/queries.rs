//! Database query functions organized by domain.
//!
//! Every function takes a `&Connection`; callers that need atomicity pass a
//! transaction.

pub mod friends;
pub mod inbox;
pub mod invitations;
pub mod messages;
pub mod outbox;
pub mod registration;
