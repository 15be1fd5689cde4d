//! Rules of the solo registration portal, free of any I/O: which slot can
//! be booked, how repertoire submissions move between states, who gets
//! promoted from the waitlist and who is on stage next.

extern crate alloc;

pub mod dashboard;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod slots;
pub mod stage;
pub mod sync;
pub mod waitlist;

pub use error::AllocationError;
