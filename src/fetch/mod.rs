//! Background fetching.
//!
//! Backend calls run on a worker thread. Every request carries a [`Ticket`]
//! naming the composer session that issued it, so results that arrive after
//! the session ended can be recognised and dropped.

mod request;
mod worker;

pub use request::{FetchOutcome, FetchRequest, FetchResult, Ticket};
pub use worker::FetchWorker;

/// Something that can run fetch requests in the background.
///
/// Results are not returned here; the owner of the dispatcher drains them
/// and hands them back to the composer.
pub trait Dispatcher {
    /// Queue a request.
    fn dispatch(&mut self, ticket: Ticket, request: FetchRequest);
}
