//! Queue-event fan-out for the docq client.
//!
//! A single [`dispatcher::EventDispatcher`] sits between the notification
//! channel and everything that reacts to job lifecycle updates.

pub mod dispatcher;

pub use dispatcher::{EventDispatcher, QueueListener, SubscriptionId};
