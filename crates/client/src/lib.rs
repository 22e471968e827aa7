//! Network layer of the docq job-queue client.
//!
//! Two independent paths to the same server: [`gateway::JobGateway`] for
//! request/response job control over HTTP, and [`channel::NotificationChannel`]
//! for the persistent WebSocket feed of pushed [`docq_core::job::QueueEvent`]s.
//! The channel owns its reconnection policy; the gateway never retries.

pub mod channel;
pub mod config;
pub mod gateway;
pub mod messages;
pub mod reconnect;
