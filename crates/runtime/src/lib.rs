//! hwipc runtime - typed channels over an untyped IPC transport
//!
//! Turns a fire-and-forget, uncorrelated message transport into typed
//! request/response calls and broadcast listeners:
//!
//! - **Transport**: moves JSON frames between a controller and a worker
//!   (in-memory pair, loopback, or length-prefixed pipe)
//! - **Endpoint**: one side of the transport; owns the handler table, the
//!   pending-call table and the dispatch loop
//! - **Channel**: a named, typed conduit; `send`/`request` correlate a reply
//!   to each call, `on_receive`/`on_request` serve calls
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐                          ┌──────────────┐
//! │  Channel<Q,R>│ request(q, ep, ep)       │  Channel<Q,R>│ on_request(h, ep)
//! └──────┬───────┘                          └──────▲───────┘
//!        │ Frame::Request{id}                      │ handler(q) -> r
//! ┌──────▼───────┐      transport           ┌──────┴───────┐
//! │   Endpoint   │ ───────────────────────▶ │   Endpoint   │
//! │  (pending)   │ ◀─────────────────────── │  (handlers)  │
//! └──────────────┘    Frame::Reply{id}      └──────────────┘
//! ```

pub mod channel;
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod transport;

pub use channel::{Channel, DEFAULT_TIMEOUT};
pub use endpoint::{Endpoint, Side};
pub use error::{Error, Result};
pub use handler::{HandlerError, HandlerResult};
pub use transport::{PipeTransport, QueueSender, Transport, TransportParts, memory};
