//! # aquatherm
//!
//! Client-side session core for the Aquatherm aquarium-thermometer service.
//!
//! The crate owns the authentication/session flow: a [`SessionStore`] holding
//! the logged-in state, an [`AuthGateway`] running the three-step login
//! handshake against the REST API, and a [`PersistenceBridge`] mirroring the
//! session to disk. [`SessionController`] wires the three together and is the
//! entry point for a presentation layer (see the `cli` package).

pub mod config;
pub mod controller;
pub mod gateway;
pub mod persistence;
pub mod resources;
pub mod session;

pub use config::{ApiEnvironment, ClientConfig};
pub use controller::SessionController;
pub use gateway::AuthGateway;
pub use gateway::types::{AuthError, HandshakeStep};
pub use persistence::PersistenceBridge;
pub use session::store::SessionStore;
pub use session::types::{AuthenticatedSession, Record, SessionState};
