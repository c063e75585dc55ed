//! Network services for HTTP API and MQTT integration.
//!
//! This module provides optional network surfaces for the control point:
//! - `web` feature: Axum-based HTTP API server with JSON endpoints
//! - `mqtt` feature: MQTT client for pub/sub messaging
//!
//! Both services share a single [`ControlPoint`](crate::ControlPoint) with the
//! control loop through `SharedControlPoint<O>` wrapped in `Arc`. They only
//! queue commands; the control loop applies them at the next cycle, the same
//! way it applies commands received on the bus.
//!
//! ```ignore
//! use std::sync::Arc;
//! use cp_interlock::services::SharedControlPoint;
//!
//! // Create single shared state
//! let state = Arc::new(SharedControlPoint::new(control_point));
//!
//! // Web and MQTT both use the same state
//! let web_router = build_router(Arc::clone(&state), &web_config);
//! let mqtt_handler = MqttHandler::with_shared_state(Arc::clone(&state), mqtt_config);
//! ```

pub mod api;
pub mod shared;

#[cfg(feature = "web")]
pub mod web;

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use api::*;
pub use shared::*;

#[cfg(feature = "web")]
pub use web::*;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
