//! Remote completion gateways for Wingman.
//!
//! All gateways implement the `wingman_core::Gateway` trait.
//! The router builds the configured gateway and its fallback chain.

pub mod fallback;
pub mod openai_compat;
pub mod router;

pub use fallback::FallbackGateway;
pub use openai_compat::OpenAiCompatGateway;
pub use router::{GatewayRouter, build_from_config, gateway_from_config};
