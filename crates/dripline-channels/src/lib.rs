//! # Dripline Channels
//!
//! [`DeliveryChannel`](dripline_core::traits::DeliveryChannel)
//! implementations. The engine hands a channel `(recipient, payload)` and
//! cares only about success or failure; what the wire looks like lives here.

mod console;
mod webhook;

pub use console::ConsoleChannel;
pub use webhook::WebhookChannel;
