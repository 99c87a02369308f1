// Gateway layer - adapters between the outside world and the moderation core.

#[path = "stdio_gateway.rs"]
pub mod stdio;
