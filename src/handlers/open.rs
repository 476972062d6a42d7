//! The `open` group: endpoints reachable through a group-level marker.

use std::convert::Infallible;

use axum::extract::Path;

use crate::registry::HandlerId;

pub const ECHO: HandlerId = HandlerId::new("open", "echo");
pub const GREET: HandlerId = HandlerId::new("open", "greet");

pub const ECHO_PATH: &str = "/open-api/echo";
pub const GREET_PATH: &str = "/open-api/greet/{name}";

pub async fn echo(body: String) -> Result<String, Infallible> {
    Ok(body)
}

pub async fn greet(Path(name): Path<String>) -> Result<String, Infallible> {
    Ok(format!("hello, {name}"))
}
