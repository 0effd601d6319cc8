//! MCP transports. Both feed the same [`Dispatcher`](crate::Dispatcher):
//! an HTTP endpoint with SSE streaming, and a newline-delimited stdio loop.

pub mod http;
pub mod stdio;
