pub mod client;
pub mod transport;

#[cfg(test)]
pub(crate) mod stubs;

pub use client::BackendClient;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
