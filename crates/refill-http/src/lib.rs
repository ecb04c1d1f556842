//! # refill-http
//!
//! Outbound REST requests for the Refill client.
//!
//! ## Modules
//!
//! - `transport`: the HTTP seam and its reqwest implementation
//! - `request`: request description builder
//! - `response`: body decoding and backend error mapping
//! - `executor`: bearer injection, transport retry, 401 refresh-and-retry
//! - `refresher`: the token refresh endpoint client

pub mod executor;
pub mod refresher;
pub mod request;
pub mod response;
pub mod transport;

pub use executor::AuthenticatedRequestExecutor;
pub use refresher::HttpTokenRefresher;
pub use request::RequestSpec;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
