//! HTTP request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! (contract, args, call options)
//!     → path.rs (template → concrete path)
//!     → request.rs (query, headers, JSON or multipart body)
//!     → dispatcher.rs (layered config merge, verb, URL)
//!     → transport.rs (reqwest by default)
//!     → response.rs (unconsumed handle)
//!     → [stream consumer, or buffering helpers]
//! ```

pub mod dispatcher;
pub mod path;
pub mod request;
pub mod response;
pub mod transport;
pub mod types;

pub use dispatcher::{Endpoint, HttpDispatcher, HttpStubTable};
pub use response::{BodyStream, ResponseHandle, ResponseMeta};
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::{DispatchError, DispatchResult, FormPart, FormValue, OutgoingRequest, RequestBody};
