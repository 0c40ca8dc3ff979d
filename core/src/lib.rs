//! Outbound HTTP capability for services.
//!
//! # Overview
//! Gives a host service the ability to issue GET/POST/PUT/PATCH/DELETE
//! requests, buffered or streamed, through a fixed pipeline: normalize the
//! call, log the outgoing request, perform it through an injected
//! `Transport`, log the incoming response, then format the result or
//! translate the failure.
//!
//! # Design
//! - The network is a capability: `Transport` does the I/O, the pipeline
//!   only decides what to send and how to report what came back.
//!   `ReqwestTransport` is the default implementation.
//! - `HttpClientService` is built once per instance from `ClientSettings`;
//!   its enabled verbs, hooks and formatters are fixed from then on.
//! - Streamed exchanges split into a response future and a byte stream so
//!   completion never depends on who reads the body.

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod hooks;
pub mod http;
pub mod logging;
pub mod normalize;
pub mod registrar;
pub mod reqwest_transport;
pub mod service;
pub mod translate;
pub mod transport;

pub use cache::{Cache, CachingTransport, MemoryCache};
pub use config::ClientSettings;
pub use dispatch::{Dispatched, Dispatcher, ResponseStream};
pub use error::{ClientError, ClientResult, TranslatedError, TransportError, TransportErrorKind};
pub use format::{FormattedResponse, ResponseFormatter};
pub use hooks::{Hook, HookPipeline};
pub use http::{Headers, HttpMethod, RequestDescriptor, RequestOptions, ResponseBody, ResponseEnvelope, ResponseType};
pub use registrar::{MethodSet, MethodTable};
pub use reqwest_transport::ReqwestTransport;
pub use service::{Helper, HttpClientService, HttpClientServiceBuilder};
pub use translate::ErrorFormatter;
pub use transport::{ByteStream, StreamHandle, Transport};
