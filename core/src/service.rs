//! The per-instance HTTP client service.
//!
//! # Design
//! `HttpClientService` is what a host service embeds to gain outbound HTTP.
//! It owns its own settings, method table, hook pipeline and dispatcher, all
//! built once by `HttpClientServiceBuilder::build`. Two instances never share
//! mutable state, so one instance's `includeMethods` cannot affect another.
//!
//! Each enabled verb is reachable two ways:
//! - a typed helper (`get`, `post`, ... or `helper(verb)`), for in-process use;
//! - an action (`call("get", params, payload)`) taking JSON params
//!   `{ "url": "...", "opt": { ... } }`, for network-facing dispatch.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::config::ClientSettings;
use crate::dispatch::{Dispatched, Dispatcher};
use crate::error::{ClientError, ClientResult};
use crate::format::ResponseFormatter;
use crate::hooks::{Hook, HookPipeline};
use crate::http::{HttpMethod, RequestOptions};
use crate::logging::{self, IncomingLogFn, OutgoingLogFn};
use crate::normalize::{coerce_options, normalize, normalize_options};
use crate::registrar::MethodTable;
use crate::transport::{ByteStream, Transport};
use crate::translate::ErrorFormatter;

pub const DEFAULT_SERVICE_NAME: &str = "http";

/// Params accepted by every action entry point.
#[derive(Debug, Deserialize)]
struct ActionParams {
    url: String,
    #[serde(default)]
    opt: Option<Value>,
}

pub struct HttpClientServiceBuilder {
    name: String,
    transport: Arc<dyn Transport>,
    settings: ClientSettings,
    outgoing: Option<OutgoingLogFn>,
    incoming: Option<IncomingLogFn>,
    formatter: Option<ResponseFormatter>,
    errors: Option<ErrorFormatter>,
    hooks: Vec<Hook>,
}

impl HttpClientServiceBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn log_outgoing_request(
        mut self,
        f: impl Fn(&crate::http::RequestDescriptor) -> String + Send + Sync + 'static,
    ) -> Self {
        self.outgoing = Some(Arc::new(f));
        self
    }

    pub fn log_incoming_response(
        mut self,
        f: impl Fn(&crate::http::ResponseEnvelope) -> String + Send + Sync + 'static,
    ) -> Self {
        self.incoming = Some(Arc::new(f));
        self
    }

    /// Overrides `settings.response_formatter`.
    pub fn response_formatter(mut self, formatter: ResponseFormatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Overrides `settings.translate_errors`.
    pub fn error_formatter(mut self, errors: ErrorFormatter) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Register an extra hook. Runs after the built-in log hooks.
    pub fn hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn build(self) -> HttpClientService {
        let settings = self.settings;
        let methods = MethodTable::register(settings.include_methods.as_deref(), settings.expose_actions);

        let mut hooks = HookPipeline::new();
        if settings.logging {
            let outgoing = self
                .outgoing
                .unwrap_or_else(|| Arc::new(logging::log_outgoing_request) as OutgoingLogFn);
            let incoming = self
                .incoming
                .unwrap_or_else(|| Arc::new(logging::log_incoming_response) as IncomingLogFn);
            hooks.register(logging::outgoing_hook(outgoing));
            hooks.register(logging::incoming_hook(incoming));
        }
        for hook in self.hooks {
            hooks.register(hook);
        }

        let formatter = self
            .formatter
            .unwrap_or_else(|| ResponseFormatter::from_name(settings.response_formatter.as_deref()));
        let errors = self.errors.unwrap_or(if settings.translate_errors {
            ErrorFormatter::Builtin
        } else {
            ErrorFormatter::Disabled
        });
        let defaults = coerce_options(Value::Object(settings.default_options.clone()));

        tracing::info!(
            service = %self.name,
            helpers = ?methods.helpers,
            actions = ?methods.actions,
            formatter = formatter.name(),
            "HTTP client service created"
        );

        HttpClientService {
            name: self.name,
            dispatcher: Dispatcher::new(self.transport, hooks, formatter, errors, defaults),
            settings,
            methods,
        }
    }
}

#[derive(Debug)]
pub struct HttpClientService {
    name: String,
    settings: ClientSettings,
    methods: MethodTable,
    dispatcher: Dispatcher,
}

impl HttpClientService {
    pub fn builder<T: Transport + 'static>(transport: T) -> HttpClientServiceBuilder {
        HttpClientServiceBuilder {
            name: DEFAULT_SERVICE_NAME.to_owned(),
            transport: Arc::new(transport),
            settings: ClientSettings::default(),
            outgoing: None,
            incoming: None,
            formatter: None,
            errors: None,
            hooks: Vec::new(),
        }
    }

    pub fn new<T: Transport + 'static>(transport: T, settings: ClientSettings) -> Self {
        Self::builder(transport).settings(settings).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn methods(&self) -> MethodTable {
        self.methods
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The helper for `method`, if this instance enables it.
    pub fn helper(&self, method: HttpMethod) -> Option<Helper<'_>> {
        self.methods
            .has_helper(method)
            .then_some(Helper { service: self, method })
    }

    pub async fn get(&self, url: &str, options: Option<Value>) -> ClientResult<Dispatched> {
        self.request(HttpMethod::Get, url, options, None).await
    }

    pub async fn post(&self, url: &str, options: Option<Value>, payload: Option<ByteStream>) -> ClientResult<Dispatched> {
        self.request(HttpMethod::Post, url, options, payload).await
    }

    pub async fn put(&self, url: &str, options: Option<Value>, payload: Option<ByteStream>) -> ClientResult<Dispatched> {
        self.request(HttpMethod::Put, url, options, payload).await
    }

    pub async fn patch(&self, url: &str, options: Option<Value>, payload: Option<ByteStream>) -> ClientResult<Dispatched> {
        self.request(HttpMethod::Patch, url, options, payload).await
    }

    pub async fn delete(&self, url: &str, options: Option<Value>) -> ClientResult<Dispatched> {
        self.request(HttpMethod::Delete, url, options, None).await
    }

    /// Issue a request through the helper of `method`.
    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        options: Option<Value>,
        payload: Option<ByteStream>,
    ) -> ClientResult<Dispatched> {
        let helper = self.helper(method).ok_or(ClientError::MethodDisabled(method))?;
        helper.send(url, options, payload).await
    }

    /// Names of the action entry points this instance exposes.
    pub fn action_names(&self) -> Vec<&'static str> {
        self.methods.actions.iter().map(HttpMethod::action_name).collect()
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.action_method(name).is_some()
    }

    fn action_method(&self, name: &str) -> Option<HttpMethod> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.action_name() == name)
            .filter(|m| self.methods.has_action(*m))
    }

    /// Invoke an action entry point with JSON params.
    pub async fn call(&self, action: &str, params: Value, payload: Option<ByteStream>) -> ClientResult<Dispatched> {
        let method = self
            .action_method(action)
            .ok_or_else(|| ClientError::UnknownAction(format!("{}.{action}", self.name)))?;
        let params: ActionParams =
            serde_json::from_value(params).map_err(|e| ClientError::InvalidParams(e.to_string()))?;
        let payload = if method.carries_body() { payload } else { None };
        self.dispatcher
            .dispatch(normalize(method, params.url, params.opt, payload))
            .await
    }
}

/// An enabled verb's in-process entry point.
#[derive(Debug, Clone, Copy)]
pub struct Helper<'a> {
    service: &'a HttpClientService,
    method: HttpMethod,
}

impl Helper<'_> {
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Send with loosely-typed options, coerced the same way as action params.
    pub async fn send(&self, url: &str, options: Option<Value>, payload: Option<ByteStream>) -> ClientResult<Dispatched> {
        self.service
            .dispatcher
            .dispatch(normalize(self.method, url, options, payload))
            .await
    }

    /// Send with typed options.
    pub async fn send_with(
        &self,
        url: &str,
        options: RequestOptions,
        payload: Option<ByteStream>,
    ) -> ClientResult<Dispatched> {
        self.service
            .dispatcher
            .dispatch(normalize_options(self.method, url, options, payload))
            .await
    }
}
