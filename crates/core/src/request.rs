//! Inbound turns as handed over by a transport.

use chrono::{DateTime, Utc};

use crate::{
    error::InputError,
    input::{RequestData, SegmentSequence, DELIMITER},
    session::{Session, SessionKey},
};

/// Partition name of the service code.
pub const SERVICE_CODE: &str = "service_code";
/// Partition name of the initial code.
pub const INITIAL_CODE: &str = "initial_code";

/// One inbound turn as handed over by the transport.
#[derive(Debug, Clone)]
pub struct UssdRequest {
    key: SessionKey,
    raw: String,
    data: RequestData,
    received_at: DateTime<Utc>,
    pub(crate) session: Option<Session>,
}

impl UssdRequest {
    /// A request whose whole input is user input.
    pub fn new(
        msisdn: impl Into<String>,
        session_id: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        let raw = raw.into();
        Self {
            key: SessionKey::new(msisdn, session_id),
            data: RequestData::parse(&raw),
            raw,
            received_at: Utc::now(),
            session: None,
        }
    }

    /// A request over input that was already partitioned.
    pub(crate) fn from_data(key: SessionKey, raw: impl Into<String>, data: RequestData) -> Self {
        Self {
            key,
            raw: raw.into(),
            data,
            received_at: Utc::now(),
            session: None,
        }
    }

    /// Starts a request for one transport turn.
    pub fn builder(msisdn: impl Into<String>, session_id: impl Into<String>) -> UssdRequestBuilder {
        UssdRequestBuilder {
            key: SessionKey::new(msisdn, session_id),
            raw: String::new(),
            service_code: None,
            initial_code: None,
        }
    }

    /// Identity used for the session store.
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Subscriber number.
    pub fn msisdn(&self) -> &str {
        &self.key.msisdn
    }

    /// Transport session id.
    pub fn session_id(&self) -> &str {
        &self.key.session_id
    }

    /// Input exactly as received, after any code prefixing.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Input after prefix stripping and partitioning.
    pub fn data(&self) -> &RequestData {
        &self.data
    }

    /// Unconsumed user input.
    pub fn input(&self) -> &SegmentSequence {
        self.data.head()
    }

    /// The service code partition, when configured.
    pub fn service_code(&self) -> Option<&SegmentSequence> {
        self.data.get(SERVICE_CODE)
    }

    /// The initial code partition, when configured.
    pub fn initial_code(&self) -> Option<&SegmentSequence> {
        self.data.get(INITIAL_CODE)
    }

    /// When the request was built.
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Session of a turn that failed, available to exception hooks.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

/// Builds requests whose raw input starts with dial codes.
#[derive(Debug, Clone)]
pub struct UssdRequestBuilder {
    key: SessionKey,
    raw: String,
    service_code: Option<String>,
    initial_code: Option<String>,
}

impl UssdRequestBuilder {
    /// Raw `*`-separated input as received.
    pub fn input(mut self, raw: impl Into<String>) -> Self {
        self.raw = raw.into();
        self
    }

    /// Code of the service itself, always prepended to the input.
    pub fn service_code(mut self, code: impl Into<String>) -> Self {
        self.service_code = Some(code.into()).filter(|code: &String| !code.is_empty());
        self
    }

    /// Code dialed along with the service code, prepended unless present.
    pub fn initial_code(mut self, code: impl Into<String>) -> Self {
        self.initial_code = Some(code.into()).filter(|code: &String| !code.is_empty());
        self
    }

    /// Parses the input and applies the configured partitions.
    pub fn build(self) -> Result<UssdRequest, InputError> {
        let mut raw = self.raw;
        if let Some(initial) = &self.initial_code {
            let prefixed = format!("{initial}{DELIMITER}");
            if raw != *initial && !raw.starts_with(&prefixed) {
                raw = if raw.is_empty() {
                    initial.clone()
                } else {
                    format!("{prefixed}{raw}")
                };
            }
        }
        if let Some(service) = &self.service_code {
            raw = if raw.is_empty() {
                service.clone()
            } else {
                format!("{service}{DELIMITER}{raw}")
            };
        }

        let mut data = RequestData::parse(&raw);
        if let Some(service) = &self.service_code {
            data.partition(service.as_str(), Some(SERVICE_CODE))?;
        }
        if let Some(initial) = &self.initial_code {
            data.partition(initial.as_str(), Some(INITIAL_CODE))?;
        }

        Ok(UssdRequest {
            key: self.key,
            raw,
            data,
            received_at: Utc::now(),
            session: None,
        })
    }
}
