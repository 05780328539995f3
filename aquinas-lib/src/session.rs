use std::{fmt, sync::Arc, time::Duration};

use futures::future::BoxFuture;
use hyper::{
    body::{self, Bytes},
    client::connect::Connect,
    ext::ReasonPhrase,
    header,
    http::response::Parts,
    Body, Client, Method, Request, Response, StatusCode,
};
use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ApiConfig,
    ids::AdmissionNumber,
    parser::{self, ParseError},
    xml::{self, XmlDocument},
};

const USER_AGENT: &str = "aquinas";
const XML_CONTENT_TYPE: &str = "application/xml";

const AUTHENTICATION_TAG: &str = "AuthenticationRequest";
const ADMISSION_NUMBER_TAG: &str = "AdmissionNo";
const PASSWORD_TAG: &str = "Password";

/// The "send request, get response" primitive the session is built on.
///
/// Implemented for [`hyper::Client`](hyper::Client), tests can provide their own.
pub trait Transport {
    fn send(
        &self,
        request: Request<Body>,
    ) -> BoxFuture<'static, Result<Response<Body>, hyper::Error>>;
}

impl<C> Transport for Client<C, Body>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    fn send(
        &self,
        request: Request<Body>,
    ) -> BoxFuture<'static, Result<Response<Body>, hyper::Error>> {
        Box::pin(self.request(request))
    }
}

/// Opaque token the server issues after authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(Arc<str>);

impl Token {
    pub(crate) fn new(token: &str) -> Self {
        Self(Arc::from(token))
    }

    /// The token as sent in the credential header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// the token is a credential, keep it out of logs
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}

/// Who a session is for and, once authenticated, the token proving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionToken {
    Unauthenticated {
        admission_number: AdmissionNumber,
    },
    Authenticated {
        admission_number: AdmissionNumber,
        token: Token,
    },
}

impl SessionToken {
    pub fn new(admission_number: AdmissionNumber) -> Self {
        Self::Unauthenticated { admission_number }
    }

    pub fn admission_number(&self) -> &AdmissionNumber {
        match self {
            Self::Unauthenticated { admission_number }
            | Self::Authenticated {
                admission_number, ..
            } => admission_number,
        }
    }

    /// The token, or [`SessionError::NotAuthenticated`] before authentication.
    pub fn token(&self) -> Result<&Token, SessionError> {
        match self {
            Self::Authenticated { token, .. } => Ok(token),
            Self::Unauthenticated { .. } => Err(SessionError::NotAuthenticated),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub(crate) fn authenticate(&mut self, token: Token) {
        let admission_number = self.admission_number().clone();
        *self = Self::Authenticated {
            admission_number,
            token,
        };
    }
}

/// Request pipeline to the API.
///
/// Every exchange is bounded by [`ApiConfig::timeout`] and can be aborted through a
/// [`CancellationToken`].
#[derive(Debug, Clone)]
pub struct Session<T> {
    transport: T,
    config: ApiConfig,
}

impl<T> Session<T> {
    pub fn new(transport: T, config: ApiConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

impl<T> Session<T>
where
    T: Transport,
{
    /// Exchange an admission number and password for a token.
    pub async fn authenticate(
        &self,
        admission_number: &AdmissionNumber,
        password: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<Token, SessionError> {
        let body = xml::write_fields(
            AUTHENTICATION_TAG,
            self.config.namespace(),
            &[
                (ADMISSION_NUMBER_TAG, admission_number.as_str()),
                (PASSWORD_TAG, password.expose_secret().as_str()),
            ],
        )?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.config.url(&self.config.authenticate_path))
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::CONTENT_TYPE, XML_CONTENT_TYPE)
            .header(header::ACCEPT, XML_CONTENT_TYPE)
            .body(Body::from(body))?;

        debug!("authenticating {admission_number}");
        let (parts, bytes) = self.exchange(request, cancel).await?;
        if !parts.status.is_success() {
            return Err(match parts.status {
                StatusCode::UNAUTHORIZED => SessionError::BadLogin,
                _ => SessionError::bad_status(&parts),
            });
        }

        let document = XmlDocument::parse(&bytes)?;
        Ok(parser::parse_token(&document, self.config.namespace())?)
    }

    /// Authenticated request to an endpoint `path`, relative to the base URL.
    ///
    /// Fails with [`SessionError::NotAuthenticated`] without touching the network if the token
    /// has not been issued yet.
    pub async fn request(
        &self,
        session_token: &SessionToken,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<XmlDocument, SessionError> {
        let token = session_token.token()?;
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.config.url(path))
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::CONTENT_TYPE, XML_CONTENT_TYPE)
            .header(header::ACCEPT, XML_CONTENT_TYPE)
            .header(self.config.token_header.as_str(), token.as_str())
            .body(Body::empty())?;

        let (parts, bytes) = self.exchange(request, cancel).await?;
        match parts.status {
            StatusCode::OK => Ok(XmlDocument::parse(&bytes)?),
            StatusCode::UNAUTHORIZED => {
                warn!(
                    "token for {} was rejected by `{path}`",
                    session_token.admission_number()
                );
                Err(SessionError::BadLogin)
            }
            _ => Err(SessionError::bad_status(&parts)),
        }
    }

    async fn exchange(
        &self,
        request: Request<Body>,
        cancel: &CancellationToken,
    ) -> Result<(Parts, Bytes), SessionError> {
        debug!("{} {}", request.method(), request.uri());
        let response = self.transport.send(request);
        let exchange = async {
            let (parts, body) = response.await?.into_parts();
            let bytes = body::to_bytes(body).await?;
            debug!("received {} with {} bytes", parts.status, bytes.len());
            Ok::<_, SessionError>((parts, bytes))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SessionError::Cancelled),
            result = time::timeout(self.config.timeout, exchange) => {
                result.unwrap_or(Err(SessionError::TimedOut(self.config.timeout)))
            }
        }
    }
}

/// The four ways an API operation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server rejected the credentials or the token.
    BadLogin,
    /// The response was structurally or semantically invalid.
    MalformedData,
    /// The exchange did not complete with an expected status.
    BadHttpStatus,
    /// The session was used before it was authenticated.
    NotAuthenticated,
}

/// Represents errors that can occur talking to the API.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The server answered 401.
    #[error("the server rejected the login or session token")]
    BadLogin,
    /// The server answered with a status other than success or 401.
    #[error("unexpected HTTP status {status}: {description}")]
    BadHttpStatus {
        status: StatusCode,
        description: String,
    },
    /// A token was needed before authentication had succeeded.
    #[error("the session has not been authenticated")]
    NotAuthenticated,
    /// Another authentication of the same session has not finished.
    #[error("the session is already being authenticated")]
    AuthenticationInFlight,
    /// Sessions are authenticated exactly once.
    #[error("the session is already authenticated")]
    AlreadyAuthenticated,
    /// The response could not be understood.
    #[error(transparent)]
    MalformedData(#[from] ParseError),
    /// An argument to build the HTTP request was invalid.
    /// See more [here](https://docs.rs/http/0.2.8/http/request/struct.Builder.html#errors)
    #[error("an argument while building an HTTP request was invalid")]
    MalformedHttpArgs(#[from] hyper::http::Error),
    /// Failed to send HTTP request or read its response.
    #[error("failed to send HTTP request")]
    HttpRequestFailed(#[from] hyper::Error),
    #[error("request did not complete within {0:?}")]
    TimedOut(Duration),
    #[error("request was cancelled")]
    Cancelled,
}

impl SessionError {
    /// The description is the reason phrase the server sent, or the standard one for the status
    /// if it sent none.
    fn bad_status(parts: &Parts) -> Self {
        let description = match parts.extensions.get::<ReasonPhrase>() {
            Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
            None => parts
                .status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_owned(),
        };
        Self::BadHttpStatus {
            status: parts.status,
            description,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadLogin => ErrorKind::BadLogin,
            Self::MalformedData(_) => ErrorKind::MalformedData,
            Self::NotAuthenticated | Self::AuthenticationInFlight | Self::AlreadyAuthenticated => {
                ErrorKind::NotAuthenticated
            }
            Self::BadHttpStatus { .. }
            | Self::MalformedHttpArgs(_)
            | Self::HttpRequestFailed(_)
            | Self::TimedOut(_)
            | Self::Cancelled => ErrorKind::BadHttpStatus,
        }
    }

    /// Whether the error comes from misusing the session rather than from the server or network.
    pub fn is_contract_violation(&self) -> bool {
        self.kind() == ErrorKind::NotAuthenticated
    }
}
