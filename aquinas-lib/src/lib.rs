//! Client for the MyAquinas student API.
//!
//! A [`Student`](Student) authenticates once, then fetches the student's details and weekly
//! [`Timetable`](Timetable) with the issued token.

mod config;
mod ids;
mod parser;
mod session;
mod student;
mod timetable;
mod xml;

pub use config::{ApiConfig, AUTHENTICATE_PATH, GET_STUDENT_DETAILS, GET_TIMETABLE};
pub use ids::{derive_admission_number, AdmissionNumber, IdentityCode, ParseIdError};
pub use parser::{
    parse_student_details, parse_timetable, parse_token, ParseError, StudentIdentity,
    TimetableSession,
};
pub use session::{ErrorKind, Session, SessionError, SessionToken, Token, Transport};
pub use student::{Student, StudentObserver};
pub use timetable::{canonical_period, Lesson, SchoolDay, Timetable, WeekSchedule, REGISTRATION};
pub use xml::{Element, XmlDocument};

#[cfg(feature = "rustls")]
use hyper::{client::HttpConnector, Body, Client};
#[cfg(feature = "rustls")]
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "rustls")]
pub type HttpsClient = Client<HttpsConnector<HttpConnector>, Body>;

/// HTTPS-only client using the platform's root certificates.
#[cfg(feature = "rustls")]
pub fn https_client() -> HttpsClient {
    Client::builder().build(
        HttpsConnectorBuilder::new()
            .with_native_roots()
            .https_only()
            .enable_http1()
            .build(),
    )
}

/// Authenticate `code` over `transport` and fetch both its details and timetable.
pub async fn fetch_student<T>(
    transport: T,
    code: &str,
    password: &SecretString,
    config: ApiConfig,
    cancel: &CancellationToken,
) -> Result<Student<T>, FetchError>
where
    T: Transport,
{
    let code: IdentityCode = code.parse()?;
    let mut student = Student::new(transport, config, &code);
    student.authenticate(password, cancel).await?;
    student.fetch_all(cancel).await?;
    Ok(student)
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    InvalidIdentityCode(#[from] ParseIdError),
    #[error(transparent)]
    SessionFailed(#[from] SessionError),
}
