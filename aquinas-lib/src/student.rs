use log::{info, warn};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ApiConfig,
    ids::{AdmissionNumber, IdentityCode},
    parser::{self, StudentIdentity},
    session::{Session, SessionError, SessionToken, Transport},
    timetable::Timetable,
};

/// Notified when a [`Student`](Student) finishes an operation.
///
/// Each method is called once per successful operation, after the student's state has been
/// updated. Nothing is called when an operation fails.
pub trait StudentObserver<T> {
    fn authenticated(&self, _student: &Student<T>) {}

    fn details_loaded(&self, _student: &Student<T>) {}

    fn timetable_loaded(&self, _student: &Student<T>) {}
}

/// A student's session with the API and everything fetched through it.
///
/// A `Student` is meant to be driven by a single caller. Operations take `&mut self`, so
/// sharing one between tasks needs external synchronization.
pub struct Student<T> {
    session: Session<T>,
    session_token: SessionToken,
    authenticating: bool,
    details: Option<StudentIdentity>,
    timetable: Option<Timetable>,
    observers: Vec<Box<dyn StudentObserver<T> + Send + Sync>>,
}

impl<T> Student<T> {
    pub fn new(transport: T, config: ApiConfig, code: &IdentityCode) -> Self {
        Self::with_admission_number(transport, config, code.admission_number().clone())
    }

    pub fn with_admission_number(
        transport: T,
        config: ApiConfig,
        admission_number: AdmissionNumber,
    ) -> Self {
        Self {
            session: Session::new(transport, config),
            session_token: SessionToken::new(admission_number),
            authenticating: false,
            details: None,
            timetable: None,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl StudentObserver<T> + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn admission_number(&self) -> &AdmissionNumber {
        self.session_token.admission_number()
    }

    pub fn session_token(&self) -> &SessionToken {
        &self.session_token
    }

    pub fn is_authenticated(&self) -> bool {
        self.session_token.is_authenticated()
    }

    /// Details from the last successful fetch.
    pub fn details(&self) -> Option<&StudentIdentity> {
        self.details.as_ref()
    }

    /// Timetable from the last successful fetch.
    pub fn timetable(&self) -> Option<&Timetable> {
        self.timetable.as_ref()
    }

    fn notify(&self, event: impl Fn(&dyn StudentObserver<T>, &Self)) {
        for observer in &self.observers {
            let observer: &dyn StudentObserver<T> = &**observer;
            event(observer, self);
        }
    }
}

impl<T> Student<T>
where
    T: Transport,
{
    /// Obtain a token for this student. A session is authenticated at most once.
    ///
    /// A rejected password is [`SessionError::BadLogin`] and leaves the student unauthenticated,
    /// so it may be retried.
    pub async fn authenticate(
        &mut self,
        password: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        if self.session_token.is_authenticated() {
            return Err(SessionError::AlreadyAuthenticated);
        }
        if self.authenticating {
            return Err(SessionError::AuthenticationInFlight);
        }

        let in_flight = InFlight::start(&mut self.authenticating);
        let token = self
            .session
            .authenticate(self.session_token.admission_number(), password, cancel)
            .await;
        in_flight.finish();

        self.session_token.authenticate(token?);
        info!("authenticated {}", self.admission_number());

        self.notify(|observer, student| observer.authenticated(student));
        Ok(())
    }

    /// Fetch the student's details, replacing any fetched before.
    pub async fn fetch_details(&mut self, cancel: &CancellationToken) -> Result<(), SessionError> {
        let config = self.session.config();
        let document = self
            .session
            .request(&self.session_token, &config.student_details_path, cancel)
            .await?;
        let details = parser::parse_student_details(&document, config.namespace())?;

        self.details = Some(details);
        self.notify(|observer, student| observer.details_loaded(student));
        Ok(())
    }

    /// Fetch the student's timetable, replacing any fetched before.
    pub async fn fetch_timetable(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        let config = self.session.config();
        let document = self
            .session
            .request(&self.session_token, &config.timetable_path, cancel)
            .await?;
        let sessions = parser::parse_timetable(&document, config.namespace())?;
        let timetable = Timetable::from_sessions(sessions);

        self.timetable = Some(timetable);
        self.notify(|observer, student| observer.timetable_loaded(student));
        Ok(())
    }

    /// Fetch details and timetable at the same time.
    ///
    /// Nothing is replaced unless both succeed.
    pub async fn fetch_all(&mut self, cancel: &CancellationToken) -> Result<(), SessionError> {
        let config = self.session.config();
        let (details, timetable) = futures::try_join!(
            self.session
                .request(&self.session_token, &config.student_details_path, cancel),
            self.session
                .request(&self.session_token, &config.timetable_path, cancel),
        )?;
        let details = parser::parse_student_details(&details, config.namespace())?;
        let sessions = parser::parse_timetable(&timetable, config.namespace())?;
        let timetable = Timetable::from_sessions(sessions);

        self.details = Some(details);
        self.timetable = Some(timetable);
        self.notify(|observer, student| observer.details_loaded(student));
        self.notify(|observer, student| observer.timetable_loaded(student));
        Ok(())
    }
}

/// Marks an authentication as running until finished or dropped.
struct InFlight<'a> {
    flag: &'a mut bool,
    finished: bool,
}

impl<'a> InFlight<'a> {
    fn start(flag: &'a mut bool) -> Self {
        *flag = true;
        Self {
            flag,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("authentication was abandoned before the server answered");
        }
        *self.flag = false;
    }
}
