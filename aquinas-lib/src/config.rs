use std::time::Duration;

#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://www.my.aquinas.ac.uk/MobileAPI/api/";
const NAMESPACE: &str = "http://schemas.datacontract.org/2004/07/Aquinas.Api";
const TOKEN_HEADER: &str = "AuthToken";
const TIMEOUT: Duration = Duration::from_secs(30);

/// Path of the token-issuing endpoint.
pub const AUTHENTICATE_PATH: &str = "Student/Authenticate";
/// Path of the basic student details endpoint.
pub const GET_STUDENT_DETAILS: &str = "Student/GetStudentDetails";
/// Path of the weekly timetable endpoint.
pub const GET_TIMETABLE: &str = "Student/GetTimetable";

/// Where and how to talk to the API.
///
/// Defaults to the production MyAquinas service.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde_support", serde(default))]
pub struct ApiConfig {
    /// Prefix every endpoint path is appended to, including the trailing slash.
    pub base_url: String,
    /// XML namespace the response elements live in. Empty for unqualified documents.
    pub namespace: String,
    pub authenticate_path: String,
    pub student_details_path: String,
    pub timetable_path: String,
    /// Request header carrying the session token.
    pub token_header: String,
    /// Upper bound on a single request/response exchange, body included.
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Namespace to match elements against, `None` for unqualified documents.
    pub(crate) fn namespace(&self) -> Option<&str> {
        Some(self.namespace.as_str()).filter(|namespace| !namespace.is_empty())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_owned(),
            namespace: NAMESPACE.to_owned(),
            authenticate_path: AUTHENTICATE_PATH.to_owned(),
            student_details_path: GET_STUDENT_DETAILS.to_owned(),
            timetable_path: GET_TIMETABLE.to_owned(),
            token_header: TOKEN_HEADER.to_owned(),
            timeout: TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let config = ApiConfig::default().with_base_url("http://localhost/api/");
        assert_eq!(
            config.url(GET_STUDENT_DETAILS),
            "http://localhost/api/Student/GetStudentDetails"
        );
    }

    #[test]
    fn empty_namespace_is_unqualified() {
        assert_eq!(ApiConfig::default().with_namespace("").namespace(), None);
        assert_eq!(ApiConfig::default().namespace(), Some(NAMESPACE));
    }
}
