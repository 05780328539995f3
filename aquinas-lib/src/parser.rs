use std::str;

#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    session::Token,
    timetable::{Lesson, SchoolDay},
    xml::{Element, XmlDocument},
};

const TOKEN_TAG: &str = "Token";

const STUDENT_DETAILS_TAG: &str = "StudentDetails";
const CHOSEN_NAME_TAG: &str = "ChosenName";
const FORENAME_TAG: &str = "Forename";
const SURNAME_TAG: &str = "Surname";

const TIMETABLE_TAG: &str = "ArrayOfTimetableSession";
const SESSION_TAG: &str = "TimetableSession";
const DAY_TAG: &str = "Day";
const PERIOD_TAG: &str = "Period";
const CLASS_CODE_TAG: &str = "ClassCode";
const DESCRIPTION_TAG: &str = "Description";
const ROOM_TAG: &str = "Room";
const TUTOR_TAG: &str = "Tutor";

/// Basic details of a student.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct StudentIdentity {
    /// The chosen name the student goes by.
    pub first_name: String,
    pub forenames: String,
    pub surname: String,
    /// Forenames and surname separated by a single space.
    pub full_name: String,
}

/// One entry of the timetable as served by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableSession {
    pub day: SchoolDay,
    /// Raw period label, before `2R` is mapped to registration.
    pub period: String,
    pub class_code: String,
    pub description: String,
    pub room: String,
    pub tutor: String,
}

impl TimetableSession {
    pub fn into_lesson(self) -> Lesson {
        Lesson::new(self.class_code, &self.description, self.room, self.tutor)
    }
}

/// Extract the session token from an authentication response.
///
/// The token may either be the document element or a direct child of it.
pub fn parse_token(document: &XmlDocument, namespace: Option<&str>) -> Result<Token, ParseError> {
    let root = document.root();
    let element = if root.is(namespace, TOKEN_TAG) {
        root
    } else {
        root.child(namespace, TOKEN_TAG)
            .ok_or(ParseError::MissingToken)?
    };

    let token = element.text().trim();
    if token.is_empty() {
        return Err(ParseError::MissingToken);
    }
    Ok(Token::new(token))
}

/// Read the student details document.
///
/// Every field is required, a single missing one fails the whole document.
pub fn parse_student_details(
    document: &XmlDocument,
    namespace: Option<&str>,
) -> Result<StudentIdentity, ParseError> {
    let details = expect_root(document, namespace, STUDENT_DETAILS_TAG)?;

    let first_name = field(details, namespace, CHOSEN_NAME_TAG)?.trim().to_owned();
    let forenames = field(details, namespace, FORENAME_TAG)?.trim().to_owned();
    let surname = field(details, namespace, SURNAME_TAG)?.trim().to_owned();
    let full_name = format!("{forenames} {surname}");

    Ok(StudentIdentity {
        first_name,
        forenames,
        surname,
        full_name,
    })
}

/// Read every session of the timetable document, in document order.
pub fn parse_timetable(
    document: &XmlDocument,
    namespace: Option<&str>,
) -> Result<Vec<TimetableSession>, ParseError> {
    expect_root(document, namespace, TIMETABLE_TAG)?
        .children_named(namespace, SESSION_TAG)
        .map(|session| parse_session(session, namespace))
        .collect()
}

fn parse_session(
    session: &Element,
    namespace: Option<&str>,
) -> Result<TimetableSession, ParseError> {
    let day = field(session, namespace, DAY_TAG)?.trim();
    let day = day
        .parse()
        .ok()
        .and_then(SchoolDay::from_day_index)
        .ok_or_else(|| ParseError::InvalidDay {
            given: day.to_owned(),
        })?;

    Ok(TimetableSession {
        day,
        period: field(session, namespace, PERIOD_TAG)?.to_owned(),
        class_code: field(session, namespace, CLASS_CODE_TAG)?.to_owned(),
        description: field(session, namespace, DESCRIPTION_TAG)?.to_owned(),
        room: field(session, namespace, ROOM_TAG)?.to_owned(),
        tutor: field(session, namespace, TUTOR_TAG)?.to_owned(),
    })
}

fn expect_root<'a>(
    document: &'a XmlDocument,
    namespace: Option<&str>,
    name: &'static str,
) -> Result<&'a Element, ParseError> {
    let root = document.root();
    if root.is(namespace, name) {
        Ok(root)
    } else {
        Err(ParseError::MissingRoot { expected: name })
    }
}

fn field<'a>(
    parent: &'a Element,
    namespace: Option<&str>,
    name: &'static str,
) -> Result<&'a str, ParseError> {
    parent
        .child(namespace, name)
        .map(Element::text)
        .ok_or(ParseError::MissingField { field: name })
}

/// Errors for a response that does not look like what the API promises.
///
/// Every variant means the response is malformed and none of it should be trusted.
#[derive(Debug, Error)]
pub enum ParseError {
    /// XML is not in a valid format.
    #[error("could not parse XML due to invalid format")]
    InvalidXml(#[from] quick_xml::Error),
    /// XML is not valid Utf-8.
    #[error("could not parse XML due to invalid Utf-8 encoding")]
    InvalidUtf8(#[from] str::Utf8Error),
    #[error("XML uses undeclared namespace prefix `{0}`")]
    UnknownPrefix(String),
    #[error("XML document has no root element")]
    EmptyDocument,
    #[error("XML document has more than one root element")]
    MultipleRoots,
    #[error("XML document ended inside an element")]
    UnclosedElement,
    /// The document element is not the one expected for this resource.
    #[error("unexpected document structure, expected root element `{expected}`")]
    MissingRoot { expected: &'static str },
    #[error("field not present: `{field}`")]
    MissingField { field: &'static str },
    #[error("authentication response did not contain a token")]
    MissingToken,
    /// Sessions may only fall on Monday (1) to Friday (5).
    #[error("`{given}` is not a valid college day")]
    InvalidDay { given: String },
}
