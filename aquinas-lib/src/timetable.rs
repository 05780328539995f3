//! Weekly timetable model.

use std::{borrow::Cow, collections::HashMap, fmt, ops::Index};

use chrono::{Datelike, NaiveDate, Weekday};
use log::debug;
#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

use crate::parser::TimetableSession;

/// Label the registration slot is stored under.
pub const REGISTRATION: &str = "Registration";
/// Raw label the server uses for the registration slot.
const RAW_REGISTRATION: &str = "2R";

static EMPTY_LESSON: Lesson = Lesson::EMPTY;

/// Map a raw period label to the key it is stored under.
pub fn canonical_period(raw: &str) -> &str {
    if raw == RAW_REGISTRATION {
        REGISTRATION
    } else {
        raw
    }
}

/// A lesson to be attended by a student, or a free period.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct Lesson {
    class_code: Cow<'static, str>,
    description: Cow<'static, str>,
    room: Cow<'static, str>,
    tutor: Cow<'static, str>,
    period: Cow<'static, str>,
    free: bool,
}

impl Lesson {
    /// A free period (lunch, study, etc.)
    pub const EMPTY: Lesson = Lesson {
        class_code: Cow::Borrowed("-"),
        description: Cow::Borrowed("Free"),
        room: Cow::Borrowed("-"),
        tutor: Cow::Borrowed("-"),
        period: Cow::Borrowed("-"),
        free: true,
    };

    /// Only the part of `description` before the first `;` is kept, the rest is metadata.
    pub fn new(
        class_code: impl Into<String>,
        description: &str,
        room: impl Into<String>,
        tutor: impl Into<String>,
    ) -> Self {
        let description = description.split(';').next().unwrap_or_default();
        Self {
            class_code: Cow::Owned(class_code.into()),
            description: Cow::Owned(description.to_owned()),
            room: Cow::Owned(room.into()),
            tutor: Cow::Owned(tutor.into()),
            period: Cow::Borrowed(""),
            free: false,
        }
    }

    /// Class code, in the format XX-XX-XX-XX.
    pub fn class_code(&self) -> &str {
        &self.class_code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn tutor(&self) -> &str {
        &self.tutor
    }

    /// Canonical label of the period this lesson is stored under, empty until it is added to a
    /// [`WeekSchedule`](WeekSchedule).
    pub fn period(&self) -> &str {
        &self.period
    }

    pub fn is_free(&self) -> bool {
        self.free
    }
}

impl Default for Lesson {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for Lesson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.free {
            f.write_str("Free")
        } else {
            write!(f, "{} with {} in {}", self.description, self.tutor, self.room)
        }
    }
}

/// The lessons of a single day, keyed by period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct WeekSchedule {
    lessons: HashMap<String, Lesson>,
}

impl WeekSchedule {
    /// Lesson in `period`, or [`Lesson::EMPTY`](Lesson::EMPTY) if nothing is scheduled.
    pub fn get(&self, period: &str) -> &Lesson {
        self.lessons.get(period).unwrap_or(&EMPTY_LESSON)
    }

    /// Lesson in a numbered period (e.g. `period(3)`).
    pub fn period(&self, number: u8) -> &Lesson {
        self.get(&number.to_string())
    }

    pub fn registration(&self) -> &Lesson {
        self.get(REGISTRATION)
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    /// Scheduled lessons in the order they happen during the day.
    ///
    /// Numbered periods come in order with registration after the second, unknown labels last.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> + '_ {
        let mut lessons: Vec<_> = self.lessons.iter().collect();
        lessons.sort_by(|(a, _), (b, _)| period_rank(a).cmp(&period_rank(b)));
        lessons.into_iter().map(|(_, lesson)| lesson)
    }

    /// Store `lesson` under the canonical form of `period`, replacing whatever was there.
    pub(crate) fn insert(&mut self, period: &str, mut lesson: Lesson) -> Option<Lesson> {
        let period = canonical_period(period);
        lesson.period = Cow::Owned(period.to_owned());
        self.lessons.insert(period.to_owned(), lesson)
    }
}

fn period_rank(period: &str) -> (u8, &str) {
    match period {
        "1" => (1, ""),
        "2" => (2, ""),
        REGISTRATION => (3, ""),
        _ => match period.parse::<u8>() {
            Ok(number @ 3..=8) => (number + 1, ""),
            _ => (u8::MAX, period),
        },
    }
}

/// A day the college is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub enum SchoolDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl SchoolDay {
    pub const ALL: [SchoolDay; 5] = [
        SchoolDay::Monday,
        SchoolDay::Tuesday,
        SchoolDay::Wednesday,
        SchoolDay::Thursday,
        SchoolDay::Friday,
    ];

    /// Day from the index used by the API, where 0 is Sunday and 6 is Saturday.
    pub fn from_day_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(SchoolDay::Monday),
            2 => Some(SchoolDay::Tuesday),
            3 => Some(SchoolDay::Wednesday),
            4 => Some(SchoolDay::Thursday),
            5 => Some(SchoolDay::Friday),
            _ => None,
        }
    }

    fn offset(self) -> usize {
        self as usize
    }
}

impl TryFrom<Weekday> for SchoolDay {
    type Error = Weekday;

    fn try_from(weekday: Weekday) -> Result<Self, Self::Error> {
        // `num_days_from_sunday` matches the API's indexing
        u8::try_from(weekday.num_days_from_sunday())
            .ok()
            .and_then(SchoolDay::from_day_index)
            .ok_or(weekday)
    }
}

impl From<SchoolDay> for Weekday {
    fn from(day: SchoolDay) -> Self {
        match day {
            SchoolDay::Monday => Weekday::Mon,
            SchoolDay::Tuesday => Weekday::Tue,
            SchoolDay::Wednesday => Weekday::Wed,
            SchoolDay::Thursday => Weekday::Thu,
            SchoolDay::Friday => Weekday::Fri,
        }
    }
}

impl fmt::Display for SchoolDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SchoolDay::Monday => "Monday",
                SchoolDay::Tuesday => "Tuesday",
                SchoolDay::Wednesday => "Wednesday",
                SchoolDay::Thursday => "Thursday",
                SchoolDay::Friday => "Friday",
            }
        )
    }
}

/// A student's Monday to Friday timetable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct Timetable {
    days: [WeekSchedule; 5],
}

impl Timetable {
    /// Build a timetable from the sessions returned by the API.
    ///
    /// A later session for the same day and period replaces an earlier one.
    pub fn from_sessions(sessions: impl IntoIterator<Item = TimetableSession>) -> Self {
        let mut timetable = Self::default();
        for session in sessions {
            let day = session.day;
            let period = session.period.clone();
            let replaced = timetable.days[day.offset()].insert(&period, session.into_lesson());
            if let Some(replaced) = replaced {
                debug!(
                    "{day} period {} was listed twice, dropping `{}`",
                    replaced.period(),
                    replaced.class_code()
                );
            }
        }
        timetable
    }

    pub fn day(&self, day: SchoolDay) -> &WeekSchedule {
        &self.days[day.offset()]
    }

    /// Schedule for any day of the week, `None` on weekends.
    pub fn on(&self, weekday: Weekday) -> Option<&WeekSchedule> {
        SchoolDay::try_from(weekday).ok().map(|day| self.day(day))
    }

    pub fn on_date(&self, date: NaiveDate) -> Option<&WeekSchedule> {
        self.on(date.weekday())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SchoolDay, &WeekSchedule)> + '_ {
        SchoolDay::ALL.into_iter().map(|day| (day, self.day(day)))
    }
}

impl Index<SchoolDay> for Timetable {
    type Output = WeekSchedule;

    fn index(&self, day: SchoolDay) -> &Self::Output {
        self.day(day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(day: SchoolDay, period: &str, class_code: &str) -> TimetableSession {
        TimetableSession {
            day,
            period: period.to_owned(),
            class_code: class_code.to_owned(),
            description: format!("{class_code} lesson;meta"),
            room: "R1".to_owned(),
            tutor: "Mr Smith".to_owned(),
        }
    }

    #[test]
    fn absent_periods_are_free() {
        let schedule = WeekSchedule::default();
        for period in ["1", "Registration", "2R", "", "lunch"] {
            let lesson = schedule.get(period);
            assert!(lesson.is_free());
            assert_eq!(lesson, &Lesson::EMPTY);
        }
        assert_eq!(Lesson::EMPTY.class_code(), "-");
        assert_eq!(Lesson::EMPTY.description(), "Free");
        assert_eq!(Lesson::EMPTY.room(), "-");
        assert_eq!(Lesson::EMPTY.tutor(), "-");
        assert_eq!(Lesson::EMPTY.period(), "-");
        assert_eq!(Lesson::EMPTY.to_string(), "Free");
    }

    #[test]
    fn registration_replaces_raw_label() {
        let mut schedule = WeekSchedule::default();
        schedule.insert("2R", Lesson::new("RG-01", "Registration", "A1", "Ms Jones"));

        assert_eq!(schedule.get("Registration").class_code(), "RG-01");
        assert_eq!(schedule.registration().period(), "Registration");
        assert!(schedule.get("2R").is_free());
        assert_eq!(schedule.len(), 1);
    }

    #[test]
    fn description_keeps_first_segment() {
        let lesson = Lesson::new("MA-01", "Maths Revision;internal-code-7", "B2", "Dr Who");
        assert_eq!(lesson.description(), "Maths Revision");
        assert_eq!(Lesson::new("X", "", "", "").description(), "");
        assert_eq!(Lesson::new("X", "No metadata", "", "").description(), "No metadata");
        assert_eq!(lesson.to_string(), "Maths Revision with Dr Who in B2");
    }

    #[test]
    fn last_duplicate_wins() {
        let timetable = Timetable::from_sessions([
            session(SchoolDay::Monday, "3", "FIRST"),
            session(SchoolDay::Monday, "3", "SECOND"),
        ]);
        let monday = timetable.day(SchoolDay::Monday);
        assert_eq!(monday.period(3).class_code(), "SECOND");
        assert_eq!(monday.len(), 1);
        assert!(timetable.day(SchoolDay::Tuesday).is_empty());
    }

    #[test]
    fn lessons_follow_the_school_day() {
        let timetable = Timetable::from_sessions([
            session(SchoolDay::Friday, "8", "H"),
            session(SchoolDay::Friday, "Enrichment", "Z"),
            session(SchoolDay::Friday, "3", "C"),
            session(SchoolDay::Friday, "2R", "R"),
            session(SchoolDay::Friday, "1", "A"),
            session(SchoolDay::Friday, "2", "B"),
        ]);
        let codes: Vec<_> = timetable[SchoolDay::Friday]
            .lessons()
            .map(Lesson::class_code)
            .collect();
        assert_eq!(codes, ["A", "B", "R", "C", "H", "Z"]);
    }

    #[test]
    fn weekends_have_no_schedule() {
        let timetable = Timetable::from_sessions([session(SchoolDay::Wednesday, "1", "W")]);
        assert!(timetable.on(Weekday::Sat).is_none());
        assert!(timetable.on(Weekday::Sun).is_none());
        // 2024-01-03 was a Wednesday
        let wednesday = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(
            timetable.on_date(wednesday).unwrap().period(1).class_code(),
            "W"
        );
    }

    #[test]
    fn day_index_counts_from_sunday() {
        assert_eq!(SchoolDay::from_day_index(0), None);
        assert_eq!(SchoolDay::from_day_index(1), Some(SchoolDay::Monday));
        assert_eq!(SchoolDay::from_day_index(5), Some(SchoolDay::Friday));
        assert_eq!(SchoolDay::from_day_index(6), None);
        for day in SchoolDay::ALL {
            assert_eq!(SchoolDay::try_from(Weekday::from(day)), Ok(day));
        }
    }
}
