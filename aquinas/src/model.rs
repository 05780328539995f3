use aquinas_lib::{Lesson, SchoolDay, Student, StudentIdentity, Timetable, WeekSchedule};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StudentModel {
    pub admission_number: String,
    // serialized through `aquinas_lib`'s `serde_support` feature
    pub details: Option<StudentIdentity>,
    pub timetable: Option<Vec<DayModel>>,
}

#[derive(Debug, Serialize)]
pub struct DayModel {
    pub day: SchoolDay,
    pub lessons: Vec<LessonModel>,
}

#[derive(Debug, Serialize)]
pub struct LessonModel {
    pub period: String,
    pub class_code: String,
    pub description: String,
    pub room: String,
    pub tutor: String,
}

impl StudentModel {
    /// Model of everything `student` fetched, with the timetable limited to `only` if given.
    pub fn new<T>(student: &Student<T>, only: Option<NaiveDate>) -> Self {
        StudentModel {
            admission_number: student.admission_number().to_string(),
            details: student.details().cloned(),
            timetable: student.timetable().map(|timetable| days(timetable, only)),
        }
    }
}

fn days(timetable: &Timetable, only: Option<NaiveDate>) -> Vec<DayModel> {
    // weekends match no day and leave the timetable empty
    let only = only.map(|date| SchoolDay::try_from(date.weekday()).ok());
    timetable
        .iter()
        .filter(|(day, _)| only.map_or(true, |only| only == Some(*day)))
        .map(|(day, schedule)| DayModel::new(day, schedule))
        .collect()
}

impl DayModel {
    fn new(day: SchoolDay, schedule: &WeekSchedule) -> Self {
        DayModel {
            day,
            lessons: schedule.lessons().map(LessonModel::from).collect(),
        }
    }
}

impl From<&Lesson> for LessonModel {
    fn from(lesson: &Lesson) -> Self {
        LessonModel {
            period: lesson.period().to_owned(),
            class_code: lesson.class_code().to_owned(),
            description: lesson.description().to_owned(),
            room: lesson.room().to_owned(),
            tutor: lesson.tutor().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use aquinas_lib::TimetableSession;

    use super::*;

    fn timetable() -> Timetable {
        Timetable::from_sessions([SchoolDay::Monday, SchoolDay::Tuesday].map(|day| {
            TimetableSession {
                day,
                period: "2R".to_owned(),
                class_code: format!("{day}"),
                description: "Registration;RG".to_owned(),
                room: "A1".to_owned(),
                tutor: "Ms Jones".to_owned(),
            }
        }))
    }

    #[test]
    fn days_cover_the_week() {
        let days = days(&timetable(), None);
        assert_eq!(days.len(), 5);
        assert_eq!(days[0].lessons[0].period, "Registration");
        assert_eq!(days[0].lessons[0].description, "Registration");
        assert!(days[4].lessons.is_empty());
    }

    #[test]
    fn only_keeps_the_matching_day() {
        // 2024-01-02 was a Tuesday, 2024-01-06 a Saturday
        let tuesday = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let days_on_tuesday = days(&timetable(), Some(tuesday));
        assert_eq!(days_on_tuesday.len(), 1);
        assert_eq!(days_on_tuesday[0].day, SchoolDay::Tuesday);
        assert_eq!(days_on_tuesday[0].lessons[0].class_code, "Tuesday");

        let saturday = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        assert!(days(&timetable(), Some(saturday)).is_empty());
    }
}
