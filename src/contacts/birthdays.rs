use time::{Date, Month};

use super::repo_types::Contact;

pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// The birthday's anniversary in `year`. Feb 29 falls back to Feb 28 in common years.
fn anniversary(birthday: Date, year: i32) -> Option<Date> {
    Date::from_calendar_date(year, birthday.month(), birthday.day())
        .or_else(|_| Date::from_calendar_date(year, Month::February, 28))
        .ok()
}

/// Days from `today` to the next anniversary of `birthday` (0 when it is today).
pub fn days_until(birthday: Date, today: Date) -> Option<i64> {
    let this_year = anniversary(birthday, today.year())?;
    let next = if this_year >= today {
        this_year
    } else {
        anniversary(birthday, today.year() + 1)?
    };
    Some((next - today).whole_days())
}

/// Contacts whose birthday falls in `[today, today + window_days)`, soonest first.
pub fn upcoming(contacts: Vec<Contact>, today: Date, window_days: i64) -> Vec<Contact> {
    let mut hits: Vec<(i64, Contact)> = contacts
        .into_iter()
        .filter_map(|c| {
            let days = days_until(c.birthday?, today)?;
            (days < window_days).then_some((days, c))
        })
        .collect();
    hits.sort_by_key(|(days, _)| *days);
    hits.into_iter().map(|(_, c)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::date, OffsetDateTime};
    use uuid::Uuid;

    fn contact(name: &str, birthday: Option<Date>) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            first_name: name.into(),
            last_name: "Test".into(),
            email: format!("{name}@x.com"),
            phone_number: "1".into(),
            birthday,
            additional_data: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn today_counts_as_zero_days() {
        assert_eq!(days_until(date!(1990 - 06 - 15), date!(2026 - 06 - 15)), Some(0));
    }

    #[test]
    fn passed_birthday_rolls_to_next_year() {
        assert_eq!(days_until(date!(1990 - 06 - 14), date!(2026 - 06 - 15)), Some(364));
    }

    #[test]
    fn window_wraps_year_end() {
        assert_eq!(days_until(date!(1990 - 01 - 02), date!(2026 - 12 - 30)), Some(3));
    }

    #[test]
    fn leap_day_birthdays_use_feb_28_in_common_years() {
        assert_eq!(days_until(date!(2000 - 02 - 29), date!(2027 - 02 - 27)), Some(1));
        assert_eq!(days_until(date!(2000 - 02 - 29), date!(2028 - 02 - 27)), Some(2));
    }

    #[test]
    fn upcoming_filters_and_sorts() {
        let today = date!(2026 - 12 - 28);
        let contacts = vec![
            contact("later", Some(date!(1980 - 01 - 03))),
            contact("soon", Some(date!(1985 - 12 - 29))),
            contact("outside", Some(date!(1985 - 01 - 04))),
            contact("none", None),
            contact("past", Some(date!(1985 - 12 - 27))),
        ];
        let names: Vec<_> = upcoming(contacts, today, DEFAULT_WINDOW_DAYS)
            .into_iter()
            .map(|c| c.first_name)
            .collect();
        assert_eq!(names, vec!["soon", "later"]);
    }
}
