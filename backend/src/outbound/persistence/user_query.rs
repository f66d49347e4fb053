//! User predicates for the document store.

use super::DocumentQuery;
use crate::domain::{User, UserFilter};

impl DocumentQuery<User> for UserFilter {
    fn matches(&self, user: &User) -> bool {
        self.id.as_ref().is_none_or(|id| &user.id == id)
            && self
                .username
                .as_deref()
                .is_none_or(|prefix| user.username.starts_with(prefix))
            && self.email.as_deref().is_none_or(|prefix| {
                user.email
                    .as_deref()
                    .is_some_and(|email| email.starts_with(prefix))
            })
            && self.phone.as_ref().is_none_or(|phone| &user.phone == phone)
            && self.date_of_birth.contains(user.date_of_birth.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::{fixture, rstest};

    #[fixture]
    fn grace() -> User {
        User {
            id: "u2".to_owned(),
            username: "grace.hopper".to_owned(),
            email: Some("grace@navy.mil".to_owned()),
            phone: "5550100".to_owned(),
            date_of_birth: Utc.with_ymd_and_hms(1906, 12, 9, 0, 0, 0).single(),
        }
    }

    #[rstest]
    fn empty_filter_matches_everything(grace: User) {
        assert!(UserFilter::default().matches(&grace));
    }

    #[rstest]
    #[case::exact_id(UserFilter { id: Some("u2".into()), ..UserFilter::default() }, true)]
    #[case::other_id(UserFilter { id: Some("u".into()), ..UserFilter::default() }, false)]
    #[case::username_prefix(UserFilter { username: Some("grace".into()), ..UserFilter::default() }, true)]
    #[case::email_prefix(UserFilter { email: Some("ada".into()), ..UserFilter::default() }, false)]
    #[case::exact_phone(UserFilter { phone: Some("5550100".into()), ..UserFilter::default() }, true)]
    fn string_predicates(grace: User, #[case] filter: UserFilter, #[case] expected: bool) {
        assert_eq!(filter.matches(&grace), expected);
    }

    #[rstest]
    fn birth_range_predicate(grace: User) {
        let mut filter = UserFilter::default();
        filter.date_of_birth.min = Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).single();
        filter.date_of_birth.max = Utc.with_ymd_and_hms(1910, 1, 1, 0, 0, 0).single();
        assert!(filter.matches(&grace));

        filter.date_of_birth.max = Utc.with_ymd_and_hms(1906, 12, 8, 0, 0, 0).single();
        assert!(!filter.matches(&grace));
    }
}
