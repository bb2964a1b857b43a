//! Engagement scorer.
//!
//! # Responsibility
//! - Turn a contact's interaction history and importance into a `[0, 1]`
//!   engagement score.
//!
//! # Invariants
//! - Stateless: the same inputs always yield the same score.
//! - Elapsed time is measured in whole calendar days; interactions dated after
//!   `as_of` count as zero days ago.
//! - Importance tilts the score between recency (`importance = 0`) and
//!   staleness (`importance = 1`).

use crate::config::EngineConfig;
use crate::model::contact::Contact;
use crate::model::interaction::Interaction;
use chrono::NaiveDate;

/// Score plus the intermediate values used to explain it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementScore {
    /// Recency decay in `[0, 1]`; 1 means "just talked".
    pub base: f64,
    /// Final blended score in `[0, 1]`.
    pub score: f64,
    /// Days since the latest interaction, `None` when there is none.
    pub days_since_last: Option<i64>,
}

/// Computes the engagement score for one contact.
///
/// Interactions belonging to other contacts are ignored.
pub fn score(
    contact: &Contact,
    interactions: &[Interaction],
    as_of: NaiveDate,
    config: &EngineConfig,
) -> f64 {
    score_detail(contact, interactions, as_of, config).score
}

/// Computes the engagement score together with its recency inputs.
pub fn score_detail(
    contact: &Contact,
    interactions: &[Interaction],
    as_of: NaiveDate,
    config: &EngineConfig,
) -> EngagementScore {
    let last_seen = interactions
        .iter()
        .filter(|interaction| interaction.contact_id == contact.id)
        .map(|interaction| interaction.occurred_at.date())
        .max();

    let (base, days_since_last) = match last_seen {
        Some(last_day) => {
            let days = days_between(last_day, as_of);
            (recency_decay(days, config.half_life_days), Some(days))
        }
        None => {
            let age = days_between(contact.created_on, as_of);
            let in_grace = age <= i64::from(config.new_contact_grace_days);
            (if in_grace { 1.0 } else { 0.0 }, None)
        }
    };

    EngagementScore {
        base,
        score: blend(base, contact.importance),
        days_since_last,
    }
}

/// `exp(-days / half_life)`.
pub fn recency_decay(days: i64, half_life_days: f64) -> f64 {
    (-(days as f64) / half_life_days).exp()
}

/// `base * (1 - importance) + (1 - base) * importance`, clamped to `[0, 1]`.
pub fn blend(base: f64, importance: f64) -> f64 {
    let importance = importance.clamp(0.0, 1.0);
    (base * (1.0 - importance) + (1.0 - base) * importance).clamp(0.0, 1.0)
}

fn days_between(earlier: NaiveDate, as_of: NaiveDate) -> i64 {
    (as_of - earlier).num_days().max(0)
}

#[cfg(test)]
mod tests {
    use super::{blend, recency_decay, score, score_detail};
    use crate::config::EngineConfig;
    use crate::model::contact::Contact;
    use crate::model::interaction::{Interaction, InteractionKind};
    use chrono::{Duration, NaiveDate};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn talked_on(contact: &Contact, on: NaiveDate) -> Interaction {
        Interaction::new(
            contact.id,
            on.and_hms_opt(18, 30, 0).unwrap(),
            InteractionKind::Call,
            "catch-up",
        )
    }

    #[test]
    fn important_recent_contact_has_low_urgency() {
        let as_of = day(2025, 6, 15);
        let mut contact = Contact::new("Ada", day(2024, 1, 1));
        contact.importance = 0.9;
        let history = vec![talked_on(&contact, as_of - Duration::days(5))];

        let detail = score_detail(&contact, &history, as_of, &EngineConfig::default());
        assert!((detail.base - 0.846).abs() < 1e-3);
        assert!((detail.score - 0.223).abs() < 2e-3);
        assert_eq!(detail.days_since_last, Some(5));
    }

    #[test]
    fn score_never_increases_with_elapsed_time_for_fixed_low_importance() {
        let as_of = day(2025, 6, 15);
        let config = EngineConfig::default();
        for importance in [0.0, 0.2, 0.5] {
            let mut contact = Contact::new("Ada", day(2020, 1, 1));
            contact.importance = importance;
            let mut previous = f64::INFINITY;
            for days in [0, 1, 5, 30, 90, 365] {
                let history = vec![talked_on(&contact, as_of - Duration::days(days))];
                let current = score(&contact, &history, as_of, &config);
                assert!(current <= previous + 1e-12);
                assert!((0.0..=1.0).contains(&current));
                previous = current;
            }
        }
    }

    #[test]
    fn latest_interaction_wins_and_foreign_rows_are_ignored() {
        let as_of = day(2025, 6, 15);
        let contact = Contact::new("Ada", day(2024, 1, 1));
        let stranger = Contact::new("Bob", day(2024, 1, 1));
        let history = vec![
            talked_on(&contact, day(2025, 1, 1)),
            talked_on(&contact, day(2025, 6, 5)),
            talked_on(&stranger, day(2025, 6, 14)),
        ];
        let detail = score_detail(&contact, &history, as_of, &EngineConfig::default());
        assert_eq!(detail.days_since_last, Some(10));
    }

    #[test]
    fn contacts_without_history_respect_grace_period() {
        let config = EngineConfig::default();
        let mut contact = Contact::new("New", day(2025, 6, 10));
        contact.importance = 1.0;

        let fresh = score_detail(&contact, &[], day(2025, 6, 15), &config);
        assert_eq!(fresh.base, 1.0);
        assert_eq!(fresh.score, 0.0);

        let stale = score_detail(&contact, &[], day(2025, 7, 15), &config);
        assert_eq!(stale.base, 0.0);
        assert_eq!(stale.score, 1.0);
    }

    #[test]
    fn future_interactions_count_as_today() {
        assert_eq!(recency_decay(0, 30.0), 1.0);
        let as_of = day(2025, 6, 15);
        let contact = Contact::new("Ada", day(2024, 1, 1));
        let history = vec![talked_on(&contact, day(2025, 7, 1))];
        let detail = score_detail(&contact, &history, as_of, &EngineConfig::default());
        assert_eq!(detail.days_since_last, Some(0));
    }

    #[test]
    fn blend_is_non_decreasing_in_importance_once_stale() {
        let base = recency_decay(60, 30.0);
        let mut previous = -1.0;
        for step in 0..=10 {
            let value = blend(base, f64::from(step) / 10.0);
            assert!(value >= previous);
            previous = value;
        }
    }
}
