// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp::Reverse;

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta};
use chrono_tz::Tz;

use crate::store::{Episode, localize};

/// How far back a released episode stays in the feed
pub const DISPLAY_WINDOW_DAYS: i64 = 90;

/// A recurring episode is rolled forward until it is at most this old
pub const RECURRENCE_HORIZON_DAYS: i64 = 365;

/// Upper bound on items in one feed document
pub const MAX_FEED_ITEMS: usize = 100;

/// An episode chosen for the feed, with the date it is published under
#[derive(Debug, Clone, Copy)]
pub struct VisibleEpisode<'a> {
    pub episode: &'a Episode,
    pub effective_date: DateTime<Tz>,
}

/// Pick the episodes that belong in the feed at `now`, newest first.
///
/// An episode is visible when its effective date lies within the last
/// [`DISPLAY_WINDOW_DAYS`] days or when it is an explicitly scheduled future
/// release. Recurring episodes are published under their latest anniversary;
/// an anniversary that has not arrived yet is left out. At most
/// [`MAX_FEED_ITEMS`] episodes are returned.
pub fn select_visible(episodes: &[Episode], now: DateTime<Tz>) -> Vec<VisibleEpisode<'_>> {
    let window_start = now - TimeDelta::days(DISPLAY_WINDOW_DAYS);

    let mut visible: Vec<VisibleEpisode<'_>> = episodes
        .iter()
        .filter_map(|episode| {
            let effective_date = effective_release(episode, now)?;
            (effective_date > now || effective_date >= window_start).then_some(VisibleEpisode {
                episode,
                effective_date,
            })
        })
        .collect();

    visible.sort_by_key(|v| Reverse((v.effective_date, v.episode.id)));
    visible.truncate(MAX_FEED_ITEMS);
    visible
}

/// The date an episode is published under at `now`, in `now`'s zone.
///
/// `None` means a recurring episode whose next anniversary is still ahead.
pub fn effective_release(episode: &Episode, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let release = episode.release_date.with_timezone(&now.timezone());
    if !episode.is_recurring || release > now {
        return Some(release);
    }

    let horizon = now - TimeDelta::days(RECURRENCE_HORIZON_DAYS);
    if release >= horizon {
        return Some(release);
    }

    let rolled = roll_recurring(release, horizon);
    (rolled <= now).then_some(rolled)
}

/// Move `release` forward by the fewest whole years that bring it to or past `horizon`.
///
/// Requires `release < horizon`. Each candidate is computed from the original
/// date, so Feb 29 becomes Feb 28 only in non-leap target years.
pub fn roll_recurring(release: DateTime<Tz>, horizon: DateTime<Tz>) -> DateTime<Tz> {
    // A date in an earlier calendar year is always before the horizon, so the
    // answer is in the horizon's year or the one after it.
    let years = horizon.year() - release.year();
    let candidate = shift_years(release, years);
    if candidate >= horizon {
        candidate
    } else {
        shift_years(release, years + 1)
    }
}

/// Same wall-clock date and time, `years` later
fn shift_years(dt: DateTime<Tz>, years: i32) -> DateTime<Tz> {
    let local = dt.naive_local();
    let year = local.year() + years;

    let Some(date) = NaiveDate::from_ymd_opt(year, local.month(), local.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, local.month(), 28))
    else {
        return dt;
    };

    localize(dt.timezone(), date.and_time(local.time()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike, Utc};
    use chrono_tz::America::Los_Angeles;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Tz> {
        let naive = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap();
        localize(Los_Angeles, naive)
    }

    fn episode(id: i64, release: DateTime<Tz>, is_recurring: bool) -> Episode {
        Episode {
            id,
            title: format!("Episode {id}"),
            description: None,
            audio_url: format!("https://example.com/{id}.mp3"),
            release_date: release.with_timezone(&Utc),
            is_recurring,
            created_at: release.with_timezone(&Utc),
        }
    }

    fn ids(visible: &[VisibleEpisode<'_>]) -> Vec<i64> {
        visible.iter().map(|v| v.episode.id).collect()
    }

    #[test]
    fn window_excludes_old_and_keeps_recent_and_future() {
        let now = at(2025, 6, 1, 12);
        let episodes = vec![
            episode(1, at(2025, 3, 1, 12), false),
            episode(2, at(2025, 4, 1, 12), false),
            episode(3, at(2025, 7, 1, 12), false),
        ];

        let visible = select_visible(&episodes, now);

        assert_eq!(ids(&visible), vec![3, 2]);
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let now = at(2025, 6, 1, 12);
        let exactly_90 = now - TimeDelta::days(90);
        let episodes = vec![episode(1, exactly_90, false)];

        assert_eq!(ids(&select_visible(&episodes, now)), vec![1]);
    }

    #[test]
    fn recurring_episode_rolls_to_latest_anniversary() {
        let now = at(2025, 6, 1, 12);
        let ep = episode(1, at(2023, 6, 15, 9), true);

        let effective = effective_release(&ep, now).unwrap();

        assert_eq!(effective.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(effective.hour(), 9);
        assert!(effective <= now);
        assert!(now - effective <= TimeDelta::days(RECURRENCE_HORIZON_DAYS));
        // 351 days old, so outside the display window
        assert!(select_visible(std::slice::from_ref(&ep), now).is_empty());
    }

    #[test]
    fn recurring_episode_reappears_on_its_anniversary() {
        let now = at(2025, 6, 1, 12);
        let episodes = vec![episode(1, at(2022, 5, 20, 8), true)];

        let visible = select_visible(&episodes, now);

        assert_eq!(visible.len(), 1);
        assert_eq!(
            visible[0].effective_date.date_naive(),
            NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()
        );
    }

    #[test]
    fn recurring_within_a_year_is_not_rolled() {
        let now = at(2025, 6, 1, 12);
        let ep = episode(1, at(2025, 5, 1, 12), true);
        assert_eq!(effective_release(&ep, now), Some(at(2025, 5, 1, 12)));
    }

    #[test]
    fn recurring_future_release_is_kept_as_scheduled() {
        let now = at(2025, 6, 1, 12);
        let episodes = vec![episode(1, at(2025, 8, 1, 12), true)];
        assert_eq!(ids(&select_visible(&episodes, now)), vec![1]);
    }

    #[test]
    fn rolled_anniversary_not_yet_due_is_excluded() {
        // 2024 is a leap year, so one year after the horizon lands after now.
        let now = at(2024, 3, 1, 12);
        let ep = episode(1, at(2022, 3, 1, 18), true);

        assert_eq!(effective_release(&ep, now), None);
        assert!(select_visible(std::slice::from_ref(&ep), now).is_empty());
    }

    #[test]
    fn leap_day_rolls_to_feb_28_in_common_years() {
        let now = at(2025, 3, 10, 12);
        let ep = episode(1, at(2020, 2, 29, 10), true);

        let effective = effective_release(&ep, now).unwrap();

        assert_eq!(effective.date_naive(), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn leap_day_returns_to_feb_29_in_leap_years() {
        let now = at(2028, 3, 10, 12);
        let ep = episode(1, at(2020, 2, 29, 10), true);

        let effective = effective_release(&ep, now).unwrap();

        assert_eq!(effective.date_naive(), NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());
    }

    #[test]
    fn far_past_recurring_rolls_without_iteration_cap() {
        let now = at(2025, 6, 1, 12);
        let ep = episode(1, at(1975, 5, 31, 12), true);

        let effective = effective_release(&ep, now).unwrap();

        assert_eq!(effective, at(2025, 5, 31, 12));
    }

    #[test]
    fn result_is_sorted_newest_first() {
        let now = at(2025, 6, 1, 12);
        let episodes = vec![
            episode(1, at(2025, 5, 1, 12), false),
            episode(2, at(2025, 5, 20, 12), false),
            episode(3, at(2025, 12, 1, 12), false),
            episode(4, at(2024, 5, 25, 12), true),
        ];

        let visible = select_visible(&episodes, now);

        assert_eq!(ids(&visible), vec![3, 4, 2, 1]);
    }

    #[test]
    fn result_is_capped_at_the_most_recent_hundred() {
        let now = at(2025, 6, 1, 12);
        let episodes: Vec<Episode> = (0..150)
            .map(|i| episode(i, now - TimeDelta::hours(12 * i), false))
            .collect();

        let visible = select_visible(&episodes, now);

        assert_eq!(visible.len(), MAX_FEED_ITEMS);
        assert_eq!(ids(&visible), (0..100).collect::<Vec<_>>());
    }
}
