//! Holiday calendar of known traffic disruptions.
//!
//! The table is static and shared read-only for the lifetime of the process.
//! Only the effect window is configurable: some analyses treat an update as a
//! one-day shock, others let it bleed into the following two weeks.

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Revision of the update table (date of the newest entry).
pub const CALENDAR_VERSION: &str = "2024-03";

/// Holiday name shared by every entry of the table.
pub const GOOGLE_UPDATE: &str = "Google Update";

/// Confirmed Google core/algorithm update dates, 2015-2024.
const GOOGLE_UPDATE_DATES: [(i32, u32, u32); 25] = [
    (2015, 7, 17),
    (2016, 1, 8),
    (2016, 9, 27),
    (2017, 3, 8),
    (2017, 7, 9),
    (2018, 3, 8),
    (2018, 4, 17),
    (2018, 8, 1),
    (2019, 3, 12),
    (2019, 6, 3),
    (2019, 9, 24),
    (2019, 10, 25),
    (2019, 12, 9),
    (2020, 1, 13),
    (2020, 5, 4),
    (2020, 12, 3),
    (2021, 6, 2),
    (2021, 7, 1),
    (2021, 11, 17),
    (2022, 5, 25),
    (2023, 9, 15),
    (2023, 10, 5),
    (2023, 11, 2),
    (2023, 11, 8),
    (2024, 3, 5),
];

static GOOGLE_UPDATES: LazyLock<Vec<HolidayEvent>> = LazyLock::new(|| {
    GOOGLE_UPDATE_DATES
        .iter()
        .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
        .map(|date| HolidayEvent {
            name: GOOGLE_UPDATE,
            date,
            window: EffectWindow::default(),
        })
        .collect()
});

/// Days around an event over which its effect is modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectWindow {
    pub days_before: u32,
    pub days_after: u32,
}

impl EffectWindow {
    /// Offsets (in days, relative to the event date) covered by the window.
    pub fn offsets(self) -> RangeInclusive<i64> {
        -i64::from(self.days_before)..=i64::from(self.days_after)
    }
}

impl Default for EffectWindow {
    fn default() -> Self {
        Self {
            days_before: 0,
            days_after: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HolidayEvent {
    pub name: &'static str,
    pub date: NaiveDate,
    pub window: EffectWindow,
}

/// The static update table with the default `[0, 1]` window.
pub fn holiday_events() -> &'static [HolidayEvent] {
    &GOOGLE_UPDATES
}

/// Holiday table with a configured effect window, injected into the forecast adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct HolidayCalendar {
    events: Vec<HolidayEvent>,
    window: EffectWindow,
}

impl HolidayCalendar {
    pub fn google_updates(window: EffectWindow) -> Self {
        let events = holiday_events()
            .iter()
            .map(|e| HolidayEvent { window, ..*e })
            .collect();
        Self { events, window }
    }

    pub fn events(&self) -> &[HolidayEvent] {
        &self.events
    }

    pub fn window(&self) -> EffectWindow {
        self.window
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        Self::google_updates(EffectWindow::default())
    }
}
