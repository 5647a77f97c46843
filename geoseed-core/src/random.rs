//! Small randomness and calendar helpers shared by the samplers.
//!
//! Every helper takes the random stream explicitly so a whole run can be
//! replayed from a single seed.

use chrono::{DateTime, Days, NaiveTime, TimeZone};
use rand::Rng;

/// Hour of day at which a simulated day starts.
pub const DAY_START_HOUR: u32 = 8;

/// Toss a coin: `|val|` on heads, `-|val|` on tails.
///
/// Zero is not sign-preserved: heads turns it into `1`, tails leaves it `0`.
pub fn coin_flip<R: Rng + ?Sized>(val: i64, rng: &mut R) -> i64 {
    // Even is heads, odd is tails.
    let heads = rng.gen_range(0..100) % 2 == 0;
    match (heads, val) {
        (true, 0) => 1,
        (true, v) => v.abs(),
        (false, 0) => 0,
        (false, v) => -v.abs(),
    }
}

/// Uniform draw from `[0, upper)`, or `0` when the range is empty.
pub fn below<R: Rng + ?Sized>(upper: u64, rng: &mut R) -> u64 {
    if upper == 0 {
        0
    } else {
        rng.gen_range(0..upper)
    }
}

/// The calendar day `n` days before `now`, at 08:00:00 in `now`'s timezone.
///
/// Returns `None` only when 08:00 does not exist on that day in the zone.
pub fn days_ago<Tz: TimeZone>(now: &DateTime<Tz>, n: u64) -> Option<DateTime<Tz>> {
    let day = now.date_naive().checked_sub_days(Days::new(n))?;
    let start = NaiveTime::from_hms_opt(DAY_START_HOUR, 0, 0)?;
    now.timezone()
        .from_local_datetime(&day.and_time(start))
        .earliest()
}
