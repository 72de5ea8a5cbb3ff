use chrono::{Datelike, NaiveDate, Utc};

/// Source of "today" for age checks.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to a single date.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Full years between `birth_date` and `on`. A birthday counts on its date.
pub fn age_on(birth_date: NaiveDate, on: NaiveDate) -> u32 {
    if on < birth_date {
        return 0;
    }

    let mut years = on.year() - birth_date.year();
    if (on.month(), on.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("passenger aged {age} is below the minimum age of {minimum} for emergency-exit seats")]
pub struct MinorInEmergencySeat {
    pub age: u32,
    pub minimum: u32,
}

/// Emergency-exit seating rule.
#[derive(Debug, Clone, Copy)]
pub struct AgePolicy {
    pub minimum_emergency_seat_age: u32,
}

impl Default for AgePolicy {
    fn default() -> Self {
        Self {
            minimum_emergency_seat_age: 18,
        }
    }
}

impl AgePolicy {
    pub fn new(minimum_emergency_seat_age: u32) -> Self {
        Self { minimum_emergency_seat_age }
    }

    /// Non-emergency seats always pass.
    pub fn check(&self, emergency_seat: bool, birth_date: NaiveDate, today: NaiveDate) -> Result<(), MinorInEmergencySeat> {
        if !emergency_seat {
            return Ok(());
        }

        let age = age_on(birth_date, today);
        if age < self.minimum_emergency_seat_age {
            return Err(MinorInEmergencySeat {
                age,
                minimum: self.minimum_emergency_seat_age,
            });
        }
        Ok(())
    }
}
