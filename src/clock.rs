use chrono::{Local, NaiveDateTime};

/// Injected time source. The configured zone is the process-local zone;
/// handlers never read the wall clock directly, which keeps every
/// computation reproducible under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
