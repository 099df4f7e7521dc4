use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

/// Named stopwatch that logs how long each stage of a request took.
pub struct Timer {
    name: String,
    tstamp: Option<DateTime<Utc>>,
    duration: Option<Duration>,
}

impl Timer {
    /// Create a new timer
    pub fn new(name: &str) -> Self {
        Timer {
            name: name.to_owned(),
            tstamp: None,
            duration: None,
        }
    }

    pub fn new_start(name: &str) -> Self {
        let mut t = Timer::new(name);
        t.start();
        t
    }

    /// Start the timer
    pub fn start(&mut self) {
        info!("{}: starting", self.name);

        self.tstamp = Some(Utc::now());
        self.duration = None;
    }

    /// Stop the timer
    pub fn stop(&mut self) {
        match self.tstamp {
            None => debug!("{}: not running!", self.name),
            Some(tstamp) => {
                let d = Utc::now() - tstamp;

                self.duration = Some(d);
                self.tstamp = None;
                info!("{} duration: {} msec", self.name, d.num_milliseconds());
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.tstamp.is_some()
    }

    /// Get duration in milliseconds
    pub fn duration(&self) -> i64 {
        self.duration.map_or(0, |d| d.num_milliseconds())
    }
}
