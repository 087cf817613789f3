use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Version tag written into every serialized schedule. Stored schedules with
/// a different version are rejected on read instead of being guessed at.
pub const SCHEDULE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleDay {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

/// Weekly meeting schedule for a class: a day set plus start/end time-of-day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassSchedule {
    pub days: Vec<ScheduleDay>,
    #[serde(with = "hh_mm")]
    pub start: NaiveTime,
    #[serde(with = "hh_mm")]
    pub end: NaiveTime,
}

#[derive(Serialize, Deserialize)]
struct ScheduleEnvelope {
    version: u32,
    #[serde(flatten)]
    schedule: ClassSchedule,
}

impl ClassSchedule {
    pub fn validate(&self) -> Result<()> {
        if self.days.is_empty() {
            bail!("schedule must include at least one day");
        }
        if self.start >= self.end {
            bail!(
                "schedule start {} is not before end {}",
                self.start.format("%H:%M"),
                self.end.format("%H:%M")
            );
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&ScheduleEnvelope {
            version: SCHEDULE_FORMAT_VERSION,
            schedule: self.clone(),
        })
        .context("failed to serialize class schedule")
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let envelope: ScheduleEnvelope =
            serde_json::from_str(raw).context("malformed schedule value")?;
        if envelope.version != SCHEDULE_FORMAT_VERSION {
            bail!(
                "unsupported schedule format version {}",
                envelope.version
            );
        }
        envelope.schedule.validate()?;
        Ok(envelope.schedule)
    }
}

mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// A class (section) an instructor runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub room: String,
    pub schedule: ClassSchedule,
    pub created_at: DateTime<Utc>,
}
