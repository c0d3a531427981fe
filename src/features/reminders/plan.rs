//! # Medication Plans
//!
//! The data a patient submits for one prescribed course, plus the YAML file
//! format the headless host uses to seed plans at startup.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use crate::core::{ScheduleError, MAX_INTAKE_TIMES};
use anyhow::Result;
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type PlanId = Uuid;

const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";

/// A daily intake moment (hour:minute:second, no date)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntakeTime(NaiveTime);

impl IntakeTime {
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, second).map(IntakeTime)
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl FromStr for IntakeTime {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), TIME_OF_DAY_FORMAT).map(IntakeTime)
    }
}

impl fmt::Display for IntakeTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIME_OF_DAY_FORMAT))
    }
}

impl Serialize for IntakeTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IntakeTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Unvalidated plan submission, as it arrives from a form or plan file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub medication_name: String,
    pub dosage_grams: f64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub intake_times: Vec<String>,
}

impl PlanRequest {
    pub fn new<I, S>(
        medication_name: impl Into<String>,
        dosage_grams: f64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        intake_times: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PlanRequest {
            medication_name: medication_name.into(),
            dosage_grams,
            start,
            end,
            intake_times: intake_times.into_iter().map(Into::into).collect(),
        }
    }

    /// Check every field and parse every intake time.
    ///
    /// Nothing is returned unless the whole request is valid.
    pub fn validate(&self) -> std::result::Result<Vec<IntakeTime>, ScheduleError> {
        if self.medication_name.trim().is_empty() {
            return Err(ScheduleError::EmptyMedicationName);
        }

        if !self.dosage_grams.is_finite() || self.dosage_grams < 0.0 {
            return Err(ScheduleError::InvalidDosage(self.dosage_grams));
        }

        if self.end < self.start {
            return Err(ScheduleError::InvalidCourse {
                start: self.start,
                end: self.end,
            });
        }

        if self.intake_times.len() > MAX_INTAKE_TIMES {
            return Err(ScheduleError::TooManyIntakeTimes {
                count: self.intake_times.len(),
            });
        }

        self.intake_times
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                raw.parse::<IntakeTime>()
                    .map_err(|_| ScheduleError::InvalidTimeOfDay {
                        index,
                        value: raw.clone(),
                    })
            })
            .collect()
    }
}

/// A validated, recorded medication course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationPlan {
    pub id: PlanId,
    pub medication_name: String,
    pub dosage_grams: f64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub intake_times: Vec<IntakeTime>,
    pub created_at: NaiveDateTime,
}

impl MedicationPlan {
    /// Number of daily intakes; always matches the length of `intake_times`
    pub fn times_per_day(&self) -> usize {
        self.intake_times.len()
    }
}

/// Plans to seed at startup
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlanFile {
    #[serde(default)]
    pub plans: Vec<PlanRequest>,
}

impl PlanFile {
    /// Load plans from a YAML file, rejecting the file if any plan is invalid
    pub fn load(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let file: PlanFile = serde_yaml::from_str(contents)?;
        for (i, plan) in file.plans.iter().enumerate() {
            plan.validate().map_err(|e| {
                anyhow::anyhow!("plan #{} ({}): {}", i, plan.medication_name, e)
            })?;
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn request(times: &[&str]) -> PlanRequest {
        let start = at(7, 0);
        PlanRequest::new("Aspirin", 5.0, start, start + chrono::Duration::days(7), times.to_vec())
    }

    #[test]
    fn test_intake_time_round_trips_through_display() {
        let time: IntakeTime = "08:05:30".parse().unwrap();
        assert_eq!(time, IntakeTime::from_hms(8, 5, 30).unwrap());
        assert_eq!(time.to_string(), "08:05:30");
    }

    #[test]
    fn test_intake_time_rejects_garbage() {
        assert!("25:00:00".parse::<IntakeTime>().is_err());
        assert!("noon".parse::<IntakeTime>().is_err());
        assert!("".parse::<IntakeTime>().is_err());
    }

    #[test]
    fn test_validate_accepts_zero_to_four_times() {
        assert!(request(&[]).validate().unwrap().is_empty());
        let times = request(&["08:00:00", "12:00:00", "18:00:00", "22:00:00"])
            .validate()
            .unwrap();
        assert_eq!(times.len(), 4);
    }

    #[test]
    fn test_validate_keeps_duplicates_in_order() {
        let times = request(&["20:00:00", "08:00:00", "08:00:00"]).validate().unwrap();
        assert_eq!(
            times.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
            vec!["20:00:00", "08:00:00", "08:00:00"]
        );
    }

    #[test]
    fn test_validate_rejects_five_times() {
        let err = request(&["01:00:00", "02:00:00", "03:00:00", "04:00:00", "05:00:00"])
            .validate()
            .unwrap_err();
        assert_eq!(err, ScheduleError::TooManyIntakeTimes { count: 5 });
    }

    #[test]
    fn test_validate_reports_first_bad_time() {
        let err = request(&["08:00:00", "8 o'clock", "99:00:00"])
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::InvalidTimeOfDay {
                index: 1,
                value: "8 o'clock".to_string()
            }
        );
    }

    #[test]
    fn test_validate_rejects_blank_name_and_bad_dosage() {
        let mut req = request(&[]);
        req.medication_name = "   ".to_string();
        assert_eq!(req.validate().unwrap_err(), ScheduleError::EmptyMedicationName);

        let mut req = request(&[]);
        req.dosage_grams = f64::NAN;
        assert!(matches!(req.validate(), Err(ScheduleError::InvalidDosage(_))));

        let mut req = request(&[]);
        req.dosage_grams = -1.0;
        assert_eq!(req.validate().unwrap_err(), ScheduleError::InvalidDosage(-1.0));
    }

    #[test]
    fn test_validate_rejects_inverted_course() {
        let mut req = request(&[]);
        req.end = req.start - chrono::Duration::hours(1);
        assert!(matches!(req.validate(), Err(ScheduleError::InvalidCourse { .. })));
    }

    #[test]
    fn test_plan_file_parse() {
        let yaml = r#"
plans:
  - medication_name: Aspirin
    dosage_grams: 0.5
    start: "2024-03-10T00:00:00"
    end: "2024-03-17T00:00:00"
    intake_times: ["08:00:00", "20:00:00"]
  - medication_name: Vitamin D
    dosage_grams: 0.01
    start: "2024-03-10T00:00:00"
    end: "2024-06-10T00:00:00"
"#;
        let file = PlanFile::parse(yaml).unwrap();
        assert_eq!(file.plans.len(), 2);
        assert_eq!(file.plans[0].intake_times, vec!["08:00:00", "20:00:00"]);
        assert!(file.plans[1].intake_times.is_empty());
    }

    #[test]
    fn test_plan_file_rejects_invalid_plan() {
        let yaml = r#"
plans:
  - medication_name: Aspirin
    dosage_grams: 0.5
    start: "2024-03-10T00:00:00"
    end: "2024-03-17T00:00:00"
    intake_times: ["8am"]
"#;
        let err = PlanFile::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("Aspirin"));
    }
}
