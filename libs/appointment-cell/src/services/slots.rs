use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::time::SlotTime;

use crate::models::{AvailableSlot, SlotQuery};

pub const CLINIC_OPEN_HOUR: u32 = 9;
pub const CLINIC_CLOSE_HOUR: u32 = 17;

const DEMO_DOCTOR_NAME: &str = "Dr. Sarah Smith";
const DEMO_DOCTOR_SPECIALTY: &str = "Cardiologist";

/// The fixed half-hour grid for a clinic day: 9:00 AM through 5:00 PM,
/// with no trailing 5:30 PM slot.
pub fn clinic_day_grid() -> Vec<SlotTime> {
    let mut times = Vec::new();
    for hour in CLINIC_OPEN_HOUR..=CLINIC_CLOSE_HOUR {
        for minute in [0, 30] {
            if hour == CLINIC_CLOSE_HOUR && minute == 30 {
                break;
            }
            if let Some(time) = SlotTime::new(hour, minute) {
                times.push(time);
            }
        }
    }
    times
}

pub struct SlotService {
    store: SupabaseClient,
}

impl SlotService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: SupabaseClient::new(config),
        }
    }

    /// Produce the slot records for a date and doctor set. This never
    /// fails: any internal error degrades to a small fixed slot set so the
    /// booking UI stays usable.
    pub async fn available_slots(&self, query: &SlotQuery, now: DateTime<Utc>) -> Vec<AvailableSlot> {
        match self.compute_slots(query, now).await {
            Ok(slots) => slots,
            Err(e) => {
                error!("Error computing slots: {}, returning default slots", e);
                Self::degraded_slots(query.date.unwrap_or_else(|| now.date_naive()))
            }
        }
    }

    async fn compute_slots(&self, query: &SlotQuery, now: DateTime<Utc>) -> Result<Vec<AvailableSlot>> {
        let doctors = self.fetch_doctors(query).await?;

        let mut base_date = query.date.unwrap_or_else(|| now.date_naive());
        let mut times = clinic_day_grid();

        // Same-day queries drop labels whose start has passed; an emptied
        // grid rolls the whole generation to the next calendar day.
        if base_date == now.date_naive() {
            times.retain(|t| t.as_time() > now.time());
            if times.is_empty() {
                base_date += Duration::days(1);
                times = clinic_day_grid();
            }
        }

        // One pass over the day's confirmed appointments gives O(1)
        // membership checks per (doctor, time) pair.
        let booked = self.fetch_booked_pairs(base_date).await?;

        if doctors.is_empty() {
            info!("No doctors registered, returning demo slots");
            return Ok(times
                .into_iter()
                .take(10)
                .map(|time| AvailableSlot {
                    date: base_date,
                    time,
                    doctor_id: Uuid::nil(),
                    doctor_name: DEMO_DOCTOR_NAME.to_string(),
                    specialty: Some(DEMO_DOCTOR_SPECIALTY.to_string()),
                    is_available: true,
                })
                .collect());
        }

        let mut slots = Vec::with_capacity(doctors.len() * times.len());
        for doctor in &doctors {
            let doctor_id = doctor["id"]
                .as_str()
                .and_then(|id| Uuid::parse_str(id).ok())
                .unwrap_or_else(Uuid::nil);
            let doctor_name = doctor["full_name"]
                .as_str()
                .filter(|s| !s.is_empty())
                .unwrap_or("Dr. Unknown")
                .to_string();
            let specialty = doctor["specialty"].as_str().map(str::to_string);

            for &time in &times {
                slots.push(AvailableSlot {
                    date: base_date,
                    time,
                    doctor_id,
                    doctor_name: doctor_name.clone(),
                    specialty: specialty.clone(),
                    is_available: !booked.contains(&(doctor_id, time)),
                });
            }
        }

        Ok(slots)
    }

    /// Doctors matching the query. An empty specialty match falls back to
    /// all doctors rather than an empty result.
    async fn fetch_doctors(&self, query: &SlotQuery) -> Result<Vec<Value>> {
        let mut path = "/rest/v1/users?role=eq.doctor".to_string();
        if let Some(doctor_id) = query.doctor_id {
            path.push_str(&format!("&id=eq.{}", doctor_id));
        }
        if let Some(ref specialty) = query.specialty {
            path.push_str(&format!("&specialty=eq.{}", urlencoding::encode(specialty)));
        }

        let doctors: Vec<Value> = self.store.request(Method::GET, &path, None).await?;
        if !doctors.is_empty() || query.specialty.is_none() {
            return Ok(doctors);
        }

        info!(
            "No doctors found for specialty '{}', falling back to all doctors",
            query.specialty.as_deref().unwrap_or_default()
        );

        let mut fallback_path = "/rest/v1/users?role=eq.doctor".to_string();
        if let Some(doctor_id) = query.doctor_id {
            fallback_path.push_str(&format!("&id=eq.{}", doctor_id));
        }
        let fallback: Vec<Value> = self.store.request(Method::GET, &fallback_path, None).await?;
        Ok(fallback)
    }

    async fn fetch_booked_pairs(&self, date: NaiveDate) -> Result<HashSet<(Uuid, SlotTime)>> {
        let path = format!(
            "/rest/v1/appointments?date=eq.{}&status=eq.confirmed",
            date.format("%Y-%m-%d")
        );
        let appointments: Vec<Value> = self.store.request(Method::GET, &path, None).await?;

        let mut booked = HashSet::new();
        for appointment in appointments {
            let doctor_id = appointment["doctor_id"]
                .as_str()
                .and_then(|id| Uuid::parse_str(id).ok());
            let time = appointment["time"]
                .as_str()
                .and_then(|label| label.parse::<SlotTime>().ok());

            if let (Some(doctor_id), Some(time)) = (doctor_id, time) {
                booked.insert((doctor_id, time));
            }
        }

        Ok(booked)
    }

    fn degraded_slots(date: NaiveDate) -> Vec<AvailableSlot> {
        clinic_day_grid()
            .into_iter()
            .take(5)
            .map(|time| AvailableSlot {
                date,
                time,
                doctor_id: Uuid::nil(),
                doctor_name: DEMO_DOCTOR_NAME.to_string(),
                specialty: Some(DEMO_DOCTOR_SPECIALTY.to_string()),
                is_available: true,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_spans_the_clinic_day_on_half_hours() {
        let grid = clinic_day_grid();

        assert_eq!(grid.len(), 17);
        assert_eq!(grid.first().unwrap().to_string(), "9:00 AM");
        assert_eq!(grid.last().unwrap().to_string(), "5:00 PM");

        let unique: HashSet<_> = grid.iter().collect();
        assert_eq!(unique.len(), grid.len());

        for time in &grid {
            let t = time.as_time();
            assert!(t >= SlotTime::new(9, 0).unwrap().as_time());
            assert!(t <= SlotTime::new(17, 0).unwrap().as_time());
            assert!(t.format("%M").to_string() == "00" || t.format("%M").to_string() == "30");
        }
    }

    #[test]
    fn degraded_slots_are_a_small_fixed_set() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let slots = SlotService::degraded_slots(date);

        assert_eq!(slots.len(), 5);
        assert!(slots.iter().all(|s| s.is_available));
        assert!(slots.iter().all(|s| s.doctor_name == DEMO_DOCTOR_NAME));
        assert_eq!(slots[0].time.to_string(), "9:00 AM");
        assert_eq!(slots[4].time.to_string(), "11:00 AM");
    }
}
