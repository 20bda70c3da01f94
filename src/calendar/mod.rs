pub mod dto;

use std::env;

use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::SchedulePlan;

#[derive(Clone, Debug)]
pub struct CalendarConfig {
    pub access_token: String,
    pub calendar_id: String,
    pub time_zone: String,
}

impl CalendarConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let access_token = env::var("GOOGLE_CALENDAR_TOKEN")
            .map_err(|_| AppError::BadRequest("GOOGLE_CALENDAR_TOKEN is not set".to_string()))?;
        let calendar_id = env::var("GOOGLE_CALENDAR_ID").unwrap_or_else(|_| "primary".to_string());
        let time_zone =
            env::var("CALENDAR_TIMEZONE").unwrap_or_else(|_| "America/Los_Angeles".to_string());

        Ok(Self {
            access_token,
            calendar_id,
            time_zone,
        })
    }
}

/// An event to create. Dates are year-less `"month.day"` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub location: String,
}

#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Best effort. Returns how many events were created.
    async fn create_events(&self, events: &[CalendarEvent], username: &str) -> Result<usize, AppError>;
}

/// One event per due item and one per start item, each spanning the entry's date.
pub fn plan_to_events(plan: &SchedulePlan, username: &str, course_id: &str) -> Vec<CalendarEvent> {
    let mut events = Vec::new();

    for day in plan.entries() {
        for due in &day.dues {
            events.push(CalendarEvent {
                summary: format!("Due: {}", due),
                description: format!("Assignment due for {}'s course {}", username, course_id),
                start_date: day.date.clone(),
                end_date: day.date.clone(),
                location: String::new(),
            });
        }

        for start in &day.start {
            events.push(CalendarEvent {
                summary: format!("Start: {}", start),
                description: format!(
                    "Start working on this for {}'s course {}",
                    username, course_id
                ),
                start_date: day.date.clone(),
                end_date: day.date.clone(),
                location: String::new(),
            });
        }
    }

    events
}

/// Resolves `"m.d"` in `year` to the day's first and last second.
pub fn day_bounds(date: &str, year: i32) -> Result<(NaiveDateTime, NaiveDateTime), AppError> {
    let (month, day) = date
        .trim()
        .split_once('.')
        .ok_or_else(|| AppError::BadRequest(format!("Date format must be 'm.d': {}", date)))?;

    let month: u32 = month
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Month and day must be numbers: {}", date)))?;
    let day: u32 = day
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Month and day must be numbers: {}", date)))?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| AppError::BadRequest(format!("No such date: {}", date)))?;

    let start = naive
        .and_hms_opt(0, 0, 0)
        .ok_or(AppError::InternalServerError)?;
    let end = naive
        .and_hms_opt(23, 59, 59)
        .ok_or(AppError::InternalServerError)?;

    Ok((start, end))
}

pub struct GoogleCalendarClient {
    client: Client,
    config: CalendarConfig,
}

impl GoogleCalendarClient {
    pub fn new(config: CalendarConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn build_request(&self, event: &CalendarEvent, year: i32) -> Result<dto::EventRequest, AppError> {
        let (start, _) = day_bounds(&event.start_date, year)?;
        let (_, end) = day_bounds(&event.end_date, year)?;

        Ok(dto::EventRequest {
            summary: event.summary.clone(),
            location: event.location.clone(),
            description: event.description.clone(),
            start: dto::EventDateTime {
                date_time: start.format("%Y-%m-%dT%H:%M:%S").to_string(),
                time_zone: self.config.time_zone.clone(),
            },
            end: dto::EventDateTime {
                date_time: end.format("%Y-%m-%dT%H:%M:%S").to_string(),
                time_zone: self.config.time_zone.clone(),
            },
            reminders: dto::Reminders {
                use_default: false,
                overrides: vec![
                    dto::ReminderOverride { method: "email".to_string(), minutes: 24 * 60 },
                    dto::ReminderOverride { method: "popup".to_string(), minutes: 30 },
                ],
            },
        })
    }

    async fn insert_event(&self, request: &dto::EventRequest) -> Result<dto::EventResponse, AppError> {
        let url = format!(
            "https://www.googleapis.com/calendar/v3/calendars/{}/events",
            self.config.calendar_id
        );

        let response = self.client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.access_token))
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Calendar(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| AppError::Calendar(format!("Failed to read error body: {}", e)))?;
            return Err(AppError::Calendar(format!("Google Calendar API error {}: {}", status, body)));
        }

        response
            .json::<dto::EventResponse>()
            .await
            .map_err(|e| AppError::Calendar(format!("Failed to parse event response: {}", e)))
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendarClient {
    async fn create_events(&self, events: &[CalendarEvent], username: &str) -> Result<usize, AppError> {
        let year = Local::now().year();
        let mut created = 0;
        let mut failed = 0;

        for event in events {
            let result = match self.build_request(event, year) {
                Ok(request) => self.insert_event(&request).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(response) => {
                    created += 1;
                    info!(
                        "Event created for {}: {} ({})",
                        username,
                        event.summary,
                        response.html_link.as_deref().unwrap_or(&response.id)
                    );
                }
                Err(e) => {
                    failed += 1;
                    warn!("Failed to create event {} for {}: {}", event.summary, username, e);
                }
            }
        }

        if failed > 0 {
            return Err(AppError::Calendar(format!(
                "{} of {} events failed ({} created)",
                failed,
                events.len(),
                created
            )));
        }

        Ok(created)
    }
}

pub struct NoopCalendarClient;

#[async_trait]
impl CalendarClient for NoopCalendarClient {
    async fn create_events(&self, events: &[CalendarEvent], username: &str) -> Result<usize, AppError> {
        info!("Calendar push disabled, dropping {} events for {}", events.len(), username);
        Ok(0)
    }
}
