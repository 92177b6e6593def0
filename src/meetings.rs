use crate::{
    api::{to_params, Params, SignedApiClient},
    error::{ApiError, ValidationError},
    time_format::{is_date_time, to_display_format, to_provider_time_format},
};
use lambda_http::tracing::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_repr::Serialize_repr;

const MEETINGS_PATH: &str = "users/me/meetings";
const DEFAULT_DURATION_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr)]
#[repr(u8)]
pub enum MeetingType {
    Instant = 1,
    Scheduled = 2,
    Recurring = 3,
    FixedRecurring = 8,
}

/// One page of the user's meetings; further pages are not fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingList {
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub next_page_token: String,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
}

/// A meeting as the provider returns it. Fields not modelled here are kept
/// in `extra` so nothing is lost when handing the meeting back out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub topic: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub meeting_type: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agenda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Meeting {
    fn with_display_times(mut self) -> Self {
        self.start_time = self.start_time.map(display_time);
        self.created_at = self.created_at.map(display_time);
        self
    }
}

fn display_time(value: String) -> String {
    match to_display_format(&value) {
        Ok(formatted) => formatted,
        Err(e) => {
            debug!("Keeping meeting time {:?} as received: {}", value, e);
            value
        }
    }
}

/// Input of the create form.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMeeting {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub agenda: Option<String>,
}

/// A `NewMeeting` that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidMeeting {
    topic: String,
    start_time: String,
    agenda: Option<String>,
}

impl NewMeeting {
    pub fn validate(self) -> Result<ValidMeeting, ValidationError> {
        let topic = non_empty(self.topic).ok_or(ValidationError::MissingField("topic"))?;
        let start_time =
            non_empty(self.start_time).ok_or(ValidationError::MissingField("start_time"))?;
        if !is_date_time(&start_time) {
            return Err(ValidationError::InvalidDateTime("start_time"));
        }
        Ok(ValidMeeting {
            topic,
            start_time,
            agenda: non_empty(self.agenda),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Serialize)]
struct MeetingSettings {
    host_video: bool,
    participant_video: bool,
    waiting_room: bool,
}

#[derive(Debug, Serialize)]
struct CreateMeetingRequest {
    topic: String,
    #[serde(rename = "type")]
    meeting_type: MeetingType,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<String>,
    duration: u32,
    agenda: Option<String>,
    settings: MeetingSettings,
}

impl CreateMeetingRequest {
    fn new(meeting: ValidMeeting) -> Self {
        CreateMeetingRequest {
            // An unconvertible start time is left out rather than failing the call.
            start_time: to_provider_time_format(&meeting.start_time).ok(),
            topic: meeting.topic,
            meeting_type: MeetingType::Scheduled,
            duration: DEFAULT_DURATION_MINUTES,
            agenda: meeting.agenda,
            settings: MeetingSettings {
                host_video: false,
                participant_video: false,
                waiting_room: true,
            },
        }
    }
}

fn meeting_path(id: u64) -> String {
    format!("meetings/{}", id)
}

pub async fn list_meetings(client: &SignedApiClient) -> Result<MeetingList, ApiError> {
    info!("Listing meetings");
    let mut list: MeetingList = client.get(MEETINGS_PATH, None).await?.json()?;
    list.meetings = list
        .meetings
        .into_iter()
        .map(Meeting::with_display_times)
        .collect();
    info!(
        "Received {} of {} meetings",
        list.meetings.len(),
        list.total_records
    );
    Ok(list)
}

pub async fn create_meeting(
    client: &SignedApiClient,
    meeting: ValidMeeting,
) -> Result<Meeting, ApiError> {
    let request_body = to_params(&CreateMeetingRequest::new(meeting))?;
    info!("Creating meeting {:?}", request_body.get("topic"));
    let created: Meeting = client.post(MEETINGS_PATH, Some(&request_body)).await?.json()?;
    info!("Created meeting with id: {:?}", created.id);
    Ok(created)
}

pub async fn get_meeting(client: &SignedApiClient, id: u64) -> Result<Meeting, ApiError> {
    info!("Get meeting {}", id);
    let meeting: Meeting = client.get(&meeting_path(id), None).await?.json()?;
    Ok(meeting.with_display_times())
}

pub async fn update_meeting(
    client: &SignedApiClient,
    id: u64,
    changes: &Params,
) -> Result<(), ApiError> {
    info!("Update meeting {} with fields {:?}", id, changes.keys());
    client
        .patch(&meeting_path(id), Some(changes))
        .await?
        .ensure_success()
        .inspect_err(|e| warn!("Failed to update meeting {}: {}", id, e))
}

pub async fn delete_meeting(client: &SignedApiClient, id: u64) -> Result<(), ApiError> {
    info!("Delete meeting {}", id);
    client
        .delete(&meeting_path(id), None)
        .await?
        .ensure_success()
        .inspect_err(|e| warn!("Failed to delete meeting {}: {}", id, e))
}
