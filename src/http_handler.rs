use crate::api::{Params, SignedApiClient};
use crate::error::ApiError;
use crate::meetings::{
    create_meeting, delete_meeting, get_meeting, list_meetings, update_meeting, NewMeeting,
};
use lambda_http::http::{header::LOCATION, Method};
use lambda_http::tracing::{error, info, warn};
use lambda_http::{Body, Error, Request, RequestPayloadExt, Response};
use reqwest::StatusCode;
use serde::Serialize;

/// This function is the entry point for the Lambda function.
/// It routes the request to the meeting operations backed by the signed API client.
///
/// Following routes are served:
/// - `GET /`, `GET /meetings`: list the user's meetings
/// - `POST /create`: create a scheduled meeting from the form, then redirect to `/`
/// - `POST /meetings`: create a scheduled meeting and return it
/// - `GET|PATCH|DELETE /meetings/{id}`: read, change or remove a single meeting
pub async fn function_handler(
    client: &SignedApiClient,
    event: Request,
) -> Result<Response<Body>, Error> {
    let method = event.method().clone();
    let path = event.uri().path().to_string();
    info!("Received {} {:?}", method, path);

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] => match method {
            Method::GET => list(client).await,
            _ => json_response(405, "Method not allowed"),
        },
        ["create"] => match method {
            Method::POST => create(client, &event, true).await,
            _ => json_response(405, "Method not allowed"),
        },
        ["meetings"] => match method {
            Method::GET => list(client).await,
            Method::POST => create(client, &event, false).await,
            _ => json_response(405, "Method not allowed"),
        },
        ["meetings", id] => {
            let Some(id) = parse_meeting_id(id) else {
                return json_response(404, "Not found");
            };
            match method {
                Method::GET => match get_meeting(client, id).await {
                    Ok(meeting) => json_body(200, &meeting),
                    Err(e) => api_error_response(e),
                },
                Method::PATCH => update(client, &event, id).await,
                Method::DELETE => match delete_meeting(client, id).await {
                    Ok(()) => empty_response(204),
                    Err(e) => api_error_response(e),
                },
                _ => json_response(405, "Method not allowed"),
            }
        }
        _ => json_response(404, "Not found"),
    }
}

async fn list(client: &SignedApiClient) -> Result<Response<Body>, Error> {
    match list_meetings(client).await {
        Ok(meetings) => json_body(200, &meetings),
        Err(e) => api_error_response(e),
    }
}

async fn create(
    client: &SignedApiClient,
    event: &Request,
    redirect: bool,
) -> Result<Response<Body>, Error> {
    info!("Validating request");
    let new_meeting = match event.payload::<NewMeeting>() {
        Ok(Some(new_meeting)) => new_meeting,
        Ok(None) => return json_response(400, "Missing request body"),
        Err(e) => {
            warn!("Failed to read create request: {:?}", e);
            return json_response(400, "Malformed request body");
        }
    };
    let meeting = match new_meeting.validate() {
        Ok(meeting) => meeting,
        Err(e) => return json_response(400, &e.to_string()),
    };

    match create_meeting(client, meeting).await {
        Ok(_) if redirect => Ok(Response::builder()
            .status(302)
            .header(LOCATION, "/")
            .body(Body::Empty)?),
        Ok(created) => json_body(201, &created),
        Err(e) => api_error_response(e),
    }
}

async fn update(
    client: &SignedApiClient,
    event: &Request,
    id: u64,
) -> Result<Response<Body>, Error> {
    let changes = match event.payload::<Params>() {
        Ok(Some(changes)) => changes,
        Ok(None) => return json_response(400, "Missing request body"),
        Err(e) => {
            warn!("Failed to read update request for meeting {}: {:?}", id, e);
            return json_response(400, "Malformed request body");
        }
    };
    match update_meeting(client, id, &changes).await {
        Ok(()) => empty_response(204),
        Err(e) => api_error_response(e),
    }
}

fn parse_meeting_id(id: &str) -> Option<u64> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

fn api_error_response(e: ApiError) -> Result<Response<Body>, Error> {
    error!("Meeting request failed: {:?}", e);
    match e {
        ApiError::Config(_) => json_response(500, "Meeting service is not configured"),
        ApiError::UnexpectedStatus { status, .. } if status == StatusCode::NOT_FOUND => {
            json_response(404, "Meeting not found")
        }
        ApiError::UnexpectedStatus { status, .. } => json_response(
            502,
            &format!("Meeting provider answered with status {}", status.as_u16()),
        ),
        ApiError::Transport(_) | ApiError::Serialize(_) | ApiError::Decode(_) => {
            json_response(502, "Failed to reach the meeting provider")
        }
    }
}

// Helper function to generate JSON responses
fn json_response(status_code: u16, message: &str) -> Result<Response<Body>, Error> {
    json_body(status_code, &serde_json::json!({ "message": message }))
}

fn json_body<T: Serialize>(status_code: u16, body: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status_code)
        .header("Content-Type", "application/json")
        .body(Body::Text(serde_json::to_string(body)?))?)
}

fn empty_response(status_code: u16) -> Result<Response<Body>, Error> {
    Ok(Response::builder().status(status_code).body(Body::Empty)?)
}
