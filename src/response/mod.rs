//! Response handling module - Image encoding and HTTP image responses

pub mod png;

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

/// Header carrying the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Encoded image returned to the client
pub struct ImageResponse {
    bytes: Vec<u8>,
    content_type: &'static str,
    request_id: Option<Uuid>,
}

impl ImageResponse {
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: png::CONTENT_TYPE,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

impl IntoResponse for ImageResponse {
    fn into_response(self) -> Response {
        let mut response = (
            [(header::CONTENT_TYPE, HeaderValue::from_static(self.content_type))],
            self.bytes,
        )
            .into_response();

        if let Some(id) = self.request_id {
            if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
        }

        response
    }
}
