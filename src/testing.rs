// Test doubles for the transport pipeline.
// A scripted inner stage that records every request it receives.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    Method, Request, StatusCode,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use url::Url;

use crate::cache::freshness::format_http_date;
use crate::error::{Error, Result};
use crate::transport::{Response, Transport};

/// Request as seen by the stub.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

/// Inner stage that answers with queued results in order.
#[derive(Default)]
pub struct StubTransport {
    replies: Mutex<VecDeque<Result<Response>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, response: Response) {
        self.replies.lock().unwrap().push_back(Ok(response));
    }

    pub fn fail(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(Error::Other(message.to_string())));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        self.requests.lock().unwrap().push(Recorded {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
        });

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other("no reply queued".to_string())))
    }
}

pub fn request(method: Method, url: &str) -> Request {
    Request::new(method, Url::parse(url).unwrap())
}

/// Build a response with the given status, headers and body.
pub fn response(url: &str, status: u16, headers: &[(&str, &str)], body: &str) -> Response {
    let mut response = Response::new(Url::parse(url).unwrap(), StatusCode::from_u16(status).unwrap())
        .with_body(body.to_string());
    for (name, value) in headers {
        response.headers.insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    response
}

pub fn http_date(time: DateTime<Utc>) -> String {
    format_http_date(time)
}
