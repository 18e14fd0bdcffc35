#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use rust_upload_middleware::config::{UploadConfig, UploadOptions};
use rust_upload_middleware::{AppState, create_app};
use std::path::Path;
use tower::ServiceExt;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

/// A multipart part: field name, optional filename, content
pub struct Part<'a> {
    pub field: &'a str,
    pub filename: Option<&'a str>,
    pub content: &'a [u8],
}

pub fn file<'a>(field: &'a str, filename: &'a str, content: &'a [u8]) -> Part<'a> {
    Part {
        field,
        filename: Some(filename),
        content,
    }
}

pub fn text<'a>(field: &'a str, content: &'a str) -> Part<'a> {
    Part {
        field,
        filename: None,
        content: content.as_bytes(),
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                        Content-Type: application/octet-stream\r\n\r\n",
                        part.field, filename
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                        part.field
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn test_app(root: &Path, staging: &Path, options: UploadOptions) -> Router {
    let config = UploadConfig {
        root_dir: root.to_path_buf(),
        temp_dir: staging.to_path_buf(),
        options,
        ..Default::default()
    };
    create_app(AppState::new(config).unwrap())
}

pub fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

pub async fn send_json(app: &Router, request: Request<Body>) -> serde_json::Value {
    let (status, body) = send(app, request).await;
    if status != StatusCode::OK {
        panic!(
            "Upload failed with status {}: {:?}",
            status,
            String::from_utf8_lossy(&body)
        );
    }
    serde_json::from_slice(&body).unwrap()
}
