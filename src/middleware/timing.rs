//! Request timing middleware feeding the metrics recorder

use axum::{
    body::{Body, HttpBody},
    http::{header::CONTENT_LENGTH, Method, Request},
    response::Response,
};
use futures::future::BoxFuture;
use std::{
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::info;

use crate::error::ErrorNote;
use crate::metrics::{ApiCallSample, CallAnnotation, MetricsRecorder};

/// Times every API call (`POST` requests) and records a sample
#[derive(Clone)]
pub struct TimingLayer {
    recorder: Arc<MetricsRecorder>,
}

impl TimingLayer {
    pub fn new(recorder: Arc<MetricsRecorder>) -> Self {
        Self { recorder }
    }
}

impl<S> Layer<S> for TimingLayer {
    type Service = TimingMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimingMiddleware {
            inner,
            recorder: self.recorder.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TimingMiddleware<S> {
    inner: S,
    recorder: Arc<MetricsRecorder>,
}

impl<S> Service<Request<Body>> for TimingMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        if request.method() != Method::POST {
            let future = self.inner.call(request);
            return Box::pin(async move { future.await });
        }

        let endpoint = request.uri().path().to_string();
        let method = request.method().to_string();
        let request_size = request
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .or_else(|| request.body().size_hint().exact())
            .unwrap_or(0);
        let recorder = self.recorder.clone();
        let started = Instant::now();
        let future = self.inner.call(request);

        Box::pin(async move {
            let response = future.await?;
            let elapsed = started.elapsed();

            let annotation = response
                .extensions()
                .get::<CallAnnotation>()
                .copied()
                .unwrap_or_default();

            let status = response.status().as_u16();
            let mut sample = ApiCallSample::new(endpoint, method, status, elapsed);
            sample.use_case = annotation.use_case;
            sample.images = annotation.images;
            sample.request_size = request_size;
            sample.response_size = response.body().size_hint().exact().unwrap_or(0);
            sample.error = response.extensions().get::<ErrorNote>().map(|n| n.0.clone());

            info!(
                endpoint = %sample.endpoint,
                status = sample.status,
                elapsed_ms = elapsed.as_millis() as u64,
                use_case = ?sample.use_case,
                "API call completed"
            );

            recorder.record(sample);
            Ok(response)
        })
    }
}
