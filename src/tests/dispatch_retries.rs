// Dispatcher behaviour against a stateful in-process upstream:
//  - 429 honours Retry-After and leaves the 401 refresh available
//  - one 401 refreshes the credential, a second one is final
//  - network failures stop at exactly the configured number of attempts
//  - other non-2xx responses pass through untouched

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Result;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::Json;
    use http::StatusCode;
    use httpmock::Method::POST;
    use httpmock::{Mock, MockServer};
    use tokio::time::{sleep, Instant};

    use crate::error::FacadeError;
    use crate::facade::builder::build_dispatcher;
    use crate::resilience::dispatcher::{Dispatcher, UpstreamRequest};
    use crate::tests::common::{json, service_config, spawn_axum, Router, TOKEN_PATH};

    const RESOURCE: &str = "/collateralOverview/42";

    async fn token_mock(server: &MockServer) -> Mock<'_> {
        server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200).json_body(json!({"access_token": "tok-1", "token_type": "bearer"}));
            })
            .await
    }

    /// Upstream whose handler picks a response from the call index.
    async fn upstream<F>(respond: F) -> (Arc<AtomicUsize>, String)
    where
        F: Fn(usize) -> Response + Clone + Send + Sync + 'static,
    {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let router = Router::new().route(
            RESOURCE,
            get(move || {
                let n = counter_clone.fetch_add(1, Ordering::SeqCst);
                let response = respond(n);
                async move { response }
            }),
        );
        let (_h, addr) = spawn_axum(router).await;
        (counter, format!("http://{}", addr))
    }

    async fn dispatcher(token_server: &MockServer, base_url: &str, timeout_ms: u64) -> Result<Arc<Dispatcher>> {
        let config = service_config(&token_server.url(TOKEN_PATH), base_url, timeout_ms).await?;
        build_dispatcher(&config)
    }

    fn ok_body() -> Response {
        Json(json!({"data": {"locationId": 42}})).into_response()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn rate_limit_waits_for_retry_after_and_keeps_refresh_allowance() -> Result<()> {
        let token_server = MockServer::start_async().await;
        let tokens = token_mock(&token_server).await;
        let (counter, base_url) = upstream(|n| match n {
            0 => (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "2")], "slow down").into_response(),
            1 => StatusCode::UNAUTHORIZED.into_response(),
            _ => ok_body(),
        })
        .await;
        let dispatcher = dispatcher(&token_server, &base_url, 2_000).await?;

        let started = Instant::now();
        let response = dispatcher.dispatch(&UpstreamRequest::get(RESOURCE)).await?;

        assert!(started.elapsed() >= Duration::from_secs(2), "Retry-After was not honoured");
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, json!({"data": {"locationId": 42}}));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // initial exchange plus the single refresh after 401
        assert_eq!(tokens.calls_async().await, 2);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_unauthorized_refreshes_once() -> Result<()> {
        let token_server = MockServer::start_async().await;
        let tokens = token_mock(&token_server).await;
        let (counter, base_url) = upstream(|n| match n {
            0 => StatusCode::UNAUTHORIZED.into_response(),
            _ => ok_body(),
        })
        .await;
        let dispatcher = dispatcher(&token_server, &base_url, 2_000).await?;

        let response = dispatcher.dispatch(&UpstreamRequest::get(RESOURCE)).await?;
        assert!(response.status.is_success());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(tokens.calls_async().await, 2);

        // the refreshed credential is reused
        dispatcher.dispatch(&UpstreamRequest::get(RESOURCE)).await?;
        assert_eq!(tokens.calls_async().await, 2);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn second_unauthorized_is_authentication_error() -> Result<()> {
        let token_server = MockServer::start_async().await;
        let tokens = token_mock(&token_server).await;
        let (counter, base_url) = upstream(|_| StatusCode::UNAUTHORIZED.into_response()).await;
        let dispatcher = dispatcher(&token_server, &base_url, 2_000).await?;

        let err = dispatcher.dispatch(&UpstreamRequest::get(RESOURCE)).await.unwrap_err();
        assert!(matches!(err, FacadeError::Authentication(_)), "{err:?}");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(tokens.calls_async().await, 2);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn network_failures_stop_at_max_attempts() -> Result<()> {
        let token_server = MockServer::start_async().await;
        token_mock(&token_server).await;

        // first three calls outlive the client timeout, the fourth would succeed
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let router = Router::new().route(
            RESOURCE,
            get(move || {
                let n = counter_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        sleep(Duration::from_secs(5)).await;
                    }
                    ok_body()
                }
            }),
        );
        let (_h, addr) = spawn_axum(router).await;
        let dispatcher = dispatcher(&token_server, &format!("http://{}", addr), 200).await?;

        let err = dispatcher.dispatch(&UpstreamRequest::get(RESOURCE)).await.unwrap_err();
        match err {
            FacadeError::RetryExhausted { attempts, last_failure } => {
                assert_eq!(attempts, 3);
                assert!(!last_failure.is_empty());
            }
            other => panic!("unexpected: {other:?}"),
        }

        sleep(Duration::from_millis(300)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3, "a fourth attempt was issued");
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn connection_refused_exhausts_retries() -> Result<()> {
        let token_server = MockServer::start_async().await;
        token_mock(&token_server).await;

        // bind and drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let dispatcher = dispatcher(&token_server, &format!("http://{}", addr), 500).await?;
        let err = dispatcher.dispatch(&UpstreamRequest::get(RESOURCE)).await.unwrap_err();
        assert!(matches!(err, FacadeError::RetryExhausted { attempts: 3, .. }), "{err:?}");
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn persistent_rate_limiting_exhausts_retries() -> Result<()> {
        let token_server = MockServer::start_async().await;
        let tokens = token_mock(&token_server).await;
        let (counter, base_url) = upstream(|_| {
            (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "0")], "").into_response()
        })
        .await;
        let dispatcher = dispatcher(&token_server, &base_url, 2_000).await?;

        let err = dispatcher.dispatch(&UpstreamRequest::get(RESOURCE)).await.unwrap_err();
        match err {
            FacadeError::RetryExhausted { attempts, last_failure } => {
                assert_eq!(attempts, 3);
                assert!(last_failure.contains("429"), "{last_failure}");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(tokens.calls_async().await, 1);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn oversized_retry_after_fails_fast() -> Result<()> {
        let token_server = MockServer::start_async().await;
        token_mock(&token_server).await;
        let (counter, base_url) = upstream(|_| {
            (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "86400")], "").into_response()
        })
        .await;
        let dispatcher = dispatcher(&token_server, &base_url, 2_000).await?;

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            dispatcher.dispatch(&UpstreamRequest::get(RESOURCE)),
        )
        .await
        .expect("dispatch must not sleep for the requested day");
        match outcome {
            Err(FacadeError::RetryExhausted { attempts, last_failure }) => {
                assert_eq!(attempts, 1);
                assert!(last_failure.contains("Retry-After"), "{last_failure}");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn client_errors_pass_through_without_retry() -> Result<()> {
        let token_server = MockServer::start_async().await;
        token_mock(&token_server).await;
        let upstream_server = MockServer::start_async().await;
        let not_found = upstream_server
            .mock_async(|when, then| {
                when.path(RESOURCE).header("authorization", "Bearer tok-1");
                then.status(404).json_body(json!({"message": "location 42 not found"}));
            })
            .await;
        let dispatcher = dispatcher(&token_server, &upstream_server.base_url(), 2_000).await?;

        match dispatcher.dispatch(&UpstreamRequest::get(RESOURCE)).await {
            Err(FacadeError::Upstream { status, body }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, json!({"message": "location 42 not found"}));
            }
            other => panic!("unexpected: {other:?}"),
        }
        not_found.assert_calls_async(1).await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn query_and_body_are_forwarded() -> Result<()> {
        let token_server = MockServer::start_async().await;
        token_mock(&token_server).await;
        let upstream_server = MockServer::start_async().await;
        let patched = upstream_server
            .mock_async(|when, then| {
                when.method(httpmock::Method::PATCH)
                    .path(RESOURCE)
                    .query_param("dryRun", "true")
                    .json_body(json!({"meta": {"status": "review"}}));
                then.status(200).json_body(json!({"updated": true}));
            })
            .await;
        let dispatcher = dispatcher(&token_server, &upstream_server.base_url(), 2_000).await?;

        let request = UpstreamRequest::patch(RESOURCE, json!({"meta": {"status": "review"}})).with_query("dryRun", "true");
        let response = dispatcher.dispatch(&request).await?;
        assert_eq!(response.body, json!({"updated": true}));
        patched.assert_calls_async(1).await;
        Ok(())
    }
}
