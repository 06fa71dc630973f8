//! Batch lookup orchestrator.

use std::sync::Arc;

use analyst1_core::{Entity, LookupError, LookupOptions, LookupResult};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::{debug, error, trace};

use crate::classify::classify;
use crate::request::{build_request, RequestDescriptor};
use crate::summary::assemble_result;
use crate::transport::Transport;

/// Upper bound on requests in flight per batch and per detail expansion.
pub const MAX_PARALLEL_LOOKUPS: usize = 10;

/// Analyst1 API client over a shared, read-only transport.
///
/// Cloning is cheap; every clone uses the same transport.
#[derive(Clone)]
pub struct Analyst1Client {
    transport: Arc<dyn Transport>,
}

impl Analyst1Client {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Look up every entity and return one result per entity, in input
    /// order.
    ///
    /// The first exchange to fail, in completion order, aborts the whole
    /// batch: requests in flight are dropped, requests not yet started are
    /// never sent and completed results are discarded.
    pub async fn lookup(
        &self,
        entities: &[Entity],
        options: &LookupOptions,
    ) -> Result<Vec<LookupResult>, LookupError> {
        debug!(
            entities = entities.len(),
            match_search = options.do_indicator_match_search,
            "doLookup"
        );

        // contract violations surface before anything is sent
        let requests = entities
            .iter()
            .map(|entity| build_request(entity, options))
            .collect::<Result<Vec<_>, _>>()?;

        // completion order, so the earliest failure ends the batch; slots
        // restore input order
        let outcome = stream::iter(entities.iter().zip(requests).enumerate())
            .map(|(index, (entity, request))| async move {
                trace!(uri = %request.uri, query = ?request.query, "Request options");
                let body = self.fetch(&request).await?;
                Ok::<_, LookupError>((index, assemble_result(entity.clone(), request.mode, body)))
            })
            .buffer_unordered(MAX_PARALLEL_LOOKUPS)
            .try_fold(vec![None::<LookupResult>; entities.len()], |mut slots, (index, result)| async move {
                slots[index] = Some(result);
                Ok::<_, LookupError>(slots)
            })
            .await
            .map(|slots| slots.into_iter().flatten().collect::<Vec<LookupResult>>());

        match outcome {
            Ok(results) => {
                debug!(
                    results = results.len(),
                    hits = results.iter().filter(|r| !r.is_miss()).count(),
                    "Lookup results"
                );
                Ok(results)
            }
            Err(e) => {
                error!(error = %e, detail = %e.detail(), "Lookup batch aborted");
                Err(e)
            }
        }
    }

    /// Send one request and classify the outcome. `Ok(None)` is a miss.
    pub(crate) async fn fetch(&self, request: &RequestDescriptor) -> Result<Option<Value>, LookupError> {
        let outcome = self.transport.send(request).await;
        if let Ok(ref response) = outcome {
            trace!(status = response.status, body = ?response.body, "Body");
        }
        classify(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::transport::HttpResponse;
    use analyst1_core::EntityType;
    use serde_json::json;
    use std::time::Duration;

    fn options(match_search: bool) -> LookupOptions {
        LookupOptions::new("https://a1.test", "user", "pass").with_match_search(match_search)
    }

    #[tokio::test]
    async fn test_results_align_with_input() {
        let transport = Arc::new(MockTransport::new(|request| {
            match request.query_value("value") {
                Some("1.1.1.1") => Ok(HttpResponse::ok(json!({"tlp": "WHITE", "reportCount": 1}))),
                _ => Ok(HttpResponse::not_found()),
            }
        }));
        let client = Analyst1Client::new(transport.clone());
        let entities = vec![
            Entity::new(EntityType::Domain, "nothing.test"),
            Entity::new(EntityType::IPv4, "1.1.1.1"),
            Entity::new(EntityType::Email, "x@y.test"),
        ];

        let results = client.lookup(&entities, &options(true)).await.unwrap();

        assert_eq!(results.len(), 3);
        for (result, entity) in results.iter().zip(&entities) {
            assert_eq!(&result.entity, entity);
        }
        assert!(results[0].is_miss());
        assert!(!results[1].is_miss());
        assert!(results[2].is_miss());
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_preserved_when_completion_differs() {
        // later entities answer sooner
        let transport = Arc::new(
            MockTransport::new(|request| {
                Ok(HttpResponse::ok(json!({
                    "totalResults": 1,
                    "results": [{"term": request.query_value("searchTerm")}]
                })))
            })
            .with_delay_fn(|request| {
                let n: u64 = request
                    .query_value("searchTerm")
                    .and_then(|v| v.trim_start_matches("host").parse().ok())
                    .unwrap_or(0);
                Duration::from_millis(100 - n * 10)
            }),
        );
        let client = Analyst1Client::new(transport);
        let entities: Vec<Entity> = (0..5)
            .map(|i| Entity::new(EntityType::Domain, format!("host{}", i)))
            .collect();

        let results = client.lookup(&entities, &options(false)).await.unwrap();

        let values: Vec<&str> = results.iter().map(|r| r.entity.value.as_str()).collect();
        assert_eq!(values, vec!["host0", "host1", "host2", "host3", "host4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_earliest_failure_aborts_batch() {
        let transport = Arc::new(
            MockTransport::new(|request| match request.query_value("value") {
                Some("10.0.0.0") => Ok(HttpResponse::new(503, Some(json!("slow failure")))),
                Some("10.0.0.1") => Ok(HttpResponse::new(400, Some(json!("fast failure")))),
                _ => Ok(HttpResponse::ok(json!({"tlp": "GREEN", "reportCount": 1}))),
            })
            .with_delay_fn(|request| match request.query_value("value") {
                Some("10.0.0.0") => Duration::from_secs(30),
                _ => Duration::from_millis(1),
            }),
        );
        let client = Analyst1Client::new(transport);
        let entities: Vec<Entity> = (0..3)
            .map(|i| Entity::new(EntityType::IPv4, format!("10.0.0.{}", i)))
            .collect();
        let started = tokio::time::Instant::now();

        let err = client.lookup(&entities, &options(true)).await.unwrap_err();

        assert_eq!(err, LookupError::BadRequest { body: json!("fast failure") });
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let transport = Arc::new(MockTransport::new(|_| Ok(HttpResponse::not_found())));
        let client = Analyst1Client::new(transport.clone());
        let results = client.lookup(&[], &options(true)).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_type_sends_nothing() {
        let transport = Arc::new(MockTransport::new(|_| Ok(HttpResponse::not_found())));
        let client = Analyst1Client::new(transport.clone());
        let entities = vec![
            Entity::new(EntityType::IPv4, "1.2.3.4"),
            Entity::new(EntityType::Other("url".into()), "http://x"),
        ];

        let err = client.lookup(&entities, &options(true)).await.unwrap_err();

        assert_eq!(err, LookupError::UnsupportedEntityType("url".into()));
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_lookup_blocking() {
        let transport = Arc::new(MockTransport::new(|_| Ok(HttpResponse::not_found())));
        let client = Analyst1Client::new(transport);
        let entities = vec![Entity::new(EntityType::Hash, "d41d8cd98f00b204e9800998ecf8427e")];
        let results = tokio_test::block_on(client.lookup(&entities, &options(true))).unwrap();
        assert!(results[0].is_miss());
    }
}
