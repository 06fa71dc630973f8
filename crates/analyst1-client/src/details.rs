//! Detail expansion: resolve the actor stubs of a CVE hit into full actor
//! records.

use analyst1_core::{Details, LookupError, LookupOptions, LookupResult};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::lookup::{Analyst1Client, MAX_PARALLEL_LOOKUPS};
use crate::request::build_actor_request;

impl Analyst1Client {
    /// Expanded details for a previously produced result.
    ///
    /// Returns `Ok(None)` for a miss. Non-CVE details come back unchanged
    /// without any request. For CVE results every actor stub is fetched by
    /// id; the first failure aborts the expansion. `result` itself is never
    /// modified.
    ///
    /// Resolved records are ordered by completion, not by stub order.
    /// Stubs without an id cannot be fetched and are skipped, so a CVE with
    /// N stubs issues one request per stub that carries an id.
    pub async fn expand(
        &self,
        result: &LookupResult,
        options: &LookupOptions,
    ) -> Result<Option<Details>, LookupError> {
        let Some(data) = result.data.as_ref() else {
            return Ok(None);
        };
        if !result.entity.entity_type.is_cve() {
            return Ok(Some(data.details.clone()));
        }
        let Details::Cve(cve) = &data.details else {
            return Ok(Some(data.details.clone()));
        };

        let requests = cve
            .actors
            .iter()
            .filter_map(|actor| actor.id_segment())
            .map(|id| build_actor_request(&id, options))
            .collect::<Result<Vec<_>, _>>()?;

        let skipped = cve.actors.len() - requests.len();
        if skipped > 0 {
            warn!(
                cve = %result.entity.value,
                skipped,
                actors = cve.actors.len(),
                "Actors without an id are skipped from detail fetch"
            );
        }

        debug!(cve = %result.entity.value, actors = requests.len(), "onDetails");

        let fetched = stream::iter(requests)
            .map(|request| async move { self.fetch(&request).await })
            .buffer_unordered(MAX_PARALLEL_LOOKUPS)
            .try_collect::<Vec<Option<Value>>>()
            .await
            .map_err(|e| {
                error!(error = %e, cve = %result.entity.value, "Detail expansion aborted");
                e
            })?;

        let fetched_count = fetched.len();
        let records: Vec<Value> = fetched.into_iter().flatten().collect();
        if records.len() < fetched_count {
            warn!(
                missing = fetched_count - records.len(),
                "Some actors were not found and are omitted from details"
            );
        }

        let mut expanded = cve.clone();
        expanded.results = records;
        Ok(Some(Details::Cve(expanded)))
    }

    /// Expand `result` and store the new details in it. On error `result`
    /// keeps its previous details.
    pub async fn expand_in_place(
        &self,
        result: &mut LookupResult,
        options: &LookupOptions,
    ) -> Result<(), LookupError> {
        let expanded = self.expand(result, options).await?;
        if let (Some(data), Some(details)) = (result.data.as_mut(), expanded) {
            data.details = details;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::transport::HttpResponse;
    use analyst1_core::{ActorStub, CveDetails, Entity, EntityType, IndicatorDetails};
    use serde_json::{json, Map};
    use std::sync::Arc;
    use std::time::Duration;

    fn options() -> LookupOptions {
        LookupOptions::new("https://a1.test", "user", "pass")
    }

    fn cve_result(actor_ids: &[Value]) -> LookupResult {
        let actors = actor_ids
            .iter()
            .map(|id| ActorStub { name: format!("actor-{}", id), id: id.clone() })
            .collect();
        LookupResult::hit(
            Entity::new(EntityType::Cve, "CVE-2023-1234"),
            vec![],
            Details::Cve(CveDetails { actors, results: vec![] }),
        )
    }

    fn actor_id(uri: &str) -> &str {
        uri.rsplit('/').next().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_non_cve_passes_through_without_requests() {
        let transport = Arc::new(MockTransport::new(|_| Ok(HttpResponse::not_found())));
        let client = Analyst1Client::new(transport.clone());
        let details = Details::Indicator(IndicatorDetails {
            total_results: Some(json!(1)),
            results: vec![json!({"id": 5})],
            extra: Map::new(),
        });
        let result = LookupResult::hit(Entity::new(EntityType::IPv4, "1.1.1.1"), vec![], details.clone());

        let expanded = client.expand(&result, &options()).await.unwrap();

        assert_eq!(expanded, Some(details));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_miss_has_nothing_to_expand() {
        let transport = Arc::new(MockTransport::new(|_| Ok(HttpResponse::not_found())));
        let client = Analyst1Client::new(transport.clone());
        let result = LookupResult::miss(Entity::new(EntityType::Cve, "CVE-2020-0001"));
        assert_eq!(client.expand(&result, &options()).await.unwrap(), None);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_actor_records_replace_results() {
        let transport = Arc::new(MockTransport::new(|request| {
            Ok(HttpResponse::ok(json!({"id": actor_id(&request.uri), "title": "resolved"})))
        }));
        let client = Analyst1Client::new(transport.clone());
        let mut result = cve_result(&[json!(1), json!(2), json!(3)]);

        client.expand_in_place(&mut result, &options()).await.unwrap();

        let Some(Details::Cve(details)) = result.details() else {
            panic!("expected cve details");
        };
        assert_eq!(details.actors.len(), 3);
        let mut ids: Vec<&str> = details.results.iter().map(|r| r["id"].as_str().unwrap()).collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_actor_and_missing_id_are_omitted() {
        let transport = Arc::new(MockTransport::new(|request| match actor_id(&request.uri) {
            "2" => Ok(HttpResponse::not_found()),
            id => Ok(HttpResponse::ok(json!({"id": id}))),
        }));
        let client = Analyst1Client::new(transport.clone());
        let result = cve_result(&[json!(1), json!(2), Value::Null]);

        let expanded = client.expand(&result, &options()).await.unwrap().unwrap();

        assert_eq!(expanded.results(), &[json!({"id": "1"})]);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_earliest_actor_failure_is_reported() {
        let transport = Arc::new(
            MockTransport::new(|request| match actor_id(&request.uri) {
                "1" => Ok(HttpResponse::new(500, Some(json!("slow failure")))),
                "3" => Ok(HttpResponse::new(400, Some(json!("fast failure")))),
                id => Ok(HttpResponse::ok(json!({"id": id}))),
            })
            .with_delay_fn(|request| match actor_id(&request.uri) {
                "1" => Duration::from_secs(30),
                _ => Duration::from_millis(1),
            }),
        );
        let client = Analyst1Client::new(transport);
        let result = cve_result(&[json!(1), json!(2), json!(3)]);
        let started = tokio::time::Instant::now();

        let err = client.expand(&result, &options()).await.unwrap_err();

        assert_eq!(err, LookupError::BadRequest { body: json!("fast failure") });
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_result_untouched() {
        let transport = Arc::new(MockTransport::new(|request| match actor_id(&request.uri) {
            "2" => Ok(HttpResponse::new(400, Some(json!({"message": "bad id"})))),
            id => Ok(HttpResponse::ok(json!({"id": id}))),
        }));
        let client = Analyst1Client::new(transport);
        let mut result = cve_result(&[json!(1), json!(2), json!(3)]);
        let before = result.clone();

        let err = client.expand_in_place(&mut result, &options()).await.unwrap_err();

        assert_eq!(err, LookupError::BadRequest { body: json!({"message": "bad id"}) });
        assert_eq!(result, before);
    }
}
