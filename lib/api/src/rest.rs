use actix_web::{http::StatusCode, web, App, HttpResponse, HttpServer, ResponseError};
use actix_web::error::InternalError;
use actix_web::rt::time::timeout;
use actix_cors::Cors;
use remedex_core::{Error, ErrorKind, SourceFilter};
use remedex_ranking::{RankingPipeline, SortOrder};
use remedex_storage::{Catalog, SolutionStore, SourceRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Read-only handles shared by every request.
pub struct ServiceState {
    pipeline: RankingPipeline,
    solutions: Arc<dyn SolutionStore>,
    sources: SourceRegistry,
    symptom_count: usize,
}

impl ServiceState {
    pub fn new(
        pipeline: RankingPipeline,
        solutions: Arc<dyn SolutionStore>,
        sources: SourceRegistry,
        symptom_count: usize,
    ) -> Self {
        Self { pipeline, solutions, sources, symptom_count }
    }

    pub fn from_catalog(pipeline: RankingPipeline, catalog: &Catalog) -> Self {
        Self::new(
            pipeline,
            catalog.solutions(),
            catalog.sources().clone(),
            catalog.index().len(),
        )
    }
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    sources: Option<Vec<String>>,
    #[serde(default)]
    sort: SortOrder,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    symptoms: usize,
    solutions: usize,
    strategy: &'static str,
}

/// Maps domain errors onto HTTP responses.
///
/// Validation and not-found messages reach the caller; everything else is
/// logged and answered with a generic message.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Retrieval | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self.0.kind() {
            ErrorKind::Validation => self.0.to_string(),
            ErrorKind::NotFound => "Solution not found".to_string(),
            ErrorKind::Retrieval | ErrorKind::Internal => {
                error!("request failed: {}", self.0);
                "Internal Server Error".to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": message }))
    }
}

pub struct RestApi;

impl RestApi {
    pub async fn start(state: ServiceState, port: u16) -> std::io::Result<()> {
        let state = web::Data::new(state);
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(state.clone())
                .configure(configure)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }
}

/// Register every route. Known paths answer 405 to other methods.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let body = serde_json::json!({ "error": format!("Invalid request body: {}", err) });
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    });

    cfg.app_data(json_config)
        .service(
            web::resource("/api/search")
                .route(web::post().to(search))
                .default_service(web::to(method_not_allowed)),
        )
        .service(
            web::resource("/api/solution/{id}")
                .route(web::get().to(get_solution))
                .default_service(web::to(method_not_allowed)),
        )
        .service(
            web::resource(["/api/solution", "/api/solution/"])
                .route(web::get().to(missing_solution_id))
                .default_service(web::to(method_not_allowed)),
        )
        .service(
            web::resource("/api/sources")
                .route(web::get().to(list_sources))
                .default_service(web::to(method_not_allowed)),
        )
        .service(
            web::resource("/health")
                .route(web::get().to(health))
                .default_service(web::to(method_not_allowed)),
        );
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(serde_json::json!({
        "message": "Method Not Allowed"
    }))
}

async fn search(
    state: web::Data<ServiceState>,
    req: web::Json<SearchRequest>,
) -> Result<HttpResponse, ApiError> {
    let SearchRequest { query, sources, sort } = req.into_inner();
    let filter = SourceFilter::new(sources.unwrap_or_default())?;

    let pipeline = state.pipeline.clone();
    let budget = pipeline.config().request_timeout();
    let task = web::block(move || pipeline.search(&query, &filter));

    let mut results = match timeout(budget, task).await {
        Ok(Ok(outcome)) => outcome?,
        Ok(Err(blocking)) => return Err(Error::Internal(blocking.to_string()).into()),
        Err(_) => return Err(Error::Timeout(budget).into()),
    };
    sort.apply(&mut results);
    debug!(results = results.len(), ?sort, "search answered");

    Ok(HttpResponse::Ok().json(results))
}

async fn get_solution(
    state: web::Data<ServiceState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if id.trim().is_empty() {
        return Ok(missing_solution_id().await);
    }
    let detail = state.solutions.get(&id)?;
    Ok(HttpResponse::Ok().json(detail))
}

async fn missing_solution_id() -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": "Missing \"id\" parameter in URL"
    }))
}

async fn list_sources(state: web::Data<ServiceState>) -> HttpResponse {
    HttpResponse::Ok().json(state.sources.list())
}

async fn health(state: web::Data<ServiceState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        symptoms: state.symptom_count,
        solutions: state.solutions.len(),
        strategy: state.pipeline.strategy().name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::Method, test};
    use remedex_core::{IndexConfig, Result, SymptomIndex, SymptomRecord, Vector};
    use remedex_ranking::{Embedder, HashingEmbedder, SearchConfig};
    use remedex_storage::{InMemorySolutionStore, SolutionDetail};
    use std::time::Duration;

    const DIM: usize = 64;

    struct SlowEmbedder;

    impl Embedder for SlowEmbedder {
        fn model_id(&self) -> &str {
            "slow"
        }

        fn dim(&self) -> usize {
            DIM
        }

        fn embed(&self, text: &str) -> Result<Vector> {
            std::thread::sleep(Duration::from_millis(300));
            HashingEmbedder::new(DIM).embed(text)
        }
    }

    struct BrokenEmbedder;

    impl Embedder for BrokenEmbedder {
        fn model_id(&self) -> &str {
            "broken"
        }

        fn dim(&self) -> usize {
            DIM
        }

        fn embed(&self, _text: &str) -> Result<Vector> {
            Err(Error::Embedding("connection refused by 10.0.0.7".into()))
        }
    }

    fn state_with(embedder: Arc<dyn Embedder>, config: SearchConfig) -> web::Data<ServiceState> {
        let hashing = HashingEmbedder::new(DIM);
        let rows = [
            ("Belladonna", "Head", "clarke", "throbbing headache with red hot face"),
            ("Belladonna", "Eyes", "clarke", "dilated pupils and sensitivity to light"),
            ("Bryonia", "Chest", "boericke", "dry cough with stitching chest pain"),
            ("Nux vomica", "Stomach", "boericke", "heavy stomach after rich food"),
        ];
        let records = rows
            .iter()
            .map(|(solution, organ, source, text)| {
                SymptomRecord::new(*solution, *organ, *source, hashing.embed(text).unwrap())
            })
            .collect();
        let index = Arc::new(SymptomIndex::build(IndexConfig::default(), records).unwrap());
        let symptom_count = index.len();
        let pipeline = RankingPipeline::from_config(embedder, index, config).unwrap();
        let solutions = InMemorySolutionStore::new([(
            "Belladonna".to_string(),
            SolutionDetail {
                description: Some("Deadly nightshade".into()),
                ..Default::default()
            },
        )]);

        web::Data::new(ServiceState::new(
            pipeline,
            Arc::new(solutions),
            SourceRegistry::new(["Clarke", "boericke"]),
            symptom_count,
        ))
    }

    fn state() -> web::Data<ServiceState> {
        state_with(Arc::new(HashingEmbedder::new(DIM)), SearchConfig::default())
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(App::new().app_data($state).configure(configure)).await
        };
    }

    #[actix_web::test]
    async fn test_search_returns_ranked_results() {
        let app = app!(state());
        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(serde_json::json!({ "query": "throbbing headache" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let results = body.as_array().unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0]["solution"], "Belladonna");
        assert!(results[0]["similarity"].as_u64().unwrap() <= 100);
        assert!(results[0]["matching_organs"].is_array());
        assert!(results[0]["matching_sources"].is_array());
    }

    #[actix_web::test]
    async fn test_search_source_filter() {
        let app = app!(state());
        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(serde_json::json!({ "query": "headache", "sources": ["Boericke"] }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        for result in body.as_array().unwrap() {
            assert_eq!(result["matching_sources"], serde_json::json!(["boericke"]));
        }
    }

    #[actix_web::test]
    async fn test_search_sort_by_similarity() {
        let app = app!(state());
        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(serde_json::json!({ "query": "cough and headache", "sort": "similarity" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let percents: Vec<u64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["similarity"].as_u64().unwrap())
            .collect();
        assert!(percents.windows(2).all(|w| w[0] >= w[1]));
    }

    #[actix_web::test]
    async fn test_search_validation_errors() {
        let app = app!(state());
        let bodies = [
            serde_json::json!({ "query": "   " }),
            serde_json::json!({ "sources": ["clarke"] }),
            serde_json::json!({ "query": 42 }),
            serde_json::json!({ "query": "headache", "sources": "clarke" }),
            serde_json::json!({ "query": "headache", "sources": [" "] }),
            serde_json::json!({ "query": "headache", "sort": "alphabetical" }),
        ];
        for body in bodies {
            let req = test::TestRequest::post().uri("/api/search").set_json(&body).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        }
    }

    #[actix_web::test]
    async fn test_wrong_methods_rejected() {
        let app = app!(state());
        let cases = [
            (Method::GET, "/api/search"),
            (Method::POST, "/api/solution/Belladonna"),
            (Method::DELETE, "/api/sources"),
            (Method::PUT, "/health"),
        ];
        for (method, uri) in cases {
            let req = test::TestRequest::default().method(method.clone()).uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{} {}", method, uri);
        }
    }

    #[actix_web::test]
    async fn test_solution_lookup() {
        let app = app!(state());

        let req = test::TestRequest::get().uri("/api/solution/Belladonna").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["description"], "Deadly nightshade");
        assert!(body["relations"].is_null());

        let req = test::TestRequest::get().uri("/api/solution/Nux%20vomica").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/solution/").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_sources_sorted_lowercase() {
        let app = app!(state());
        let req = test::TestRequest::get().uri("/api/sources").to_request();
        let body: Vec<String> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, vec!["boericke", "clarke"]);
    }

    #[actix_web::test]
    async fn test_health() {
        let app = app!(state());
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["symptoms"], 4);
        assert_eq!(body["solutions"], 1);
        assert_eq!(body["strategy"], "weighted-diversity");
    }

    #[actix_web::test]
    async fn test_retrieval_failure_is_generic_500() {
        let app = app!(state_with(Arc::new(BrokenEmbedder), SearchConfig::default()));
        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(serde_json::json!({ "query": "headache" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Internal Server Error");
    }

    #[actix_web::test]
    async fn test_search_timeout() {
        let config = SearchConfig { request_timeout_ms: 20, ..SearchConfig::default() };
        let app = app!(state_with(Arc::new(SlowEmbedder), config));
        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(serde_json::json!({ "query": "headache" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
