//! Shared fixtures for pipeline behavior tests: scripted transport and
//! provider doubles plus canned fixer.io payloads.

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rust_decimal_macros::dec;
use time::Date;

pub use ratevault_core::{
    CacheConfig, CachedProvider, CircuitBreaker, CircuitBreakerConfig, CircuitState, FixerConfig,
    FixerRateSource, HttpClient, HttpError, HttpRequest, HttpResponse, RateProvider, RateSnapshot,
    RateStore, RatesError, RatesService, SqliteRateStore, StoreBackedProvider, StoredRate,
};
pub use std::sync::Arc;

/// Transport double that replays a scripted list of responses and records
/// every request it sees. Once the script is exhausted it keeps returning a
/// transport error.
pub struct ScriptedHttpClient {
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedHttpClient {
    pub fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self::new(Vec::new())
    }

    /// Appends a response to the script, e.g. after a simulated recovery.
    pub fn push_response(&self, response: Result<HttpResponse, HttpError>) {
        self.responses
            .lock()
            .expect("response script")
            .push_back(response);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("request store").len()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests.lock().expect("request store").clone()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests
            .lock()
            .expect("request store")
            .push(request.url);
        let response = self
            .responses
            .lock()
            .expect("response script")
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::new("connection refused")));
        Box::pin(async move { response })
    }
}

/// Provider double that replays scripted results and counts invocations.
/// Useful as a delegate that must, or must not, be reached.
pub struct ScriptedProvider {
    results: Mutex<VecDeque<Result<RateSnapshot, RatesError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(results: Vec<Result<RateSnapshot, RatesError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A delegate the test expects to stay untouched; assert on
    /// `call_count` afterwards.
    pub fn never_called() -> Self {
        Self::new(Vec::new())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RateProvider for ScriptedProvider {
    fn get_rates<'a>(
        &'a self,
        _date: Date,
    ) -> Pin<Box<dyn Future<Output = Result<RateSnapshot, RatesError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .results
            .lock()
            .expect("result script")
            .pop_front()
            .unwrap_or_else(|| {
                Err(RatesError::Provider(String::from(
                    "scripted provider exhausted",
                )))
            });
        Box::pin(async move { result })
    }
}

pub fn eur_snapshot(date: Date) -> RateSnapshot {
    let mut rates = BTreeMap::new();
    rates.insert(String::from("USD"), dec!(1.04));
    rates.insert(String::from("GBP"), dec!(0.85));
    RateSnapshot::new("EUR", date, rates)
}

pub fn success_body(date: &str) -> String {
    format!(r#"{{"success":true,"base":"EUR","date":"{date}","rates":{{"USD":1.04,"GBP":0.85}}}}"#)
}

pub fn api_error_body(code: i64, info: &str) -> String {
    format!(r#"{{"success":false,"error":{{"code":{code},"info":"{info}"}}}}"#)
}

pub fn test_fixer_config() -> FixerConfig {
    FixerConfig {
        base_url: String::from("https://data.fixer.io/api"),
        api_key: String::from("test-key"),
        base_currency: String::from("EUR"),
        ..FixerConfig::default()
    }
}

/// Full pipeline wired exactly as the server composes it, with a scripted
/// transport and an in-memory store.
pub async fn full_pipeline(
    client: Arc<ScriptedHttpClient>,
    breaker: Arc<CircuitBreaker>,
) -> (RatesService, Arc<SqliteRateStore>) {
    let store = Arc::new(SqliteRateStore::in_memory().await.expect("store"));
    let fetcher = FixerRateSource::new(test_fixer_config(), client, breaker);
    let store_backed = StoreBackedProvider::new(
        "EUR",
        Arc::clone(&store) as Arc<dyn RateStore>,
        Arc::new(fetcher) as Arc<dyn RateProvider>,
    );
    let cached = CachedProvider::new(CacheConfig::default(), Arc::new(store_backed));
    (RatesService::new(Arc::new(cached)), store)
}
