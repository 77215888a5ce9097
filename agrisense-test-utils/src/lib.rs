//! AgriSense Test Utilities
//!
//! Centralized test infrastructure for the AgriSense workspace:
//! - A scripted mock transport standing in for the server
//! - Proptest generators for identities, keys and errors
//! - Test fixtures for common session scenarios
//! - Custom assertions for remote errors

pub use agrisense_core::{
    ApiRequest, ApiResponse, BuyerIdentity, BuyerRegistration, Credentials, FarmerIdentity,
    FarmerRegistration, HttpMethod, Identity, KeySegment, QueryKey, Registration, RemoteError,
    Role, Transport,
};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

/// A scripted reply.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    Reply(ApiResponse),
    /// The request never reached a server.
    Unreachable(String),
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        MockResponse::Reply(ApiResponse::new(status, body.to_string()))
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        MockResponse::Reply(ApiResponse::new(status, body))
    }

    pub fn unreachable(reason: impl Into<String>) -> Self {
        MockResponse::Unreachable(reason.into())
    }
}

type Route = (HttpMethod, String);

/// In-memory [`Transport`] with per-route scripted replies.
///
/// Replies for a route are consumed in order; the last one repeats.
/// Unscripted routes answer 404. Every request is recorded before any
/// gate or latency applies, so call counts reflect what was issued.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<Route, VecDeque<MockResponse>>>,
    gates: Mutex<HashMap<Route, Arc<Semaphore>>>,
    calls: Mutex<Vec<ApiRequest>>,
    latency: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MockTransport::push`].
    pub fn on(self, method: HttpMethod, path: &str, response: MockResponse) -> Self {
        self.push(method, path, response);
        self
    }

    /// Queue another reply for a route.
    pub fn push(&self, method: HttpMethod, path: &str, response: MockResponse) {
        lock(&self.routes)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Hold requests to a route until the returned semaphore grants permits.
    pub fn gate(&self, method: HttpMethod, path: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        lock(&self.gates).insert((method, path.to_string()), Arc::clone(&gate));
        gate
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, method: HttpMethod, path: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).len()
    }

    fn next_response(&self, route: &Route) -> MockResponse {
        let mut routes = lock(&self.routes);
        match routes.get_mut(route) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| MockResponse::text(404, "Not found")),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| MockResponse::text(404, "Not found")),
            None => MockResponse::text(404, "Not found"),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RemoteError> {
        let route = (request.method, request.path.clone());
        lock(&self.calls).push(request);

        let gate = lock(&self.gates).get(&route).cloned();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| RemoteError::transport("gate closed"))?;
            permit.forget();
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        // Chosen after the gate so replies queued while held still apply.
        match self.next_response(&route) {
            MockResponse::Reply(response) => Ok(response),
            MockResponse::Unreachable(reason) => Err(RemoteError::transport(reason)),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for AgriSense types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Farmer), Just(Role::Buyer)]
    }

    pub fn arb_username() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{2,15}"
    }

    fn arb_optional_text() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[A-Za-z ]{1,20}")
    }

    pub fn arb_farmer_identity() -> impl Strategy<Value = FarmerIdentity> {
        (
            1i64..1_000_000,
            arb_username(),
            "[A-Za-z ]{0,24}",
            arb_optional_text(),
            proptest::option::of("[0-9]{10}"),
            proptest::option::of(prop_oneof![Just("en"), Just("hi"), Just("mr")]),
        )
            .prop_map(|(id, username, name, location, phone, language)| FarmerIdentity {
                id,
                username,
                name,
                location,
                phone,
                preferred_language: language.map(str::to_string),
            })
    }

    pub fn arb_buyer_identity() -> impl Strategy<Value = BuyerIdentity> {
        (
            1i64..1_000_000,
            arb_username(),
            "[A-Za-z ]{0,24}",
            arb_optional_text(),
            arb_optional_text(),
            arb_optional_text(),
        )
            .prop_map(
                |(id, username, name, business_type, company_name, location)| BuyerIdentity {
                    id,
                    username,
                    name,
                    business_type,
                    company_name,
                    location,
                    phone: None,
                },
            )
    }

    /// An identity matching the given role.
    pub fn arb_identity_for(role: Role) -> BoxedStrategy<Identity> {
        match role {
            Role::Farmer => arb_farmer_identity().prop_map(Identity::Farmer).boxed(),
            Role::Buyer => arb_buyer_identity().prop_map(Identity::Buyer).boxed(),
        }
    }

    pub fn arb_identity() -> impl Strategy<Value = Identity> {
        arb_role().prop_flat_map(arb_identity_for)
    }

    pub fn arb_key_segment() -> impl Strategy<Value = KeySegment> {
        prop_oneof![
            "[a-z/]{1,12}".prop_map(KeySegment::Str),
            any::<i64>().prop_map(KeySegment::Int),
            any::<bool>().prop_map(KeySegment::Bool),
        ]
    }

    pub fn arb_query_key() -> impl Strategy<Value = QueryKey> {
        prop::collection::vec(arb_key_segment(), 1..4).prop_map(QueryKey::new)
    }

    /// Failures the check route can produce, excluding 401.
    pub fn arb_check_failure() -> impl Strategy<Value = MockResponse> {
        prop_oneof![
            "[a-z ]{1,20}".prop_map(MockResponse::unreachable),
            prop_oneof![Just(400u16), Just(403), Just(404), Just(500), Just(502), Just(503)]
                .prop_map(|status| MockResponse::text(status, "failure")),
        ]
    }

    /// Failures a login or register request can produce.
    pub fn arb_mutation_failure() -> impl Strategy<Value = MockResponse> {
        prop_oneof![
            "[a-z ]{1,20}".prop_map(MockResponse::unreachable),
            prop_oneof![Just(400u16), Just(401), Just(409), Just(500)]
                .prop_map(|status| MockResponse::text(status, "server detail")),
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common session scenarios.

    use super::*;

    pub fn farmer_identity() -> Identity {
        Identity::Farmer(FarmerIdentity {
            id: 7,
            username: "farmer1".to_string(),
            name: "Ravi Patil".to_string(),
            location: Some("Nashik".to_string()),
            phone: Some("9876543210".to_string()),
            preferred_language: Some("mr".to_string()),
        })
    }

    pub fn buyer_identity() -> Identity {
        Identity::Buyer(BuyerIdentity {
            id: 12,
            username: "freshco".to_string(),
            name: "Fresh Co Procurement".to_string(),
            business_type: Some("retailer".to_string()),
            company_name: Some("Fresh Co".to_string()),
            location: Some("Pune".to_string()),
            phone: None,
        })
    }

    pub fn identity_for(role: Role) -> Identity {
        match role {
            Role::Farmer => farmer_identity(),
            Role::Buyer => buyer_identity(),
        }
    }

    pub fn farmer_credentials() -> Credentials {
        Credentials::new("farmer1", "harvest-2024")
    }

    pub fn buyer_credentials() -> Credentials {
        Credentials::new("freshco", "market-2024")
    }

    pub fn credentials_for(role: Role) -> Credentials {
        match role {
            Role::Farmer => farmer_credentials(),
            Role::Buyer => buyer_credentials(),
        }
    }

    pub fn farmer_registration() -> Registration {
        Registration::Farmer(FarmerRegistration {
            username: "farmer1".to_string(),
            password: "harvest-2024".to_string(),
            name: "Ravi Patil".to_string(),
            location: Some("Nashik".to_string()),
            phone: Some("9876543210".to_string()),
            preferred_language: Some("mr".to_string()),
        })
    }

    pub fn buyer_registration() -> Registration {
        Registration::Buyer(BuyerRegistration {
            username: "freshco".to_string(),
            password: "market-2024".to_string(),
            name: "Fresh Co Procurement".to_string(),
            business_type: Some("retailer".to_string()),
            company_name: Some("Fresh Co".to_string()),
            location: Some("Pune".to_string()),
            phone: None,
        })
    }

    pub fn registration_for(role: Role) -> Registration {
        match role {
            Role::Farmer => farmer_registration(),
            Role::Buyer => buyer_registration(),
        }
    }
}

pub use fixtures::*;

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for remote error shapes.

    use super::*;

    #[track_caller]
    pub fn assert_status<T: std::fmt::Debug>(result: &Result<T, RemoteError>, status: u16) {
        match result {
            Err(err) if err.status_code() == Some(status) => {}
            other => panic!("Expected HTTP {} error, got: {:?}", status, other),
        }
    }

    #[track_caller]
    pub fn assert_transport_error<T: std::fmt::Debug>(result: &Result<T, RemoteError>) {
        match result {
            Err(RemoteError::Transport { .. }) => {}
            other => panic!("Expected transport error, got: {:?}", other),
        }
    }
}
