#![allow(dead_code)]

//! Shared helpers for integration tests: a mock key server, fixed keys and token minting.

pub mod keys {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde_json::{json, Value};
    use std::time::{SystemTime, UNIX_EPOCH};

    /// RSA private key whose public half is published as [`rsa_jwk`].
    pub const SIGNING_KEY_PEM: &[u8] = include_bytes!("fixtures/signing_key.pem");
    /// An unrelated RSA private key, for forged signatures.
    pub const OTHER_KEY_PEM: &[u8] = include_bytes!("fixtures/other_key.pem");

    pub const RSA_N: &str = "sp0zi9JPWx1o8wV1gT76pxUet4wmIF-u1T0-FrjjcyIPETWVg3vJpSkmMEDZC-_qBg9vJKa5_Qv5B39IqQoa7TDB6_oQb8hiXSGoX_JHtylz9144LseWeteADq3qRR6wLbfyrhiA-qFribYn8Za2HkiXk5rFVxBUrm7po8TmsVTlmJNIwMfqe3dnU6_06fvfVpWwgMHLr_TLOJqB__kD_M31W8jU2nkYcGqsn4VznC3S1uLf3FKQVjnbYL7tUZz_TIHcFjYuKK4miQmrvO-NAnOCurHmJ9Er46QbxtUT68RBjSj-kDb806FKt9EhnNsGNzf2NS26V9gKYTxRLF1uzw";
    pub const RSA_E: &str = "AQAB";

    pub const HMAC_SECRET: &[u8] = b"secret-signing-key";
    /// base64url of [`HMAC_SECRET`]
    pub const HMAC_SECRET_B64: &str = "c2VjcmV0LXNpZ25pbmcta2V5";

    pub fn rsa_jwk(kid: &str) -> Value {
        json!({"kty": "RSA", "kid": kid, "use": "sig", "n": RSA_N, "e": RSA_E})
    }

    pub fn hmac_jwk(kid: &str) -> Value {
        json!({"kty": "oct", "kid": kid, "alg": "HS256", "k": HMAC_SECRET_B64})
    }

    pub fn key_set(keys: &[Value]) -> Value {
        json!({ "keys": keys })
    }

    pub fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    pub fn sign_rs256(kid: Option<&str>, claims: &Value) -> String {
        sign_with(SIGNING_KEY_PEM, kid, claims)
    }

    pub fn sign_with(pem: &[u8], kid: Option<&str>, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = kid.map(str::to_string);
        encode(&header, claims, &EncodingKey::from_rsa_pem(pem).unwrap()).unwrap()
    }

    pub fn sign_hs256(kid: &str, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &EncodingKey::from_secret(HMAC_SECRET)).unwrap()
    }

    /// Claims valid for the next hour.
    pub fn fresh_claims(extra: Value) -> Value {
        let mut claims = json!({"sub": "169", "exp": now() + 3600});
        if let (Some(claims), Some(extra)) = (claims.as_object_mut(), extra.as_object()) {
            claims.extend(extra.clone());
        }
        claims
    }
}

pub mod mock_server {
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    pub const ISSUER_PATH: &str = "/core";

    #[derive(Default)]
    struct State {
        key_set: Mutex<Value>,
        discovery: Mutex<Option<Value>>,
        status: AtomicU16,
        delay_ms: AtomicU64,
        key_set_requests: AtomicUsize,
        discovery_requests: AtomicUsize,
    }

    /// Issuer stand-in serving `/core/.well-known/jwks` and
    /// `/core/.well-known/openid-configuration` on a random loopback port.
    ///
    /// Every response can be delayed, and the key set endpoint can be switched to an
    /// error status. Requests are counted per endpoint.
    pub struct MockKeyServer {
        addr: SocketAddr,
        server: Arc<Server>,
        state: Arc<State>,
        handle: Option<thread::JoinHandle<()>>,
    }

    impl MockKeyServer {
        pub fn start(key_set: Value) -> Self {
            let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
            let addr = server.server_addr().to_ip().unwrap();
            let state = Arc::new(State::default());
            *state.key_set.lock().unwrap() = key_set;
            state.status.store(200, Ordering::SeqCst);

            let handle = {
                let server = Arc::clone(&server);
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    while let Ok(request) = server.recv() {
                        let state = Arc::clone(&state);
                        thread::spawn(move || respond(request, addr, &state));
                    }
                })
            };

            Self {
                addr,
                server,
                state,
                handle: Some(handle),
            }
        }

        pub fn issuer(&self) -> String {
            format!("http://{}{}", self.addr, ISSUER_PATH)
        }

        pub fn key_set_url(&self) -> String {
            format!("{}/.well-known/jwks", self.issuer())
        }

        pub fn set_key_set(&self, key_set: Value) {
            *self.state.key_set.lock().unwrap() = key_set;
        }

        /// Replace the discovery document served instead of the generated one.
        pub fn set_discovery(&self, document: Value) {
            *self.state.discovery.lock().unwrap() = Some(document);
        }

        pub fn set_status(&self, status: u16) {
            self.state.status.store(status, Ordering::SeqCst);
        }

        pub fn set_delay(&self, delay: Duration) {
            self.state
                .delay_ms
                .store(delay.as_millis() as u64, Ordering::SeqCst);
        }

        pub fn key_set_requests(&self) -> usize {
            self.state.key_set_requests.load(Ordering::SeqCst)
        }

        pub fn discovery_requests(&self) -> usize {
            self.state.discovery_requests.load(Ordering::SeqCst)
        }
    }

    impl Drop for MockKeyServer {
        fn drop(&mut self) {
            self.server.unblock();
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }

    fn respond(request: tiny_http::Request, addr: SocketAddr, state: &State) {
        let delay = state.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }

        let url = request.url().to_string();
        let (status, body) = if url == format!("{ISSUER_PATH}/.well-known/jwks") {
            state.key_set_requests.fetch_add(1, Ordering::SeqCst);
            let status = state.status.load(Ordering::SeqCst);
            let body = if status == 200 {
                state.key_set.lock().unwrap().to_string()
            } else {
                json!({"error": "unavailable"}).to_string()
            };
            (status, body)
        } else if url == format!("{ISSUER_PATH}/.well-known/openid-configuration") {
            state.discovery_requests.fetch_add(1, Ordering::SeqCst);
            let issuer = format!("http://{addr}{ISSUER_PATH}");
            let document = state.discovery.lock().unwrap().clone().unwrap_or_else(|| {
                json!({
                    "issuer": issuer,
                    "jwks_uri": format!("{issuer}/.well-known/jwks"),
                })
            });
            (200, document.to_string())
        } else {
            (404, json!({"error": "not found"}).to_string())
        };

        let content_type =
            Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
        let response = Response::from_string(body)
            .with_status_code(status)
            .with_header(content_type);
        let _ = request.respond(response);
    }
}
