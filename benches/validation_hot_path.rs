use authtoken_validator::{
    AuthTokenValidator, FetchError, KeyCache, KeySetFetcher, ValidatorConfig,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

const SECRET: &[u8] = b"bench-signing-secret";

/// In-memory key set, so the benchmarks measure validation rather than HTTP.
struct StaticKeySet(JwkSet);

impl KeySetFetcher for StaticKeySet {
    fn fetch(&self) -> Result<JwkSet, FetchError> {
        Ok(self.0.clone())
    }
}

fn key_set(kids: usize) -> JwkSet {
    use base64::Engine;
    let k = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(SECRET);
    let keys: Vec<_> = (0..kids)
        .map(|i| json!({"kty": "oct", "alg": "HS256", "kid": format!("k{i}"), "k": k}))
        .collect();
    serde_json::from_value(json!({ "keys": keys })).unwrap()
}

fn make_token(kid: &str) -> String {
    let header = Header {
        kid: Some(kid.to_string()),
        alg: Algorithm::HS256,
        ..Default::default()
    };
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = json!({"sub": "169", "exp": now + 3600, "key": "val"});
    jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

fn validator(kids: usize) -> AuthTokenValidator {
    let validator = AuthTokenValidator::with_fetcher(
        ValidatorConfig::default(),
        Arc::new(StaticKeySet(key_set(kids))),
    );
    validator.validate_configuration().unwrap();
    validator
}

fn bench_cached_validation(c: &mut Criterion) {
    let validator = validator(1);
    let token = make_token("k0");
    let headers = [("authorization", format!("Bearer {token}"))];

    c.bench_function("from_headers_cached_key", |b| {
        b.iter(|| black_box(validator.from_headers(black_box(&headers)).unwrap()))
    });
}

fn bench_key_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_lookup");
    for kids in [1usize, 16, 256] {
        let cache = KeyCache::new(Arc::new(StaticKeySet(key_set(kids))), Duration::from_secs(3600));
        cache.refresh().unwrap();
        let kid = format!("k{}", kids / 2);
        group.bench_with_input(BenchmarkId::from_parameter(kids), &kid, |b, kid| {
            b.iter(|| black_box(cache.lookup(black_box(kid))))
        });
    }
    group.finish();
}

fn bench_refresh(c: &mut Criterion) {
    let cache = KeyCache::new(Arc::new(StaticKeySet(key_set(16))), Duration::from_secs(3600));
    c.bench_function("refresh_16_unchanged_keys", |b| {
        b.iter(|| cache.refresh().unwrap())
    });
}

fn bench_concurrent_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_from_signature");
    let validator = validator(1);
    let token = Arc::new(make_token("k0"));

    for threads in [1usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let validator = validator.clone();
                        let token = Arc::clone(&token);
                        std::thread::spawn(move || {
                            for _ in 0..100 {
                                black_box(validator.from_signature(&token).unwrap());
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_cached_validation,
    bench_key_lookup,
    bench_refresh,
    bench_concurrent_validation
);
criterion_main!(benches);
