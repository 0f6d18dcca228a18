//! End-to-end read/write scenarios across the bundled adapters.

use std::sync::Arc;

use keystash::{
    Backend, CookieBackend, FileBackend, FixedClassifier, MemoryBackend, RequestContext, Runtime,
    Slot, Stash, StashError, StashOptions, StashValue,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

fn opts() -> StashOptions {
    StashOptions::new()
}

fn web_stash() -> Stash {
    Stash::builder()
        .web(Arc::new(MemoryBackend::new()))
        .classifier(FixedClassifier(Runtime::Web))
        .build()
        .unwrap()
}

fn file_stash(dir: &std::path::Path) -> Stash {
    Stash::builder()
        .id("app")
        .native(Arc::new(FileBackend::new(dir)))
        .classifier(FixedClassifier(Runtime::Native))
        .build()
        .unwrap()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    tags: Vec<String>,
    age: u32,
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn web_flag_set_read_delete() {
    let stash = web_stash();

    stash.set("flag", &true, &opts()).unwrap();
    assert_eq!(stash.get_boolean("flag", &opts()).unwrap(), Some(true));

    stash.delete("flag", &opts()).unwrap();
    assert_eq!(stash.get_boolean("flag", &opts()).unwrap(), None);
    assert_eq!(
        stash
            .get_boolean("flag", &opts().with_default(false))
            .unwrap(),
        Some(false)
    );
}

#[test]
fn ssr_cookie_requires_context() {
    let stash = Stash::builder()
        .ssr(Arc::new(CookieBackend::new()))
        .classifier(FixedClassifier(Runtime::Server))
        .build()
        .unwrap();

    assert!(matches!(
        stash.get_string("k", &opts()),
        Err(StashError::MissingContext {
            backend: "cookie",
            operation: "get"
        })
    ));
    assert_eq!(stash.get_string("k", &opts().silent()).unwrap(), None);
}

#[test]
fn ssr_cookie_request_round_trip() {
    let stash = Stash::builder()
        .id("shop")
        .ssr(Arc::new(CookieBackend::new()))
        .build()
        .unwrap();
    let ctx = RequestContext::from_cookie_header("shop_cart=%5B1%2C2%5D; other=x");
    let options = opts()
        .with_backend(Slot::Ssr)
        .with_context(ctx.clone())
        .with_max_age(600);

    let cart: Option<Vec<u32>> = stash.get("cart", &options).unwrap();
    assert_eq!(cart, Some(vec![1, 2]));

    stash.set("cart", &vec![1, 2, 3], &options).unwrap();
    let cart: Option<Vec<u32>> = stash.get("cart", &options).unwrap();
    assert_eq!(cart, Some(vec![1, 2, 3]));
    assert_eq!(
        ctx.set_cookie_headers(),
        vec!["shop_cart=%5B1%2C2%2C3%5D; Path=/; Max-Age=600"]
    );
}

#[test]
fn object_round_trips_through_string_medium() {
    let stash = web_stash();
    stash.set("obj", &json!({"a": 1}), &opts()).unwrap();

    let value: Option<serde_json::Value> = stash.get("obj", &opts()).unwrap();
    assert_eq!(value, Some(json!({"a": 1})));
}

// ---------------------------------------------------------------------------
// Round-trip and defaults
// ---------------------------------------------------------------------------

#[test]
fn primitives_round_trip_on_memory_and_file() {
    let dir = tempfile::tempdir().unwrap();
    for stash in [web_stash(), file_stash(dir.path())] {
        stash.set("b", &false, &opts()).unwrap();
        stash.set("n", &-12.5, &opts()).unwrap();
        stash.set("i", &42_i64, &opts()).unwrap();
        stash.set("s", "hello world", &opts()).unwrap();
        stash.set("numeric-text", "007", &opts()).unwrap();

        assert_eq!(stash.get::<bool>("b", &opts()).unwrap(), Some(false));
        assert_eq!(stash.get::<f64>("n", &opts()).unwrap(), Some(-12.5));
        assert_eq!(stash.get::<i64>("i", &opts()).unwrap(), Some(42));
        assert_eq!(
            stash.get::<String>("s", &opts()).unwrap().as_deref(),
            Some("hello world")
        );
        assert_eq!(
            stash.get_string("numeric-text", &opts()).unwrap().as_deref(),
            Some("007")
        );
    }
}

#[test]
fn structures_round_trip_on_memory_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let profile = Profile {
        name: "Ada".into(),
        tags: vec!["admin".into(), "ops".into()],
        age: 36,
    };
    for stash in [web_stash(), file_stash(dir.path())] {
        stash.set("profile", &profile, &opts()).unwrap();
        assert_eq!(
            stash.get::<Profile>("profile", &opts()).unwrap(),
            Some(profile.clone())
        );
    }
}

#[test]
fn falsy_values_are_not_absent() {
    let stash = web_stash();
    stash.set("zero", &0, &opts()).unwrap();
    stash.set("no", &false, &opts()).unwrap();

    let with_default = opts().with_default(99);
    assert_eq!(stash.get_number("zero", &with_default).unwrap(), Some(0.0));
    assert_eq!(
        stash
            .get_boolean("no", &opts().with_default(true))
            .unwrap(),
        Some(false)
    );
}

#[test]
fn empty_string_is_a_stored_value() {
    let dir = tempfile::tempdir().unwrap();
    for stash in [web_stash(), file_stash(dir.path())] {
        stash.set("empty", "", &opts()).unwrap();

        assert_eq!(
            stash.get::<String>("empty", &opts()).unwrap().as_deref(),
            Some("")
        );
        assert_eq!(
            stash
                .get::<String>("empty", &opts().with_default("fallback"))
                .unwrap()
                .as_deref(),
            Some("")
        );
        assert_eq!(
            stash
                .get_string("empty", &opts().with_default("fallback"))
                .unwrap()
                .as_deref(),
            Some("")
        );
    }
}

#[test]
fn get_boolean_rejects_non_booleans_on_every_backend() {
    let dir = tempfile::tempdir().unwrap();
    for stash in [web_stash(), file_stash(dir.path())] {
        stash.set("one", &1, &opts()).unwrap();
        stash.set("word", "hello", &opts()).unwrap();
        stash.set("yes", "true", &opts()).unwrap();

        assert!(matches!(
            stash.get_boolean("one", &opts()),
            Err(StashError::Decode { .. })
        ));
        assert!(matches!(
            stash.get_boolean("word", &opts().with_default(true)),
            Err(StashError::Decode { .. })
        ));
        assert_eq!(stash.get_boolean("yes", &opts()).unwrap(), Some(true));
    }
}

#[test]
fn integers_beyond_f64_precision_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    for stash in [web_stash(), file_stash(dir.path())] {
        assert!(matches!(
            stash.set("big", &9_007_199_254_740_993_u64, &opts()),
            Err(StashError::Encode(_))
        ));
        assert_eq!(stash.get_number("big", &opts()).unwrap(), None);

        stash.set("max", &9_007_199_254_740_992_u64, &opts()).unwrap();
        assert_eq!(
            stash.get::<u64>("max", &opts()).unwrap(),
            Some(9_007_199_254_740_992)
        );
    }
}

#[test]
fn absent_keys_return_default_or_none() {
    let stash = web_stash();
    assert_eq!(stash.get_string("missing", &opts()).unwrap(), None);
    assert_eq!(
        stash
            .get_string("missing", &opts().with_default("fallback"))
            .unwrap()
            .as_deref(),
        Some("fallback")
    );
    let profile: Option<Profile> = stash
        .get(
            "missing",
            &opts().with_default(json!({"name": "n", "tags": [], "age": 1})),
        )
        .unwrap();
    assert_eq!(profile.map(|p| p.age), Some(1));
}

#[test]
fn mistyped_default_is_a_decode_error() {
    let stash = web_stash();
    assert!(matches!(
        stash.get_number("missing", &opts().with_default("ten")),
        Err(StashError::Decode { .. })
    ));
}

#[test]
fn corrupt_json_surfaces_decode_error() {
    let backend = Arc::new(MemoryBackend::new());
    let stash = Stash::builder()
        .id("app")
        .backend(backend.clone())
        .build()
        .unwrap();
    backend
        .set("app_profile", StashValue::from("{\"name\": "), &opts())
        .unwrap();

    let err = stash.get::<Profile>("profile", &opts()).unwrap_err();
    assert!(matches!(err, StashError::Decode { ref key, .. } if key == "profile"));
}

#[test]
fn null_cannot_be_stored() {
    let stash = web_stash();
    assert!(matches!(
        stash.set("k", &None::<u8>, &opts()),
        Err(StashError::Encode(_))
    ));
}

#[test]
fn file_backend_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    file_stash(dir.path()).set("visits", &3, &opts()).unwrap();

    let reopened = file_stash(dir.path());
    assert_eq!(reopened.get_number("visits", &opts()).unwrap(), Some(3.0));
    assert!(dir.path().join("app.json").exists());
}

// ---------------------------------------------------------------------------
// Async accessors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn async_accessors_on_file_backend() {
    let dir = tempfile::tempdir().unwrap();
    let stash = file_stash(dir.path());

    stash.set_async("flag", &true, &opts()).await.unwrap();
    stash.set_async("n", &7, &opts()).await.unwrap();
    stash.set_async("obj", &json!({"a": 1}), &opts()).await.unwrap();

    assert_eq!(
        stash.get_boolean_async("flag", &opts()).await.unwrap(),
        Some(true)
    );
    assert_eq!(stash.get_number_async("n", &opts()).await.unwrap(), Some(7.0));
    assert_eq!(
        stash.get_string_async("n", &opts()).await.unwrap().as_deref(),
        Some("7")
    );
    let obj: Option<serde_json::Value> = stash.get_async("obj", &opts()).await.unwrap();
    assert_eq!(obj, Some(json!({"a": 1})));

    stash.delete_async("flag", &opts()).await.unwrap();
    assert_eq!(stash.get_boolean_async("flag", &opts()).await.unwrap(), None);

    stash.clear_all_async(&opts()).await.unwrap();
    assert_eq!(stash.get_number_async("n", &opts()).await.unwrap(), None);
}

#[tokio::test]
async fn async_accessors_apply_defaults() {
    let stash = web_stash();
    assert_eq!(
        stash
            .get_string_async("missing", &opts().with_default("d"))
            .await
            .unwrap()
            .as_deref(),
        Some("d")
    );
    let backend = stash.backend(Slot::Web).unwrap();
    assert!(!backend.capabilities().native_async);
}
