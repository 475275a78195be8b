use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use siphon_core::{CoreError, Disposable, DisposedFlag, Scope};

/// Fixture: disposable que registra su liberación en un log compartido.
struct TrackedResource {
    label: String,
    log: Arc<Mutex<Vec<String>>>,
    fail_on_dispose: bool,
    disposed: DisposedFlag,
}

impl TrackedResource {
    fn new(label: &str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self { label: label.to_string(),
                        log: log.clone(),
                        fail_on_dispose: false,
                        disposed: DisposedFlag::new() })
    }

    fn failing(label: &str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self { label: label.to_string(),
                        log: log.clone(),
                        fail_on_dispose: true,
                        disposed: DisposedFlag::new() })
    }
}

impl Disposable for TrackedResource {
    fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    fn dispose(&self) -> Result<(), CoreError> {
        if self.disposed.mark() {
            self.log.lock().unwrap().push(self.label.clone());
            if self.fail_on_dispose {
                // Surfaces the release error but stays marked as disposed.
                return Err(CoreError::permanent(format!("release of '{}' failed", self.label)));
            }
        }
        Ok(())
    }
}

#[test]
fn test_dispose_is_idempotent() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let resource = TrackedResource::new("r1", &log);

    assert!(!resource.is_disposed());
    resource.dispose().unwrap();
    assert!(resource.is_disposed());

    // Second dispose is a no-op, not an error.
    resource.dispose().unwrap();
    assert_eq!(log.lock().unwrap().len(), 1, "release must run exactly once");
}

#[test]
fn test_guarded_operations_fail_after_dispose() {
    let flag = DisposedFlag::new();
    assert!(flag.guard("resource").is_ok());

    flag.mark();
    let err = flag.guard("resource").unwrap_err();
    assert!(matches!(err, CoreError::ResourceDisposed(_)));
}

#[test]
fn test_dispose_error_still_marks_disposed() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let resource = TrackedResource::failing("r1", &log);

    assert!(resource.dispose().is_err());
    assert!(resource.is_disposed());
    // The second call is still a quiet no-op.
    resource.dispose().unwrap();
}

#[test]
fn test_scope_disposes_in_lifo_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let first = TrackedResource::new("first", &log);
    let second = TrackedResource::new("second", &log);
    let third = TrackedResource::new("third", &log);

    {
        let mut scope = Scope::new("test");
        scope.adopt("first", first.clone());
        scope.adopt("second", second.clone());
        scope.adopt("third", third.clone());
        assert_eq!(scope.len(), 3);
    }

    assert!(first.is_disposed() && second.is_disposed() && third.is_disposed());
    assert_eq!(*log.lock().unwrap(), vec!["third", "second", "first"]);
}

#[test]
fn test_nested_scopes_release_inner_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let outer = TrackedResource::new("outer", &log);
    let inner = TrackedResource::new("inner", &log);

    {
        let mut outer_scope = Scope::new("outer");
        outer_scope.adopt("outer", outer.clone());
        {
            let mut inner_scope = Scope::new("inner");
            inner_scope.adopt("inner", inner.clone());
        }
        assert!(inner.is_disposed());
        assert!(!outer.is_disposed());
    }

    assert_eq!(*log.lock().unwrap(), vec!["inner", "outer"]);
}

#[test]
fn test_scope_disposes_on_panic() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let resource = TrackedResource::new("r1", &log);

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let mut scope = Scope::new("panicking");
        scope.adopt("r1", resource.clone());
        panic!("boom");
    }));

    assert!(result.is_err());
    assert!(resource.is_disposed(), "scope exit on panic must still dispose");
}

#[test]
fn test_scope_suppresses_dispose_errors() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let failing = TrackedResource::failing("bad", &log);
    let healthy = TrackedResource::new("good", &log);

    {
        let mut scope = Scope::new("test");
        scope.adopt("good", healthy.clone());
        scope.adopt("bad", failing.clone());
    }

    // The failing release did not prevent the rest of the teardown.
    assert!(failing.is_disposed());
    assert!(healthy.is_disposed());
    assert_eq!(*log.lock().unwrap(), vec!["bad", "good"]);
}

#[test]
fn test_scope_skips_already_disposed_resources() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let resource = TrackedResource::new("r1", &log);

    let mut scope = Scope::new("test");
    scope.adopt("r1", resource.clone());
    resource.dispose().unwrap();
    scope.dispose_all();

    assert_eq!(log.lock().unwrap().len(), 1);
}
