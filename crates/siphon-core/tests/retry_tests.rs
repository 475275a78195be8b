//! Tests del combinador de reintentos con el reloj de tokio pausado: los
//! sleeps avanzan el tiempo virtual, así las propiedades de backoff y
//! deadline se asertan de forma determinista.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use siphon_core::{CoreError, RetryPolicy, RetrySettings};

fn settings(initial: f64, maximum: f64, factor: f64, deadline: Option<f64>) -> RetrySettings {
    RetrySettings { enable_retries: true,
                    default_deadline: deadline,
                    default_initial_delay: initial,
                    default_maximum_delay: maximum,
                    default_multiplicative_factor: factor }
}

#[tokio::test(start_paused = true)]
async fn test_success_on_first_attempt_does_not_sleep() {
    let policy = RetryPolicy::default();
    let start = Instant::now();

    let attempts = Arc::new(AtomicUsize::new(0));
    let result = policy.run("op", || {
                           let attempts = attempts.clone();
                           async move {
                               attempts.fetch_add(1, Ordering::SeqCst);
                               Ok::<_, CoreError>(42)
                           }
                       })
                       .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_transient_then_success() {
    // S2: falla transitoria en los intentos 1 y 2, éxito en el 3.
    let policy = RetryPolicy::from_settings(&RetrySettings::default()).unwrap();
    let start = Instant::now();

    let attempts = Arc::new(AtomicUsize::new(0));
    let result = policy.run("consume", || {
                           let attempts = attempts.clone();
                           async move {
                               let n = attempts.fetch_add(1, Ordering::SeqCst);
                               if n < 2 {
                                   Err(CoreError::transient("connection reset"))
                               } else {
                                   Ok(n)
                               }
                           }
                       })
                       .await;

    assert_eq!(result.unwrap(), 2);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    // Jitter acotado: sleep1 <= 1 s y sleep2 <= 2 s.
    assert!(start.elapsed() <= Duration::from_secs_f64(3.0));
}

#[tokio::test(start_paused = true)]
async fn test_permanent_errors_are_not_retried() {
    let policy = RetryPolicy::default();

    let attempts = Arc::new(AtomicUsize::new(0));
    let err = policy.run("op", || {
                        let attempts = attempts.clone();
                        async move {
                            attempts.fetch_add(1, Ordering::SeqCst);
                            Err::<(), _>(CoreError::permanent("schema mismatch"))
                        }
                    })
                    .await
                    .unwrap_err();

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(err, CoreError::permanent("schema mismatch"));
}

#[tokio::test(start_paused = true)]
async fn test_disabled_policy_attempts_exactly_once() {
    let policy = RetryPolicy::disabled();

    let attempts = Arc::new(AtomicUsize::new(0));
    let err = policy.run("op", || {
                        let attempts = attempts.clone();
                        async move {
                            attempts.fetch_add(1, Ordering::SeqCst);
                            Err::<(), _>(CoreError::transient("boom"))
                        }
                    })
                    .await
                    .unwrap_err();

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(err.is_transient(), "el error debe salir sin envolver");
}

#[tokio::test(start_paused = true)]
async fn test_custom_predicate_controls_retries() {
    // Un predicate que nunca acepta: ni los transitorios se reintentan.
    let policy = RetryPolicy::default().with_predicate(Arc::new(|_| false));

    let attempts = Arc::new(AtomicUsize::new(0));
    let _ = policy.run("op", || {
                      let attempts = attempts.clone();
                      async move {
                          attempts.fetch_add(1, Ordering::SeqCst);
                          Err::<(), _>(CoreError::transient("boom"))
                      }
                  })
                  .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_exceeded_wraps_last_cause() {
    // S3: la operación falla transitoriamente para siempre; con deadline de
    // 5 s el combinador corta en ~5 s envolviendo la última causa.
    let policy = RetryPolicy::from_settings(&settings(1.0, 60.0, 2.0, Some(5.0))).unwrap();
    let start = Instant::now();

    let err = policy.run("draw_metas", || async { Err::<(), _>(CoreError::transient("still down")) })
                    .await
                    .unwrap_err();

    match err {
        CoreError::RetryDeadlineExceeded(cause) => {
            assert_eq!(*cause, CoreError::transient("still down"));
        }
        other => panic!("se esperaba RetryDeadlineExceeded, llegó {other:?}"),
    }
    // Los sleeps se recortan exactamente al deadline (reloj virtual).
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs_f64(4.9) && elapsed <= Duration::from_secs_f64(5.1),
            "elapsed fuera del deadline: {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_sleep_stays_within_growing_ceiling() {
    // Propiedad 5: cada sleep observado cae en [0, delay] con delay
    // creciendo por factor hasta el máximo.
    let policy = RetryPolicy::from_settings(&settings(1.0, 4.0, 2.0, None)).unwrap();

    let instants: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
    let attempts = Arc::new(AtomicUsize::new(0));
    let result = policy.run("op", || {
                           let instants = instants.clone();
                           let attempts = attempts.clone();
                           async move {
                               instants.lock().unwrap().push(Instant::now());
                               let n = attempts.fetch_add(1, Ordering::SeqCst);
                               if n < 6 {
                                   Err(CoreError::transient("boom"))
                               } else {
                                   Ok(())
                               }
                           }
                       })
                       .await;
    result.unwrap();

    let instants = instants.lock().unwrap();
    assert_eq!(instants.len(), 7);

    // Techos: 1, 2, 4, 4, 4, 4 (cap en maximum_delay).
    let ceilings = [1.0, 2.0, 4.0, 4.0, 4.0, 4.0];
    for (i, window) in instants.windows(2).enumerate() {
        let gap = window[1].duration_since(window[0]);
        assert!(gap <= Duration::from_secs_f64(ceilings[i] + 0.01),
                "sleep #{i} de {gap:?} superó el techo {}", ceilings[i]);
    }
}

#[test]
fn test_settings_validation_rejects_non_positive_values() {
    assert!(settings(0.0, 60.0, 2.0, Some(300.0)).validate().is_err());
    assert!(settings(-1.0, 60.0, 2.0, Some(300.0)).validate().is_err());
    assert!(settings(1.0, 0.0, 2.0, Some(300.0)).validate().is_err());
    assert!(settings(1.0, 60.0, 0.5, Some(300.0)).validate().is_err());
    assert!(settings(1.0, 60.0, 2.0, Some(0.0)).validate().is_err());
    assert!(settings(1.0, f64::NAN, 2.0, Some(300.0)).validate().is_err());

    let err = settings(0.0, 60.0, 2.0, None).validate().unwrap_err();
    assert!(matches!(err, CoreError::ImproperlyConfigured(_)));
}

#[test]
fn test_settings_defaults_match_contract() {
    let defaults = RetrySettings::default();
    assert!(defaults.enable_retries);
    assert_eq!(defaults.default_initial_delay, 1.0);
    assert_eq!(defaults.default_maximum_delay, 60.0);
    assert_eq!(defaults.default_multiplicative_factor, 2.0);
    assert_eq!(defaults.default_deadline, Some(300.0));
    defaults.validate().unwrap();
}
