use logrecover::{gb_to_bytes, secs_to_pause};
use std::time::Duration;

#[test]
fn pause_seconds_are_converted_or_rejected() {
    assert_eq!(secs_to_pause(2.0).unwrap(), Duration::from_secs(2));
    assert_eq!(secs_to_pause(0.25).unwrap(), Duration::from_millis(250));
    assert_eq!(secs_to_pause(0.0).unwrap(), Duration::ZERO);

    // Finite but far beyond what a Duration can hold.
    assert!(secs_to_pause(1e30).is_err());
    assert!(secs_to_pause(-1.0).is_err());
    assert!(secs_to_pause(f64::NAN).is_err());
    assert!(secs_to_pause(f64::INFINITY).is_err());
}

#[test]
fn max_size_in_gb_is_converted_or_rejected() {
    assert_eq!(gb_to_bytes(1.0).unwrap(), 1 << 30);
    assert_eq!(gb_to_bytes(0.5).unwrap(), 1 << 29);
    assert!(gb_to_bytes(0.0).is_err());
    assert!(gb_to_bytes(-2.0).is_err());
    assert!(gb_to_bytes(f64::NAN).is_err());
}
