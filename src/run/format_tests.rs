#![allow(clippy::unwrap_used)]

use rust_decimal_macros::dec;

use super::*;

// ── truncate ──────────────────────────────────────────────────

#[test]
fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
    assert_eq!(truncate("hello", 5), "hello");
}

#[test]
fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 5), "hell…");
}

#[test]
fn test_truncate_zero_max() {
    assert_eq!(truncate("hello", 0), "");
}

#[test]
fn test_truncate_multibyte() {
    assert_eq!(truncate("café résumé", 5), "café…");
}

// ── format_amount ─────────────────────────────────────────────

#[test]
fn test_format_amount_basic() {
    assert_eq!(format_amount(dec!(1234.56)), "$1,234.56");
    assert_eq!(format_amount(dec!(999.99)), "$999.99");
    assert_eq!(format_amount(dec!(0)), "$0.00");
}

#[test]
fn test_format_amount_negative() {
    assert_eq!(format_amount(dec!(-42.50)), "-$42.50");
    assert_eq!(format_amount(dec!(-99999.01)), "-$99,999.01");
}

#[test]
fn test_format_amount_pads_to_two_decimals() {
    assert_eq!(format_amount(dec!(1.5)), "$1.50");
    assert_eq!(format_amount(dec!(5)), "$5.00");
}

#[test]
fn test_format_change_sign() {
    assert_eq!(format_change(dec!(20)), "+$20.00");
    assert_eq!(format_change(dec!(-3.5)), "-$3.50");
    assert_eq!(format_change(dec!(0)), "$0.00");
}

// ── progress_bar ──────────────────────────────────────────────

#[test]
fn test_progress_bar() {
    assert_eq!(progress_bar(dec!(0), 10), "[░░░░░░░░░░]");
    assert_eq!(progress_bar(dec!(45.5), 10), "[████░░░░░░]");
    assert_eq!(progress_bar(dec!(100), 10), "[██████████]");
    assert_eq!(progress_bar(dec!(250), 4), "[████]");
}
