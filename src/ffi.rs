//! FFI bindings for Synheart Energy
//!
//! This module provides C-compatible functions for calling the engine from the
//! host app. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `energy_free_string`.
//!
//! Samples are passed as energy.raw_sample.v1 records (JSON array or NDJSON),
//! dates as `YYYY-MM-DD`, and timezones as `UTC` or a `±HH:MM` offset.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::pipeline::{samples_to_features_json, samples_to_forecast_json, EnergyProcessor};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => {
            set_last_error("Result contains an interior NUL byte");
            ptr::null_mut()
        }
    }
}

/// Read the three string arguments shared by every entry point
unsafe fn read_request(
    samples: *const c_char,
    date: *const c_char,
    timezone: *const c_char,
) -> Option<(String, String, String)> {
    let Some(samples) = cstr_to_string(samples) else {
        set_last_error("Invalid samples string pointer");
        return None;
    };
    let Some(date) = cstr_to_string(date) else {
        set_last_error("Invalid date string pointer");
        return None;
    };
    let Some(timezone) = cstr_to_string(timezone) else {
        set_last_error("Invalid timezone string pointer");
        return None;
    };
    Some((samples, date, timezone))
}

/// Hand a result to the caller, recording the error on failure
fn into_c_result(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Negative values map to 0, which the config layer replaces with its default
fn non_negative_or_zero(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Predict a local day and return an energy.forecast.v1 JSON payload.
///
/// # Safety
/// - `samples`, `date`, and `timezone` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `energy_free_string`.
/// - Returns NULL on error; call `energy_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn energy_predict_day(
    samples: *const c_char,
    date: *const c_char,
    timezone: *const c_char,
    bin_width_minutes: i32,
) -> *mut c_char {
    clear_last_error();

    let Some((samples, date, timezone)) = read_request(samples, date, timezone) else {
        return ptr::null_mut();
    };

    into_c_result(samples_to_forecast_json(
        &samples,
        &date,
        &timezone,
        non_negative_or_zero(bin_width_minutes),
    ))
}

/// Build the feature rows for a local day and return them as a JSON array.
///
/// # Safety
/// - `samples`, `date`, and `timezone` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `energy_free_string`.
/// - Returns NULL on error; call `energy_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn energy_build_features(
    samples: *const c_char,
    date: *const c_char,
    timezone: *const c_char,
    bin_width_minutes: i32,
) -> *mut c_char {
    clear_last_error();

    let Some((samples, date, timezone)) = read_request(samples, date, timezone) else {
        return ptr::null_mut();
    };

    into_c_result(samples_to_features_json(
        &samples,
        &date,
        &timezone,
        non_negative_or_zero(bin_width_minutes),
    ))
}

// ============================================================================
// Processor API
// ============================================================================

/// Opaque handle to an EnergyProcessor
pub struct EnergyProcessorHandle {
    processor: EnergyProcessor,
}

/// Create a new EnergyProcessor.
///
/// `bin_width_minutes` must be 30 or 60; other values fall back to 60.
/// `baseline_window_days <= 0` selects the default window.
///
/// # Safety
/// - Returns a pointer to a newly allocated EnergyProcessor.
/// - Must be freed with `energy_processor_free`.
#[no_mangle]
pub unsafe extern "C" fn energy_processor_new(
    bin_width_minutes: i32,
    baseline_window_days: i32,
) -> *mut EnergyProcessorHandle {
    clear_last_error();

    let config = EngineConfig::default()
        .with_bin_width(non_negative_or_zero(bin_width_minutes))
        .with_baseline_window(non_negative_or_zero(baseline_window_days));

    let handle = Box::new(EnergyProcessorHandle {
        processor: EnergyProcessor::new(config),
    });
    Box::into_raw(handle)
}

/// Create an EnergyProcessor from an EngineConfig JSON document.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string.
/// - Must be freed with `energy_processor_free`.
/// - Returns NULL on error; call `energy_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn energy_processor_from_config(
    config_json: *const c_char,
) -> *mut EnergyProcessorHandle {
    clear_last_error();

    let Some(json) = cstr_to_string(config_json) else {
        set_last_error("Invalid config string pointer");
        return ptr::null_mut();
    };

    match EnergyProcessor::from_config_json(&json) {
        Ok(processor) => Box::into_raw(Box::new(EnergyProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an EnergyProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `energy_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn energy_processor_free(processor: *mut EnergyProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Predict a local day with a processor's configuration.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `energy_processor_new`.
/// - `samples`, `date`, and `timezone` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `energy_free_string`.
/// - Returns NULL on error; call `energy_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn energy_processor_predict(
    processor: *const EnergyProcessorHandle,
    samples: *const c_char,
    date: *const c_char,
    timezone: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let Some((samples, date, timezone)) = read_request(samples, date, timezone) else {
        return ptr::null_mut();
    };

    into_c_result(handle.processor.process_samples(&samples, &date, &timezone))
}

/// Build feature rows with a processor's configuration.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `energy_processor_new`.
/// - `samples`, `date`, and `timezone` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `energy_free_string`.
/// - Returns NULL on error; call `energy_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn energy_processor_features(
    processor: *const EnergyProcessorHandle,
    samples: *const c_char,
    date: *const c_char,
    timezone: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let Some((samples, date, timezone)) = read_request(samples, date, timezone) else {
        return ptr::null_mut();
    };

    into_c_result(
        handle
            .processor
            .features_from_samples(&samples, &date, &timezone),
    )
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by energy functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an energy function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn energy_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next energy function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn energy_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the engine version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn energy_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
