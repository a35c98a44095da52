//! Compile-level checks on generated shims, plus direct calls to the
//! original functions, which must stay usable without crossing any boundary.

use wasmfold_guest::plugin_export;

#[plugin_export]
pub fn double(s: String) -> String {
    s.repeat(2)
}

#[plugin_export]
pub fn repeat_multiply(pair: (u8, String)) -> (u8, String) {
    let (count, s) = pair;
    let repeated = s.repeat(count as usize);
    (count.wrapping_mul(s.len() as u8), repeated)
}

#[test]
fn original_functions_stay_directly_callable() {
    assert_eq!(double("hello".to_string()), "hellohello");
    assert_eq!(
        repeat_multiply((3, "ab".to_string())),
        (6, "ababab".to_string())
    );
}

#[test]
fn shims_have_the_boundary_signature() {
    // The generated exports coerce to the two-integer-in, one-integer-out
    // shape the host binds. Never called here: on a native target the raw
    // Length Slot write in `publish` has no linear memory behind it.
    let _double_shim: extern "C" fn(i32, u32) -> i32 = _double;
    let _repeat_shim: extern "C" fn(i32, u32) -> i32 = _repeat_multiply;
}

#[test]
fn payload_round_trip_through_guest_helpers() {
    let encoded = wasmfold_guest::encode_result(&(3u8, "ab".to_string())).unwrap();
    let decoded: (u8, String) = wasmfold_guest::decode_payload(&encoded).unwrap();
    assert_eq!(decoded, (3, "ab".to_string()));
}
