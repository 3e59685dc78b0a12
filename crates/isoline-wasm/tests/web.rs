#![cfg(target_arch = "wasm32")]

use isoline_wasm::TerrainSession;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;

#[wasm_bindgen_test]
fn session_ticks_and_exposes_uniforms() {
    let mut s = TerrainSession::new("", 640, 480, 2.0).unwrap();
    s.tick(0.25).unwrap();
    let u = s.uniforms().to_vec();
    assert_eq!(u.len(), TerrainSession::uniform_names().length() as usize);
    assert_eq!(u[9], 0.25);
    assert!(s.take_contour_upload().is_some());
    assert!(s.take_contour_upload().is_none());
}

#[wasm_bindgen_test]
fn set_param_accepts_labels_and_colors() {
    let mut s = TerrainSession::new("", 640, 480, 1.0).unwrap();
    s.set_param("uElevation", JsValue::from_f64(3.0)).unwrap();
    s.set_param("clearColor", JsValue::from_str("#ff0000")).unwrap();
    assert!(s.set_param("nope", JsValue::from_f64(1.0)).is_err());
    s.tick(0.0).unwrap();
    assert_eq!(s.uniforms().to_vec()[0], 3.0);
    assert_eq!(s.clear_color().to_vec(), vec![1.0, 0.0, 0.0]);
}

#[wasm_bindgen_test]
fn set_param_returns_a_plain_object() {
    let mut s = TerrainSession::new("", 640, 480, 1.0).unwrap();
    let out = s.set_param("uElevation", JsValue::from_f64(9.0)).unwrap();
    assert!(out.is_object());
    assert!(!out.is_instance_of::<js_sys::Map>());
    let clamped = js_sys::Reflect::get(&out, &JsValue::from_str("clamped")).unwrap();
    assert_eq!(clamped.as_bool(), Some(true));
    let value = js_sys::Reflect::get(&out, &JsValue::from_str("value")).unwrap();
    assert_eq!(value.as_f64(), Some(5.0));
}

#[wasm_bindgen_test]
fn stopped_session_returns_null() {
    let mut s = TerrainSession::new("", 320, 240, 1.0).unwrap();
    s.stop();
    assert!(s.stopped());
    assert!(s.tick(1.0).unwrap().is_null());
}
