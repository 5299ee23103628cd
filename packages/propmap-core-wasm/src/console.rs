// Log sink behind the console_log! macro (defined in lib.rs).
// In the browser this is console.log; natively it goes to stderr so tests can run off-browser.

#[cfg(target_arch = "wasm32")]
pub fn log(s: &str) {
    web_sys::console::log_1(&wasm_bindgen::JsValue::from_str(s));
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log(s: &str) {
    eprintln!("{}", s);
}
