//! JavaScript bindings. Spaces, options and results cross the boundary as JSON text.

use wasm_bindgen::prelude::*;

use crate::api;
use crate::error::FlowError;

fn to_js(err: FlowError) -> JsValue {
    // the payload keeps the error kind visible to callers
    let message = serde_json::to_string(&err.payload()).unwrap_or_else(|_| err.to_string());
    js_sys::Error::new(&message).into()
}

/// Compile a space and return its preview graph `{ nodes, edges, terminals }`.
#[wasm_bindgen(js_name = graphJson)]
pub fn graph_json(space_json: &str) -> Result<String, JsValue> {
    api::graph_json(space_json).map_err(to_js)
}

/// Solve a space; `options_json` is `{ backend, fillRequired, deadlineMs }` or empty for defaults.
#[wasm_bindgen(js_name = solveJson)]
pub fn solve_json(space_json: &str, options_json: &str) -> Result<String, JsValue> {
    api::solve_json(space_json, options_json).map_err(to_js)
}
