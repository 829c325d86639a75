#![cfg_attr(docsrs, feature(doc_cfg))]
/*!
jpbp selects locations of a JSON document with a JSONPath expression and edits each of them
with a JSON Patch (RFC 6902) operation.

Every matched location is translated into a JSON Pointer (RFC 6901) and patched in turn,
each operation seeing the result of the previous one.

```
use jpbp::{PatchEngine, PatchKind, PatchOptions, PatchRequest};

let engine = PatchEngine::new(PatchOptions::default());
let request = PatchRequest::new(
    r#"{"v":[{"x":"test1","y":1},{"x":"test2","y":2}]}"#,
    "$.v[?(@.x=='test2')].y",
    PatchKind::Replace,
    "20",
);

assert_eq!(
    r#"{"v":[{"x":"test1","y":1},{"x":"test2","y":20}]}"#,
    engine.apply(&request).unwrap()
);
```
*/

pub mod cli;
mod engine;
mod error;
mod executor;
mod json_path;
mod location;
mod parsing;
mod patch;
pub mod pointer;
mod resolver;

pub use engine::*;
pub use error::*;
pub use executor::*;
pub use json_path::JsonPath;
pub use location::*;
pub use patch::*;
pub use pointer::{translate, JsonPointer, ReferenceToken};
pub use resolver::*;

#[cfg(test)]
mod tests;
