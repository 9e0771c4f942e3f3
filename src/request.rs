//! Outgoing request descriptors and the annotator that stamps credentials onto them.
//!
//! `descriptor` holds the replayable request value (method, URL, headers, body, retry marker),
//! `body` models JSON and multipart payloads in a cloneable form, and `annotator` applies the
//! per-call header rules: bearer injection and multipart content-type removal.

pub mod annotator;
pub mod body;
pub mod descriptor;

pub use annotator::*;
pub use body::*;
pub use descriptor::*;
