//! Replayable request bodies.
//!
//! Bodies are kept as plain data instead of transport-specific forms so a queued request can be
//! re-sent verbatim after a token refresh.

// self
use crate::_prelude::*;

/// Body attached to a [`RequestDescriptor`](crate::request::RequestDescriptor).
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
	/// Structured value serialized as JSON.
	Json(serde_json::Value),
	/// Multipart form; the transport computes the boundary and content type.
	Multipart(MultipartPayload),
}
impl RequestBody {
	/// Returns `true` for multipart payloads.
	pub fn is_multipart(&self) -> bool {
		matches!(self, Self::Multipart(_))
	}
}

/// Ordered list of multipart parts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartPayload {
	/// Parts in submission order.
	pub parts: Vec<MultipartPart>,
}
impl MultipartPayload {
	/// Creates an empty payload.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a text field.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parts.push(MultipartPart {
			name: name.into(),
			value: PartValue::Text(value.into()),
			file_name: None,
			mime: None,
		});

		self
	}

	/// Appends a file field.
	pub fn file(
		mut self,
		name: impl Into<String>,
		file_name: impl Into<String>,
		bytes: impl Into<Vec<u8>>,
		mime: Option<&str>,
	) -> Self {
		self.parts.push(MultipartPart {
			name: name.into(),
			value: PartValue::Bytes(bytes.into()),
			file_name: Some(file_name.into()),
			mime: mime.map(str::to_owned),
		});

		self
	}

	/// Number of parts.
	pub fn len(&self) -> usize {
		self.parts.len()
	}

	/// Returns true if no parts were added.
	pub fn is_empty(&self) -> bool {
		self.parts.is_empty()
	}
}

/// Single multipart field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartPart {
	/// Form field name.
	pub name: String,
	/// Field content.
	pub value: PartValue,
	/// File name advertised for file parts.
	pub file_name: Option<String>,
	/// Explicit MIME type for the part.
	pub mime: Option<String>,
}

/// Content of a multipart field.
#[derive(Clone, PartialEq, Eq)]
pub enum PartValue {
	/// UTF-8 text.
	Text(String),
	/// Raw bytes (file uploads).
	Bytes(Vec<u8>),
}
impl Debug for PartValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn multipart_builder_keeps_order() {
		let payload = MultipartPayload::new()
			.text("title", "Lot 14, Riverside")
			.file("plan", "plan.pdf", b"%PDF".to_vec(), Some("application/pdf"));

		assert_eq!(payload.len(), 2);
		assert_eq!(payload.parts[0].name, "title");
		assert_eq!(payload.parts[1].file_name.as_deref(), Some("plan.pdf"));
		assert_eq!(format!("{:?}", payload.parts[1].value), "Bytes(4 bytes)");
		assert!(RequestBody::Multipart(payload).is_multipart());
		assert!(!RequestBody::Json(serde_json::json!({})).is_multipart());
	}
}
