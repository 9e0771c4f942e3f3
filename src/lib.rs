//! Authenticated HTTP client for back-office admin APIs: bearer annotation, single-flight token
//! refresh with queued replays, and explicit session termination events.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod request;
pub mod session;
pub mod store;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use ::http::{HeaderMap, HeaderName, HeaderValue, Method};
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
