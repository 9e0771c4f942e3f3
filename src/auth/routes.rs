//! Exempt route modeling for authentication endpoints.
//!
//! Requests whose URL path starts with one of these patterns, on a segment boundary, never enter
//! refresh handling and never trigger a session redirect, because the refresh flow itself
//! depends on them.

// self
use crate::_prelude::*;

/// Errors emitted when validating exempt route patterns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RouteError {
	/// Empty patterns would match every request.
	#[error("Exempt route patterns cannot be empty.")]
	Empty,
	/// Patterns must be absolute paths.
	#[error("Exempt route pattern must start with `/`: {pattern}.")]
	NotAbsolute {
		/// The offending pattern.
		pattern: String,
	},
	/// Patterns cannot contain embedded whitespace characters.
	#[error("Exempt route pattern contains whitespace: {pattern}.")]
	ContainsWhitespace {
		/// The offending pattern.
		pattern: String,
	},
}

/// Ordered, de-duplicated set of URL path patterns exempt from refresh handling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExemptRoutes(Vec<String>);
impl ExemptRoutes {
	/// Login endpoint.
	pub const LOGIN: &'static str = "/auth/login";
	/// Registration endpoint.
	pub const REGISTER: &'static str = "/auth/register";
	/// Forgot-password endpoint.
	pub const FORGOT_PASSWORD: &'static str = "/auth/forgot-password";
	/// Reset-password endpoint.
	pub const RESET_PASSWORD: &'static str = "/auth/reset-password";

	/// Creates a validated route set from any iterator of patterns.
	pub fn new<I, S>(patterns: I) -> Result<Self, RouteError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut routes = Self(Vec::new());

		for pattern in patterns {
			routes.insert(pattern)?;
		}

		Ok(routes)
	}

	/// Adds a pattern unless it is already present.
	pub fn insert(&mut self, pattern: impl Into<String>) -> Result<(), RouteError> {
		let pattern = pattern.into();

		validate_pattern(&pattern)?;

		if !self.0.contains(&pattern) {
			self.0.push(pattern);
		}

		Ok(())
	}

	/// Returns a copy with every pattern moved under `base_path` (the API mount point).
	///
	/// `/auth/login` mounted at `/api/v1/` becomes `/api/v1/auth/login`.
	pub fn mount(&self, base_path: &str) -> Self {
		let base = base_path.trim_end_matches('/');

		if base.is_empty() {
			return self.clone();
		}

		let mut mounted = Vec::with_capacity(self.0.len());

		for pattern in &self.0 {
			let pattern = format!("{base}{pattern}");

			if !mounted.contains(&pattern) {
				mounted.push(pattern);
			}
		}

		Self(mounted)
	}

	/// Returns `true` when the URL's path falls under any exempt pattern.
	pub fn matches(&self, url: &Url) -> bool {
		self.matches_path(url.path())
	}

	/// Path-only variant of [`matches`](Self::matches).
	///
	/// A pattern matches the path itself and anything below it, never a longer sibling:
	/// `/auth/login` covers `/auth/login/sso` but not `/auth/login-history`.
	pub fn matches_path(&self, path: &str) -> bool {
		self.0.iter().any(|pattern| {
			let pattern = pattern.trim_end_matches('/');

			path.strip_prefix(pattern).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
		})
	}

	/// Iterator over the configured patterns.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Number of patterns.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no patterns are configured.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Default for ExemptRoutes {
	fn default() -> Self {
		Self(
			[Self::LOGIN, Self::REGISTER, Self::FORGOT_PASSWORD, Self::RESET_PASSWORD]
				.into_iter()
				.map(str::to_owned)
				.collect(),
		)
	}
}

fn validate_pattern(pattern: &str) -> Result<(), RouteError> {
	if pattern.is_empty() {
		return Err(RouteError::Empty);
	}
	if !pattern.starts_with('/') {
		return Err(RouteError::NotAbsolute { pattern: pattern.to_owned() });
	}
	if pattern.chars().any(char::is_whitespace) {
		return Err(RouteError::ContainsWhitespace { pattern: pattern.to_owned() });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Fixture URL should parse.")
	}

	#[test]
	fn default_routes_cover_auth_endpoints() {
		let routes = ExemptRoutes::default();

		assert_eq!(routes.len(), 4);
		assert!(routes.matches(&url("https://api.example.com/auth/login")));
		assert!(routes.matches(&url("https://api.example.com/auth/register?ref=x")));
		assert!(routes.matches(&url("https://api.example.com/auth/forgot-password")));
		assert!(routes.matches(&url("https://api.example.com/auth/reset-password")));
		assert!(!routes.matches(&url("https://api.example.com/auth/refresh-token")));
		assert!(!routes.matches(&url("https://api.example.com/properties")));
	}

	#[test]
	fn patterns_stop_at_segment_boundaries() {
		let routes = ExemptRoutes::default();

		assert!(routes.matches_path("/auth/login/"));
		assert!(routes.matches_path("/auth/login/sso"));
		assert!(!routes.matches_path("/auth/login-history"));
		assert!(!routes.matches_path("/reports/auth/login"));
		assert!(!routes.matches_path("/auth"));
	}

	#[test]
	fn mounted_routes_follow_the_api_prefix() {
		let routes = ExemptRoutes::default().mount("/api/v1/");

		assert!(routes.matches(&url("https://api.example.com/api/v1/auth/register?ref=x")));
		assert!(!routes.matches(&url("https://api.example.com/auth/register")));
		assert!(!routes.matches(&url("https://api.example.com/api/v1/reports/auth/login")));
		assert_eq!(ExemptRoutes::default().mount("/"), ExemptRoutes::default());
	}

	#[test]
	fn query_strings_do_not_count_as_paths() {
		let routes = ExemptRoutes::default();

		assert!(!routes.matches(&url("https://api.example.com/brokers?next=/auth/login")));
	}

	#[test]
	fn patterns_are_validated_and_deduplicated() {
		assert_eq!(ExemptRoutes::new([""]), Err(RouteError::Empty));
		assert!(matches!(ExemptRoutes::new(["auth/login"]), Err(RouteError::NotAbsolute { .. })));
		assert!(matches!(
			ExemptRoutes::new(["/auth/ login"]),
			Err(RouteError::ContainsWhitespace { .. })
		));

		let routes = ExemptRoutes::new(["/sso/login", "/sso/login"])
			.expect("Duplicate patterns should collapse.");

		assert_eq!(routes.iter().collect::<Vec<_>>(), vec!["/sso/login"]);
	}
}
