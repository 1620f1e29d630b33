use serde::{Deserialize, Serialize};

/// Username input for the search endpoints, as a query string or JSON body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema, utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct UsernameQuery {
    /// Handle to look up. Letters, digits, `_` and `-`; at most 100 characters.
    #[serde(default)]
    pub username: String,
}

impl UsernameQuery {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}
