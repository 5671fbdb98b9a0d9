use serde::de::DeserializeOwned;
use shared::models::{EmployerProfile, ItianProfile};

use super::JobBoardClient;
use crate::error::{ErrorKind, GatewayResult};

/// Profile endpoints answer either with the profile or with `{ "data": profile }`.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ProfileBody<T> {
    Wrapped { data: T },
    Bare(T),
}

impl JobBoardClient {
    /// The signed-in employer's company profile; `None` when it has not been created yet.
    ///
    /// # Errors
    /// Returns the classified gateway error for anything other than "not found".
    pub async fn employer_profile(&self) -> GatewayResult<Option<EmployerProfile>> {
        self.optional_profile("employer-profile").await
    }

    /// The signed-in graduate's candidate profile; `None` when it has not been created yet.
    ///
    /// # Errors
    /// Returns the classified gateway error for anything other than "not found".
    pub async fn itian_profile(&self) -> GatewayResult<Option<ItianProfile>> {
        self.optional_profile("itian-profile").await
    }

    async fn optional_profile<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<Option<T>> {
        let url = self.api_url(path);
        match self.send_json::<ProfileBody<T>>(self.http().get(url)).await {
            Ok(ProfileBody::Wrapped { data } | ProfileBody::Bare(data)) => Ok(Some(data)),
            Err(err) if err.is(ErrorKind::NotFound) => {
                tracing::debug!(path, "profile not found");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
