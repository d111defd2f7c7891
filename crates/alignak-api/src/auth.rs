// Backend authentication
//
// Two entry points: username/password exchanges credentials for a token
// at `POST /login`; token login installs a known token and proves it by
// reading the user it belongs to.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, warn};

use crate::client::{BackendClient, error_from_response};
use crate::error::Error;
use crate::models::LoginResponse;
use crate::params::QueryParams;

impl BackendClient {
    /// Authenticate with username and password.
    ///
    /// `POST /login` with `{"username", "password"}`; the returned token is
    /// kept for every later request. A refused login is not retried.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.endpoint_url("login")?;
        debug!(username, "logging in at {url}");

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp = match self.http().post(url).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) => {
                self.set_connected(false);
                return Err(Error::Transport(e));
            }
        };

        let status = resp.status();
        if status.is_server_error() {
            return Err(error_from_response(resp).await);
        }

        // The backend answered, whatever it said.
        self.set_connected(true);

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: format!("invalid credentials for user '{username}'"),
            });
        }
        if !status.is_success() {
            let err = error_from_response(resp).await;
            return Err(Error::Authentication {
                message: format!("login refused: {err}"),
            });
        }

        let login: LoginResponse = resp.json().await?;
        let token = login.token.filter(|t| !t.is_empty()).ok_or_else(|| {
            Error::Authentication {
                message: "backend returned no token".into(),
            }
        })?;

        self.set_token(Some(SecretString::from(token)));
        debug!("login successful");
        Ok(())
    }

    /// Authenticate with an existing token.
    ///
    /// The token is installed optimistically, then validated by reading
    /// `GET /user?where={"token": ..}`. An empty answer means the backend
    /// does not know the token: it is dropped and the login fails.
    pub async fn login_with_token(&self, token: SecretString) -> Result<(), Error> {
        let lookup = QueryParams::new()
            .with_filter(json!({ "token": token.expose_secret() }))
            .with_projection(["name"])
            .with_max_results(1);

        self.set_token(Some(token));

        match self.get("user", &lookup).await {
            Ok(page) if !page.items.is_empty() => {
                debug!("token login successful");
                Ok(())
            }
            Ok(_) => {
                self.set_token(None);
                Err(Error::Authentication {
                    message: "token is not known by the backend".into(),
                })
            }
            Err(e) => {
                self.set_token(None);
                Err(e)
            }
        }
    }

    /// End the session. The token is always forgotten locally, even if
    /// the backend cannot be told.
    pub async fn logout(&self) -> Result<(), Error> {
        if !self.is_authenticated() {
            return Ok(());
        }

        let result = self.post("logout", &json!({})).await.map(|_| ());
        if let Err(ref e) = result {
            warn!(error = %e, "logout request failed");
        }
        self.set_token(None);
        debug!("logged out");
        result
    }
}
