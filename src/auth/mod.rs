pub mod google;
pub mod routes;
pub mod session;
pub mod token;

pub use google::GoogleOAuthClient;
pub use routes::{complete_login, router};
pub use session::{SessionClaims, SessionIssuer};
pub use token::{GoogleClaims, GoogleTokenVerifier};
